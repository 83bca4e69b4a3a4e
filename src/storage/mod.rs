//! Plan persistence and the sharing codec.

pub mod favorites;
pub mod history;
pub mod kv;
pub mod plans;
pub mod share;

pub use favorites::{FavoriteEntry, FavoritesStore};
pub use history::{HistoryEntry, HistoryStore};
pub use kv::{FileStore, KvStore, MemoryStore};
pub use plans::{PlanStore, SavedPlanRecord};
pub use share::{decode_shared_plan, encode_for_sharing, MAX_SHARE_BYTES};
