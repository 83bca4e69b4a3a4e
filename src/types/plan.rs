use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An AI-proposed travel target.
///
/// `id` is the dedup key within a suggestion batch; it is echoed back to the
/// AI on "load more" so previously-seen places are avoided.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Stable identifier (e.g. "hokkaido-furano")
    pub id: String,
    /// Prefecture + region name (e.g. "北海道富良野")
    pub name: String,
    /// English name usable for image search (e.g. "Furano Hokkaido")
    #[serde(default)]
    pub name_en: Option<String>,
    /// Short description, ~80 characters
    pub description: String,
    /// Best season to visit
    pub best_season: String,
    /// Rough cost estimate in yen
    pub estimated_cost: u32,
    /// Selling points, in display order
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// Wire shape of a destination-suggestion response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DestinationList {
    pub destinations: Vec<Destination>,
}

/// One scheduled activity within a day.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItem {
    /// Text time range, e.g. "09:00-12:00"
    pub time: String,
    pub activity: String,
    pub location: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    /// Cost in yen; absent means free
    #[serde(default)]
    pub cost: u32,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One itinerary day. Days are ordered by `day` ascending starting at 1;
/// items are ordered by occurrence within the day.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Day {
    pub day: u32,
    pub date: NaiveDate,
    pub title: String,
    #[serde(default)]
    pub items: Vec<ItineraryItem>,
}

/// Recommended lodging.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub name: String,
    /// Lodging category: ホテル, 旅館, 民宿, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub address: String,
    pub price_per_night: u32,
    pub total_nights: u32,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// AI-supplied cost breakdown accompanying a plan.
///
/// `total` is trusted AI output and is never recomputed from the category
/// fields; reconciling it against the requested budget is a display concern.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Budget {
    pub transportation: u32,
    pub accommodation: u32,
    pub activities: u32,
    pub meals: u32,
    pub other: u32,
    pub total: u32,
}

/// Echo of the inputs a plan was generated from.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanParams {
    pub activity: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: u32,
}

/// A full generated itinerary.
///
/// `generated_at` and `params` are stamped by the generator after decoding;
/// the AI response itself carries neither.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Plan overview, ~100 characters
    pub summary: String,
    pub itinerary: Vec<Day>,
    #[serde(default)]
    pub hotels: Vec<Hotel>,
    pub budget_breakdown: Budget,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub packing_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<PlanParams>,
}

impl Plan {
    /// Number of days covered by the itinerary.
    pub fn day_count(&self) -> usize {
        self.itinerary.len()
    }

    /// Sum of per-item costs for one day, for display.
    pub fn day_cost(&self, day: u32) -> u32 {
        self.itinerary
            .iter()
            .filter(|d| d.day == day)
            .flat_map(|d| d.items.iter())
            .map(|item| item.cost)
            .sum()
    }

    /// Whether the AI-reported total exceeds the requested budget.
    ///
    /// Over-budget plans are flagged, not rejected.
    pub fn over_budget(&self, requested: u32) -> bool {
        self.budget_breakdown.total > requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_cost_defaults_to_zero_when_absent() {
        let item: ItineraryItem = serde_json::from_value(json!({
            "time": "09:00-12:00",
            "activity": "スキー",
            "location": "富良野スキー場",
            "description": "パウダースノーを満喫"
        }))
        .unwrap();
        assert_eq!(item.cost, 0);
        assert!(item.lat.is_none());
        assert!(item.notes.is_none());
    }

    #[test]
    fn destination_accepts_camel_case_wire_fields() {
        let dest: Destination = serde_json::from_value(json!({
            "id": "hokkaido-furano",
            "name": "北海道富良野",
            "nameEn": "Furano Hokkaido",
            "description": "ラベンダー畑とスキーの町",
            "bestSeason": "冬",
            "estimatedCost": 50000,
            "highlights": ["ラベンダー", "スキー", "チーズ工房"]
        }))
        .unwrap();
        assert_eq!(dest.name_en.as_deref(), Some("Furano Hokkaido"));
        assert_eq!(dest.estimated_cost, 50000);
    }

    #[test]
    fn over_budget_flags_but_never_mutates_total() {
        let budget = Budget {
            transportation: 10000,
            accommodation: 30000,
            activities: 15000,
            meals: 10000,
            other: 5000,
            total: 70000,
        };
        let plan = Plan {
            summary: "test".to_string(),
            itinerary: vec![],
            hotels: vec![],
            budget_breakdown: budget,
            tips: vec![],
            packing_list: vec![],
            generated_at: None,
            params: None,
        };
        assert!(plan.over_budget(60000));
        assert!(!plan.over_budget(70000));
        assert_eq!(plan.budget_breakdown.total, 70000);
    }
}
