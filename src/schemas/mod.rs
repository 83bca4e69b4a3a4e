//! JSON schema handles for AI response types.
//!
//! Every type decoded from AI output derives [`schemars::JsonSchema`]; the
//! parsed value is validated against the generated schema before
//! deserialization, so a field-type mismatch surfaces as
//! [`PlannerError::MalformedResponse`] instead of being trusted downstream.

use std::sync::Arc;

use schemars::{gen::SchemaGenerator, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PlannerError, Result};

const MAX_SCHEMA_ERRORS: usize = 3;

/// Marker for types that can be decoded from an AI response.
pub trait ResponseSchema: DeserializeOwned + JsonSchema + 'static {
    /// Compiled-schema handle for this type.
    fn handle() -> SchemaHandle {
        SchemaHandle::of::<Self>()
    }
}

impl<T: DeserializeOwned + JsonSchema + 'static> ResponseSchema for T {}

/// A named JSON schema derived from a response type.
#[derive(Clone, Debug)]
pub struct SchemaHandle {
    schema_name: String,
    schema_json: Arc<Value>,
}

impl SchemaHandle {
    /// Build the handle for `T` from its `schemars` derive.
    pub fn of<T: JsonSchema>() -> Self {
        let root = SchemaGenerator::default().into_root_schema_for::<T>();
        let schema_json = serde_json::to_value(root)
            .expect("schemars root schema always serializes to JSON");

        Self {
            schema_name: T::schema_name(),
            schema_json: Arc::new(schema_json),
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn schema_json(&self) -> &Value {
        self.schema_json.as_ref()
    }

    /// Validate a parsed payload against this schema.
    ///
    /// Reports up to three path-labelled violations.
    pub fn validate(&self, payload: &Value) -> Result<()> {
        let validator = jsonschema::JSONSchema::options()
            .with_draft(jsonschema::Draft::Draft7)
            .compile(self.schema_json())
            .map_err(|err| {
                PlannerError::Config(format!(
                    "failed to prepare `{}` schema for validation: {}",
                    self.schema_name, err
                ))
            })?;

        if let Err(errors) = validator.validate(payload) {
            let mut details = Vec::new();
            let mut truncated = false;

            for (idx, error) in errors.enumerate() {
                if idx < MAX_SCHEMA_ERRORS {
                    let mut path = error.instance_path.to_string();
                    if path.is_empty() {
                        path = "<root>".to_string();
                    }
                    details.push(format!("{}: {}", path, error));
                } else {
                    truncated = true;
                    break;
                }
            }

            let mut detail = if details.is_empty() {
                "payload failed schema validation".to_string()
            } else {
                details.join("; ")
            };
            if truncated {
                detail.push_str("; additional errors truncated");
            }

            return Err(PlannerError::MalformedResponse(format!(
                "response does not match `{}` schema: {}",
                self.schema_name, detail
            )));
        }

        Ok(())
    }

    /// Validate and deserialize a payload into `T`, with a path-labelled
    /// error when the shape does not line up.
    pub fn deserialize<T: ResponseSchema>(&self, payload: &Value) -> Result<T> {
        self.validate(payload)?;

        serde_path_to_error::deserialize(payload).map_err(|err| {
            let path = err.path().to_string();
            let location = if path.is_empty() {
                "<root>".to_string()
            } else {
                path
            };
            PlannerError::MalformedResponse(format!(
                "failed to deserialize `{}` at {}: {}",
                self.schema_name, location, err
            ))
        })
    }
}
