use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Fallback `type` for events whose `level` is missing, `null` or `false`.
pub const UNDEFINED_TYPE: &str = "UNDEFINED";

/// JSON envelope wrapped around every event before it is queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensMessage {
    pub index: String,
    /// The event's `level`, kept as whatever JSON value it was.
    #[serde(rename = "type")]
    pub kind: Value,
    pub id: Uuid,
    pub source: Value,
}

impl LensMessage {
    pub fn from_event(index: impl Into<String>, event: Value) -> Self {
        let kind = match event.get("level") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {
                Value::String(UNDEFINED_TYPE.to_string())
            }
            Some(level) => level.clone(),
        };

        Self {
            index: index.into(),
            kind,
            id: Uuid::new_v4(),
            source: event,
        }
    }

    /// Wraps a raw input line. JSON objects are used as-is; anything else
    /// becomes `{"message": line}`.
    pub fn from_line(index: impl Into<String>, line: &str) -> Self {
        let event = match serde_json::from_str::<Value>(line) {
            Ok(value @ Value::Object(_)) => value,
            _ => serde_json::json!({ "message": line }),
        };
        Self::from_event(index, event)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
