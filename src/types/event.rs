use serde::{Deserialize, Deserializer};

/// Swap event emitted by a pair contract.
///
/// Field layout of the Ayin `Swap` event:
///
/// | index | field        |
/// |-------|--------------|
/// | 0     | sender       |
/// | 1     | amount0In    |
/// | 2     | amount1In    |
/// | 3     | amount0Out   |
/// | 4     | amount1Out   |
/// | 5     | to           |
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSwapEvent {
    pub tx_hash: String,
    pub fields: Vec<EventField>,
}

/// Typed event field value.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EventField {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "value_as_string")]
    pub value: String,
}

impl RawSwapEvent {
    pub fn new(tx_hash: impl Into<String>, fields: Vec<EventField>) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            fields,
        }
    }

    /// Builds an event out of plain values, all typed as `U256`.
    pub fn from_values<S: AsRef<str>>(tx_hash: impl Into<String>, values: &[S]) -> Self {
        Self::new(
            tx_hash,
            values.iter().map(|v| EventField::u256(v.as_ref())).collect(),
        )
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.value.as_str())
    }
}

impl EventField {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn u256(value: impl Into<String>) -> Self {
        Self::new("U256", value)
    }
}

/// Node returns numbers and booleans unquoted for some field types.
fn value_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
