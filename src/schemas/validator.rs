use serde_json::Value;

use super::{validation::validate_payload, ResponseSchema};
use crate::types::deserialize_payload;

/// How an extracted JSON payload is turned into a typed response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validator {
    /// Decode with serde only; shape errors surface as deserialization failures.
    SerdeFirst,
    /// Check the payload against the type's JSON schema first, then decode.
    #[default]
    Strict,
}

impl Validator {
    /// Validate and deserialize `payload` into `T`.
    pub fn decode<T: ResponseSchema>(&self, payload: &Value) -> Result<T, String> {
        let schema = T::schema();
        if let Validator::Strict = self {
            validate_payload(schema, payload)?;
        }
        deserialize_payload(payload, schema)
    }
}
