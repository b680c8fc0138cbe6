use serde_json::Value;

use crate::schemas::{ResponseSchema, SchemaHandle};

/// Decode an extracted JSON payload into `T`, reporting the failing path.
///
/// The error is plain text: it is diagnostic detail for logs, and callers fold
/// it into a parse error with the raw-text snippet.
pub fn deserialize_payload<T>(payload: &Value, schema: &SchemaHandle) -> Result<T, String>
where
    T: ResponseSchema,
{
    let raw = payload.to_string();
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        let location = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        format!(
            "failed to deserialize `{}` at {}: {}",
            schema.schema_name(),
            location,
            err.inner()
        )
    })
}
