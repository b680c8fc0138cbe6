use serde_json::Value;

use crate::schemas::SchemaHandle;

const MAX_REPORTED_VIOLATIONS: usize = 3;

/// Check an extracted payload against a response schema.
///
/// The error lists the first few violations, each prefixed with its JSON pointer.
pub(crate) fn validate_payload(schema: &SchemaHandle, payload: &Value) -> Result<(), String> {
    let compiled = schema.compiled()?;
    let Err(errors) = compiled.validate(payload) else {
        return Ok(());
    };

    let violations: Vec<String> = errors
        .map(|error| {
            let path = match error.instance_path.to_string() {
                path if path.is_empty() => "<root>".to_string(),
                path => path,
            };
            format!("{path}: {error}")
        })
        .collect();

    let mut detail = violations
        .iter()
        .take(MAX_REPORTED_VIOLATIONS)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    if violations.len() > MAX_REPORTED_VIOLATIONS {
        detail.push_str(&format!(
            " (+{} more)",
            violations.len() - MAX_REPORTED_VIOLATIONS
        ));
    }

    Err(format!(
        "payload does not match `{}` schema: {}",
        schema.schema_name(),
        detail
    ))
}
