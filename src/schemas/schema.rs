use std::fmt;
use std::sync::{Arc, OnceLock};

use jsonschema::{Draft, JSONSchema};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::ItinerarySpec;

/// JSON schema for a response type, compiled once and shared.
#[derive(Clone)]
pub struct SchemaHandle {
    schema_name: &'static str,
    schema_json: Arc<Value>,
    compiled: Arc<Result<JSONSchema, String>>,
}

impl SchemaHandle {
    /// Generate the schema for `T` and compile it for Draft 7 validation.
    pub fn generate<T: JsonSchema>(schema_name: &'static str) -> Self {
        let schema_json = serde_json::to_value(schemars::schema_for!(T))
            .unwrap_or_else(|err| panic!("schema for {schema_name} is not serializable: {err}"));
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_json)
            .map_err(|err| format!("`{schema_name}` schema does not compile: {err}"));

        Self {
            schema_name,
            schema_json: Arc::new(schema_json),
            compiled: Arc::new(compiled),
        }
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    pub fn schema_json(&self) -> &Value {
        self.schema_json.as_ref()
    }

    pub(crate) fn compiled(&self) -> Result<&JSONSchema, String> {
        match &*self.compiled {
            Ok(compiled) => Ok(compiled),
            Err(err) => Err(err.clone()),
        }
    }
}

impl fmt::Debug for SchemaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaHandle")
            .field("schema_name", &self.schema_name)
            .field("compiled", &self.compiled.is_ok())
            .finish()
    }
}

/// A type the model is asked to return as JSON.
pub trait ResponseSchema: DeserializeOwned + Send + Sync + 'static {
    fn schema() -> &'static SchemaHandle;
}

impl ResponseSchema for ItinerarySpec {
    fn schema() -> &'static SchemaHandle {
        static HANDLE: OnceLock<SchemaHandle> = OnceLock::new();
        HANDLE.get_or_init(|| SchemaHandle::generate::<ItinerarySpec>("ItinerarySpec"))
    }
}
