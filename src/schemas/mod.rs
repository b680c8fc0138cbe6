pub mod schema;
pub(crate) mod validation;
pub mod validator;

pub use schema::{ResponseSchema, SchemaHandle};
pub use validator::Validator;
