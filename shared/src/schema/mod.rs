pub mod error;
pub mod schema_object;
