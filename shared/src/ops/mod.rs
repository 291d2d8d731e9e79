pub mod component_data;
pub mod entity_query;
pub mod worker_op;
