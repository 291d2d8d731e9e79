pub mod class_metadata;
pub mod constants;
pub mod rpc_payload;
pub mod spawn_data;
pub mod worker;
