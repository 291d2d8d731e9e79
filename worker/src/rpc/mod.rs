pub mod reliable_rpc;
pub mod rpc_error;
pub mod rpc_queue;
