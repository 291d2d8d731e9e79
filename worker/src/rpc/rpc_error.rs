use thiserror::Error;

use meshwork_shared::ObjectRef;

/// Why an incoming RPC was dropped without being applied
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// The target object has no function at the RPC's index
    #[error("function not found")]
    FunctionNotFound,
    /// The target entity was removed while the RPC waited
    #[error("target object destroyed")]
    ObjectDestroyed,
    /// The target entity was torn off and no longer accepts replication
    #[error("target torn off")]
    TargetTornOff,
    /// The RPC waited longer than the queue's retention
    #[error("evicted after waiting too long for its target")]
    Evicted,
    /// The RPC's payload could not be decoded
    #[error("malformed payload")]
    MalformedPayload,
}

/// An incoming RPC that will never be applied
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("RPC {rpc_index} on {target} from '{sender}' dropped: {kind}")]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub target: ObjectRef,
    pub rpc_index: u32,
    pub sender: String,
}
