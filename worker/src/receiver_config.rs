use std::{default::Default, time::Duration};

/// Contains Config properties which will be used by the Receiver
#[derive(Clone, Debug)]
pub struct ReceiverConfig {
    /// Used to configure how incoming RPCs are queued and how outgoing
    /// reliable RPCs are retried
    pub rpc: RpcConfig,
    /// Used to detect connected players that stopped sending heartbeats
    pub heartbeat: HeartbeatConfig,
    /// Used to configure virtual worker discovery
    pub translator: TranslatorConfig,
    /// How long a component field may wait on an unresolved object reference
    /// before the wait is abandoned and logged
    pub pending_reference_ttl: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            translator: TranslatorConfig::default(),
            pending_reference_ttl: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// How long an RPC may sit in the admission queue before it is evicted
    pub queued_rpc_retention: Duration,
    /// How long an RPC whose target exists will wait for the object
    /// references in its arguments before it is applied anyway
    pub unresolved_params_timeout: Duration,
    /// Delay before an outgoing reliable RPC that failed with a retryable
    /// status is sent again
    pub reliable_retry_delay: Duration,
    /// Number of sends after which a reliable RPC is given up on
    pub max_reliable_attempts: u32,
    /// Dropped-RPC reports kept until `take_rpc_errors` drains them; the
    /// oldest report is discarded first
    pub max_buffered_errors: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            queued_rpc_retention: Duration::from_secs(30),
            unresolved_params_timeout: Duration::from_secs(1),
            reliable_retry_delay: Duration::from_millis(500),
            max_reliable_attempts: 5,
            max_buffered_errors: 256,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HeartbeatConfig {
    /// A tracked player entity that has not sent a heartbeat for this long
    /// is considered disconnected
    pub timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TranslatorConfig {
    /// Worker type that may be assigned virtual workers. Worker entities of
    /// any other type returned by the discovery query are skipped
    pub eligible_worker_type: String,
    /// Delay before the discovery query is re-issued after a failure, or
    /// while virtual workers remain unassigned
    pub query_retry_delay: Duration,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            eligible_worker_type: "UnrealWorker".to_string(),
            query_retry_delay: Duration::from_secs(1),
        }
    }
}
