//! # Meshwork Worker
//! The receiving half of a worker's connection to a partitioned simulation
//! runtime. A [`Receiver`] consumes the runtime's ordered op stream and keeps
//! a local object graph consistent with it: entity-shaping ops are batched
//! into critical sections, forward object references are wired up once
//! their targets exist, RPCs wait in per-target queues until they can be
//! applied, and virtual worker ids are mapped onto the physical workers that
//! run them.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use meshwork_shared as shared;

mod connection;
mod critical_section;
mod error;
mod player;
mod receiver;
mod receiver_config;
mod requests;
mod resolution;
mod rpc;
mod translation;
mod world;

pub use connection::worker_connection::WorkerConnection;
pub use critical_section::critical_section_buffer::{CriticalSectionBatch, CriticalSectionBuffer};
pub use error::{ObjectGraphError, ReceiverError, RpcApplyError};
pub use player::player_connections::PlayerConnections;
pub use receiver::{Receiver, RPC_COMMAND_INDEX};
pub use receiver_config::{HeartbeatConfig, ReceiverConfig, RpcConfig, TranslatorConfig};
pub use requests::pending_requests::{
    CreateEntityDelegate, EntityQueryDelegate, EntityQueryHandler, PendingRequests,
    ReserveEntityIdsDelegate,
};
pub use resolution::reference_graph::{Dependent, DependentHandle, ReferenceGraph, Resolution};
pub use rpc::{
    reliable_rpc::{ReliableRpcForRetry, ReliableRpcTracker},
    rpc_error::{RpcError, RpcErrorKind},
    rpc_queue::{ProcessReport, QueuedRpc, QueuedRpcId, RpcAdmissionQueue, RpcOutcome},
};
pub use translation::virtual_worker_translator::VirtualWorkerTranslator;
pub use world::{
    component_registry::{ComponentRegistry, ComponentRole},
    entity_view::{ActorState, EntityRecord, EntityView},
    listeners::{EntityListener, EntityListeners, ListenerKey},
    object_graph::{ActorHandle, FunctionDispatcher, ObjectGraph, RefResolver},
};
