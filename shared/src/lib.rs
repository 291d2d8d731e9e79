//! # Meshwork Shared
//! Data model shared by the meshwork worker receiver and its tooling: entity
//! and component ids, object references, schema objects, transport ops and
//! the engine-level components every worker understands.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod components;
mod key_generator;
mod object_ref;
mod ops;
mod schema;
mod types;

pub use components::{
    class_metadata::ClassMetadata,
    constants::{
        CLASS_METADATA_COMPONENT_ID, CLIENT_RPC_ENDPOINT_COMPONENT_ID, ENTITY_ACL_COMPONENT_ID,
        HEARTBEAT_COMPONENT_ID, MULTICAST_RPCS_COMPONENT_ID, PACKED_RPCS_COMPONENT_ID,
        POSITION_COMPONENT_ID, RPCS_ON_ENTITY_CREATION_COMPONENT_ID, RPC_PAYLOAD_FIELD_ID,
        SERVER_RPC_ENDPOINT_COMPONENT_ID,
        SPAWN_DATA_COMPONENT_ID, TEAR_OFF_COMPONENT_ID, VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
        WORKER_COMPONENT_ID,
    },
    rpc_payload::{PackedRpc, RpcPayload, RpcsOnEntityCreation},
    spawn_data::SpawnData,
    worker::{Heartbeat, WorkerComponent},
};
pub use key_generator::KeyGenerator;
pub use object_ref::ObjectRef;
pub use ops::{
    component_data::{ComponentData, ComponentUpdate},
    entity_query::{EntityQuery, QueriedEntity, QueryConstraint, QueryResultType},
    worker_op::{
        AddComponentOp, AddEntityOp, AuthorityChangeOp, CommandRequestOp, CommandResponseOp,
        ComponentUpdateOp, CreateEntityResponseOp, DisconnectOp, EntityQueryResponseOp,
        RemoveComponentOp, RemoveEntityOp, ReserveEntityIdsResponseOp, WorkerOp,
    },
};
pub use schema::{
    error::SchemaError,
    schema_object::{SchemaObject, SchemaValue},
};
pub use types::{
    Authority, CommandIndex, ComponentId, EntityId, FieldId, PhysicalWorkerName, RequestId,
    StatusCode, VirtualWorkerId,
};
