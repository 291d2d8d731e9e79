use thiserror::Error;

use meshwork_shared::{ComponentId, EntityId, SchemaError};

/// Errors that can occur while the Receiver processes incoming ops
///
/// None of these are fatal: an op that produces one is logged and dropped,
/// and the Receiver's state is left as it was before the op arrived.
/// The single exception is `Disconnected`, which is returned for every op
/// that arrives after the connection was lost.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReceiverError {
    // Critical Section Errors

    /// A critical section was opened while another was still open
    #[error("Received a critical section start while already inside a critical section")]
    NestedCriticalSection,

    /// A critical section was closed while none was open
    #[error("Received a critical section end outside of a critical section")]
    NotInCriticalSection,

    // Authority Errors

    /// Authority changed for an entity this worker has never seen
    #[error("Authority change for component {component_id} on unknown entity {entity_id}")]
    AuthorityForUnknownEntity {
        entity_id: EntityId,
        component_id: ComponentId,
    },

    /// Authority changed for a component the entity does not carry
    #[error("Authority change for component {component_id} which entity {entity_id} does not have")]
    AuthorityForUnknownComponent {
        entity_id: EntityId,
        component_id: ComponentId,
    },

    // Payload Errors

    /// A well-known component's data could not be read
    #[error("Malformed data for component {component_id} on entity {entity_id}: {source}")]
    MalformedPayload {
        entity_id: EntityId,
        component_id: ComponentId,
        source: SchemaError,
    },

    // Connection Errors

    /// The connection was lost; no further ops may be processed
    #[error("Receiver has already processed a Disconnect op")]
    Disconnected,
}

/// Errors an [`ObjectGraph`](crate::ObjectGraph) reports back to the Receiver
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ObjectGraphError {
    /// No class is registered under the path carried by the entity's metadata
    #[error("No class registered for path {class_path}")]
    ClassNotFound { class_path: String },

    /// The entity has no live object
    #[error("No object exists for entity {entity_id}")]
    ObjectNotFound { entity_id: EntityId },

    /// Component data could not be written into the object
    #[error("Failed to apply component {component_id} to entity {entity_id}: {reason}")]
    ApplyFailed {
        entity_id: EntityId,
        component_id: ComponentId,
        reason: String,
    },
}

/// Errors a [`FunctionDispatcher`](crate::FunctionDispatcher) reports when it
/// cannot invoke an RPC
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcApplyError {
    /// The target object has no function at this index
    #[error("No function at index {index}")]
    FunctionNotFound { index: u32 },

    /// The target object was destroyed before the call could run
    #[error("Target object was destroyed")]
    ObjectDestroyed,
}
