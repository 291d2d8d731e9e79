use meshwork_shared::{
    Authority, ClassMetadata, ComponentData, ComponentId, ComponentUpdate, EntityId, ObjectRef,
    RpcPayload, SpawnData, StatusCode,
};

use crate::error::{ObjectGraphError, RpcApplyError};

/// Answers whether an object reference can currently be turned into a live
/// object. The null reference is always resolved.
pub trait RefResolver {
    fn is_resolved(&self, object_ref: &ObjectRef) -> bool;
}

/// Weak handle to a local actor: the entity it is replicated as, plus an
/// epoch the owning world bumps whenever the actor is destroyed and
/// recreated. Holding one does not keep the actor alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActorHandle {
    pub entity_id: EntityId,
    pub epoch: u64,
}

impl ActorHandle {
    pub fn new(entity_id: EntityId, epoch: u64) -> Self {
        Self { entity_id, epoch }
    }
}

/// The local object graph the Receiver materializes entities into.
///
/// Calls that carry component data also carry a [`RefResolver`] so the
/// graph can decide, field by field, whether an embedded reference can be
/// wired up yet. Fields it cannot wire are re-delivered once the referenced
/// entity has been constructed.
pub trait ObjectGraph {
    /// Instantiate the root object of an entity
    fn create_object(
        &mut self,
        entity_id: EntityId,
        metadata: &ClassMetadata,
        spawn_data: &SpawnData,
    ) -> Result<(), ObjectGraphError>;
    fn destroy_object(&mut self, entity_id: EntityId);
    /// Stop replicating into the entity's object but keep it alive locally
    fn tear_off_object(&mut self, entity_id: EntityId);
    fn apply_component_data(
        &mut self,
        entity_id: EntityId,
        data: &ComponentData,
        resolver: &dyn RefResolver,
    ) -> Result<(), ObjectGraphError>;
    fn apply_component_update(
        &mut self,
        entity_id: EntityId,
        update: &ComponentUpdate,
        resolver: &dyn RefResolver,
    ) -> Result<(), ObjectGraphError>;
    /// Handover state arriving while this worker is authoritative over the
    /// component. Handover is otherwise applied like replicated data.
    fn apply_handover_update(
        &mut self,
        entity_id: EntityId,
        update: &ComponentUpdate,
        resolver: &dyn RefResolver,
    ) -> Result<(), ObjectGraphError> {
        self.apply_component_update(entity_id, update, resolver)
    }
    /// A data component was added to an entity whose object already exists
    fn attach_subobject(
        &mut self,
        entity_id: EntityId,
        data: &ComponentData,
        resolver: &dyn RefResolver,
    ) -> Result<(), ObjectGraphError>;
    fn detach_subobject(&mut self, entity_id: EntityId, component_id: ComponentId);
    /// Whether the object (root or sub-object) addressed by the reference exists
    fn has_object(&self, object_ref: &ObjectRef) -> bool;
    fn is_actor_alive(&self, actor: &ActorHandle) -> bool;
    fn on_authority_changed(
        &mut self,
        entity_id: EntityId,
        component_id: ComponentId,
        authority: Authority,
    );
    fn on_player_disconnected(&mut self, entity_id: EntityId);
    fn on_create_entity_response(&mut self, actor: &ActorHandle, status: &StatusCode);
    fn on_disconnect(&mut self, reason: &str);
}

/// Invokes decoded RPCs on local objects.
pub trait FunctionDispatcher {
    fn apply_rpc(
        &mut self,
        target: &ObjectRef,
        payload: &RpcPayload,
        sender: &str,
        resolver: &dyn RefResolver,
    ) -> Result<(), RpcApplyError>;
}
