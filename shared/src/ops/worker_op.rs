use crate::{
    Authority, CommandIndex, ComponentData, ComponentId, ComponentUpdate, EntityId,
    QueriedEntity, RequestId, SchemaObject, StatusCode,
};

#[derive(Clone, Debug, PartialEq)]
pub struct AddEntityOp {
    pub entity_id: EntityId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveEntityOp {
    pub entity_id: EntityId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AddComponentOp {
    pub entity_id: EntityId,
    pub data: ComponentData,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveComponentOp {
    pub entity_id: EntityId,
    pub component_id: ComponentId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComponentUpdateOp {
    pub entity_id: EntityId,
    pub update: ComponentUpdate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuthorityChangeOp {
    pub entity_id: EntityId,
    pub component_id: ComponentId,
    pub authority: Authority,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandRequestOp {
    pub request_id: RequestId,
    pub entity_id: EntityId,
    pub component_id: ComponentId,
    pub command_index: CommandIndex,
    pub request: SchemaObject,
    pub caller_worker_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandResponseOp {
    pub request_id: RequestId,
    pub entity_id: EntityId,
    pub component_id: ComponentId,
    pub status: StatusCode,
    pub response: Option<SchemaObject>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityQueryResponseOp {
    pub request_id: RequestId,
    pub status: StatusCode,
    pub result_count: usize,
    pub results: Vec<QueriedEntity>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReserveEntityIdsResponseOp {
    pub request_id: RequestId,
    pub status: StatusCode,
    pub first_entity_id: Option<EntityId>,
    pub number_of_entity_ids: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateEntityResponseOp {
    pub request_id: RequestId,
    pub status: StatusCode,
    pub entity_id: Option<EntityId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisconnectOp {
    pub reason: String,
}

/// Every operation the transport can deliver, in delivery order.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerOp {
    /// `true` opens an atomic batch, `false` closes it
    CriticalSection(bool),
    AddEntity(AddEntityOp),
    RemoveEntity(RemoveEntityOp),
    AddComponent(AddComponentOp),
    RemoveComponent(RemoveComponentOp),
    ComponentUpdate(ComponentUpdateOp),
    AuthorityChange(AuthorityChangeOp),
    CommandRequest(CommandRequestOp),
    CommandResponse(CommandResponseOp),
    EntityQueryResponse(EntityQueryResponseOp),
    ReserveEntityIdsResponse(ReserveEntityIdsResponseOp),
    CreateEntityResponse(CreateEntityResponseOp),
    Disconnect(DisconnectOp),
}
