use meshwork_shared::{
    CommandIndex, ComponentData, ComponentId, ComponentUpdate, EntityId, EntityQuery, RequestId,
    SchemaObject,
};

/// Outgoing half of the runtime connection, as seen by the Receiver.
///
/// Every request method returns the id the runtime assigned to the request;
/// the matching response op carries the same id.
pub trait WorkerConnection {
    fn send_entity_query(&mut self, query: &EntityQuery) -> RequestId;
    fn send_component_update(&mut self, entity_id: EntityId, update: ComponentUpdate);
    fn send_create_entity_request(
        &mut self,
        components: Vec<ComponentData>,
        entity_id: Option<EntityId>,
    ) -> RequestId;
    fn send_reserve_entity_ids_request(&mut self, count: u32) -> RequestId;
    fn send_command_request(
        &mut self,
        entity_id: EntityId,
        component_id: ComponentId,
        command_index: CommandIndex,
        request: SchemaObject,
    ) -> RequestId;
    fn send_command_response(
        &mut self,
        request_id: RequestId,
        component_id: ComponentId,
        response: SchemaObject,
    );
    fn send_command_failure(&mut self, request_id: RequestId, message: &str);
}
