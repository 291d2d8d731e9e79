use std::collections::HashMap;

use meshwork_shared::{
    CreateEntityResponseOp, EntityQueryResponseOp, RequestId, ReserveEntityIdsResponseOp,
};

use crate::world::object_graph::ActorHandle;

pub type EntityQueryDelegate = Box<dyn FnOnce(&EntityQueryResponseOp)>;
pub type ReserveEntityIdsDelegate = Box<dyn FnOnce(&ReserveEntityIdsResponseOp)>;
pub type CreateEntityDelegate = Box<dyn FnOnce(&CreateEntityResponseOp)>;

/// Who receives an entity query response
pub enum EntityQueryHandler {
    /// The virtual worker translator's discovery query
    WorkerDiscovery,
    Delegate(EntityQueryDelegate),
}

/// Correlates outgoing requests with the callbacks waiting for their
/// responses. Each entry is consumed by the first response carrying its id.
pub struct PendingRequests {
    entity_query_handlers: HashMap<RequestId, EntityQueryHandler>,
    reserve_entity_ids_delegates: HashMap<RequestId, ReserveEntityIdsDelegate>,
    create_entity_delegates: HashMap<RequestId, CreateEntityDelegate>,
    pending_actor_requests: HashMap<RequestId, ActorHandle>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            entity_query_handlers: HashMap::new(),
            reserve_entity_ids_delegates: HashMap::new(),
            create_entity_delegates: HashMap::new(),
            pending_actor_requests: HashMap::new(),
        }
    }

    pub fn add_entity_query_handler(&mut self, request_id: RequestId, handler: EntityQueryHandler) {
        self.entity_query_handlers.insert(request_id, handler);
    }

    pub fn take_entity_query_handler(&mut self, request_id: &RequestId) -> Option<EntityQueryHandler> {
        self.entity_query_handlers.remove(request_id)
    }

    pub fn add_reserve_entity_ids_delegate(
        &mut self,
        request_id: RequestId,
        delegate: ReserveEntityIdsDelegate,
    ) {
        self.reserve_entity_ids_delegates.insert(request_id, delegate);
    }

    pub fn take_reserve_entity_ids_delegate(
        &mut self,
        request_id: &RequestId,
    ) -> Option<ReserveEntityIdsDelegate> {
        self.reserve_entity_ids_delegates.remove(request_id)
    }

    pub fn add_create_entity_delegate(&mut self, request_id: RequestId, delegate: CreateEntityDelegate) {
        self.create_entity_delegates.insert(request_id, delegate);
    }

    pub fn take_create_entity_delegate(&mut self, request_id: &RequestId) -> Option<CreateEntityDelegate> {
        self.create_entity_delegates.remove(request_id)
    }

    pub fn add_pending_actor_request(&mut self, request_id: RequestId, actor: ActorHandle) {
        self.pending_actor_requests.insert(request_id, actor);
    }

    pub fn take_pending_actor_request(&mut self, request_id: &RequestId) -> Option<ActorHandle> {
        self.pending_actor_requests.remove(request_id)
    }

    pub fn len(&self) -> usize {
        self.entity_query_handlers.len()
            + self.reserve_entity_ids_delegates.len()
            + self.create_entity_delegates.len()
            + self.pending_actor_requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry without invoking it
    pub fn clear(&mut self) {
        self.entity_query_handlers.clear();
        self.reserve_entity_ids_delegates.clear();
        self.create_entity_delegates.clear();
        self.pending_actor_requests.clear();
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}
