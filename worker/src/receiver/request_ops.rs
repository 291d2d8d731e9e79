use std::time::Instant;

use log::debug;

use meshwork_shared::{
    ComponentData, CreateEntityResponseOp, EntityId, EntityQuery, EntityQueryResponseOp, RequestId,
    ReserveEntityIdsResponseOp,
};

use super::Receiver;
use crate::{
    connection::worker_connection::WorkerConnection,
    requests::pending_requests::{
        CreateEntityDelegate, EntityQueryDelegate, EntityQueryHandler, ReserveEntityIdsDelegate,
    },
    world::object_graph::{ActorHandle, ObjectGraph},
};

impl Receiver {
    // Outgoing

    pub fn query_entities(
        &mut self,
        connection: &mut dyn WorkerConnection,
        query: &EntityQuery,
        delegate: EntityQueryDelegate,
    ) -> RequestId {
        let request_id = connection.send_entity_query(query);
        self.add_entity_query_delegate(request_id, delegate);
        request_id
    }

    pub fn reserve_entity_ids(
        &mut self,
        connection: &mut dyn WorkerConnection,
        count: u32,
        delegate: ReserveEntityIdsDelegate,
    ) -> RequestId {
        let request_id = connection.send_reserve_entity_ids_request(count);
        self.add_reserve_entity_ids_delegate(request_id, delegate);
        request_id
    }

    pub fn create_entity(
        &mut self,
        connection: &mut dyn WorkerConnection,
        components: Vec<ComponentData>,
        entity_id: Option<EntityId>,
        delegate: Option<CreateEntityDelegate>,
    ) -> RequestId {
        let request_id = connection.send_create_entity_request(components, entity_id);
        if let Some(delegate) = delegate {
            self.add_create_entity_delegate(request_id, delegate);
        }
        request_id
    }

    /// Creates the entity a local actor will be replicated as. The object
    /// graph hears about the response only if the actor is still alive.
    pub fn create_entity_for_actor(
        &mut self,
        connection: &mut dyn WorkerConnection,
        components: Vec<ComponentData>,
        actor: ActorHandle,
    ) -> RequestId {
        let request_id = connection.send_create_entity_request(components, Some(actor.entity_id));
        self.add_pending_actor_request(request_id, actor);
        request_id
    }

    /// Registers a delegate for a query that was sent elsewhere
    pub fn add_entity_query_delegate(&mut self, request_id: RequestId, delegate: EntityQueryDelegate) {
        self.pending_requests
            .add_entity_query_handler(request_id, EntityQueryHandler::Delegate(delegate));
    }

    pub fn add_reserve_entity_ids_delegate(
        &mut self,
        request_id: RequestId,
        delegate: ReserveEntityIdsDelegate,
    ) {
        self.pending_requests
            .add_reserve_entity_ids_delegate(request_id, delegate);
    }

    pub fn add_create_entity_delegate(&mut self, request_id: RequestId, delegate: CreateEntityDelegate) {
        self.pending_requests
            .add_create_entity_delegate(request_id, delegate);
    }

    pub fn add_pending_actor_request(&mut self, request_id: RequestId, actor: ActorHandle) {
        self.pending_requests
            .add_pending_actor_request(request_id, actor);
    }

    // Incoming

    pub(super) fn receive_entity_query_response(
        &mut self,
        connection: &mut dyn WorkerConnection,
        now: &Instant,
        op: EntityQueryResponseOp,
    ) {
        match self
            .pending_requests
            .take_entity_query_handler(&op.request_id)
        {
            Some(EntityQueryHandler::WorkerDiscovery) => {
                self.translator
                    .handle_worker_query_response(&op, connection, now);
            }
            Some(EntityQueryHandler::Delegate(delegate)) => {
                delegate(&op);
            }
            None => {
                debug!(
                    "Dropping entity query response {} with no matching request",
                    op.request_id
                );
            }
        }
    }

    pub(super) fn receive_reserve_entity_ids_response(&mut self, op: ReserveEntityIdsResponseOp) {
        match self
            .pending_requests
            .take_reserve_entity_ids_delegate(&op.request_id)
        {
            Some(delegate) => delegate(&op),
            None => debug!(
                "Dropping reserve entity ids response {} with no matching request",
                op.request_id
            ),
        }
    }

    pub(super) fn receive_create_entity_response<W: ObjectGraph>(
        &mut self,
        world: &mut W,
        op: CreateEntityResponseOp,
    ) {
        let delegate = self
            .pending_requests
            .take_create_entity_delegate(&op.request_id);
        let actor = self
            .pending_requests
            .take_pending_actor_request(&op.request_id);

        if delegate.is_none() && actor.is_none() {
            debug!(
                "Dropping create entity response {} with no matching request",
                op.request_id
            );
            return;
        }

        if let Some(delegate) = delegate {
            delegate(&op);
        }

        if let Some(actor) = actor {
            if world.is_actor_alive(&actor) {
                world.on_create_entity_response(&actor, &op.status);
            } else {
                debug!(
                    "Actor for entity {} was destroyed before its entity was created",
                    actor.entity_id
                );
            }
        }
    }
}
