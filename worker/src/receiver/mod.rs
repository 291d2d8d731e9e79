use std::{
    collections::{HashSet, VecDeque},
    time::Instant,
};

use log::{debug, warn};

use meshwork_shared::{
    ComponentId, DisconnectOp, EntityId, RemoveComponentOp, VirtualWorkerId, WorkerOp,
};

use crate::{
    connection::worker_connection::WorkerConnection,
    critical_section::critical_section_buffer::CriticalSectionBuffer,
    error::ReceiverError,
    player::player_connections::PlayerConnections,
    receiver_config::ReceiverConfig,
    requests::pending_requests::{EntityQueryHandler, PendingRequests},
    resolution::reference_graph::ReferenceGraph,
    rpc::{reliable_rpc::ReliableRpcTracker, rpc_error::RpcError, rpc_queue::RpcAdmissionQueue},
    translation::virtual_worker_translator::VirtualWorkerTranslator,
    world::{
        component_registry::{ComponentRegistry, ComponentRole},
        entity_view::{ActorState, EntityView},
        listeners::{EntityListener, EntityListeners, ListenerKey},
        object_graph::{FunctionDispatcher, ObjectGraph},
    },
};

mod authority_ops;
mod entity_ops;
mod request_ops;
mod rpc_ops;
mod update_ops;

pub use rpc_ops::RPC_COMMAND_INDEX;

/// Receiving half of a worker's connection to the runtime.
///
/// Consumes the ordered op stream one op at a time, materializing entities
/// into an [`ObjectGraph`] once their initial state is complete, wiring up
/// object references as their targets appear, and holding RPCs until the
/// objects they address exist. Every queue and table lives here; nothing is
/// global.
pub struct Receiver {
    config: ReceiverConfig,
    registry: ComponentRegistry,
    view: EntityView,
    critical_section: CriticalSectionBuffer,
    queued_remove_component_ops: Vec<RemoveComponentOp>,
    reference_graph: ReferenceGraph,
    rpc_queue: RpcAdmissionQueue,
    translator: VirtualWorkerTranslator,
    pending_requests: PendingRequests,
    reliable_rpcs: ReliableRpcTracker,
    player_connections: PlayerConnections,
    acl_responsible_entities: HashSet<EntityId>,
    entity_added_listeners: EntityListeners,
    entity_removed_listeners: EntityListeners,
    rpc_errors: VecDeque<RpcError>,
    disconnected: bool,
}

impl Receiver {
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            view: EntityView::new(),
            critical_section: CriticalSectionBuffer::new(),
            queued_remove_component_ops: Vec::new(),
            reference_graph: ReferenceGraph::new(),
            rpc_queue: RpcAdmissionQueue::new(config.rpc.clone()),
            translator: VirtualWorkerTranslator::new(config.translator.clone()),
            pending_requests: PendingRequests::new(),
            reliable_rpcs: ReliableRpcTracker::new(),
            player_connections: PlayerConnections::new(config.heartbeat.clone()),
            acl_responsible_entities: HashSet::new(),
            entity_added_listeners: EntityListeners::new(),
            entity_removed_listeners: EntityListeners::new(),
            rpc_errors: VecDeque::new(),
            disconnected: false,
            config,
        }
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Routes ops for an extra component id, e.g. a project-specific RPC
    /// endpoint
    pub fn register_component(&mut self, component_id: ComponentId, role: ComponentRole) {
        self.registry.register(component_id, role);
    }

    // Op Processing

    /// Process one op from the runtime.
    ///
    /// # Panics
    ///
    /// Panics if called after a Disconnect op was processed.
    /// Consider using `try_process_op` for non-panicking error handling.
    pub fn process_op<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        connection: &mut dyn WorkerConnection,
        now: &Instant,
        op: WorkerOp,
    ) {
        match self.try_process_op(world, connection, now, op) {
            Ok(()) => {}
            Err(ReceiverError::Disconnected) => {
                panic!("Receiver cannot process ops after the connection was lost")
            }
            Err(error) => warn!("Dropping op: {}", error),
        }
    }

    /// Process one op from the runtime, returning the protocol violation if
    /// the op had to be dropped.
    ///
    /// A dropped op leaves the Receiver as it was before the op arrived.
    pub fn try_process_op<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        connection: &mut dyn WorkerConnection,
        now: &Instant,
        op: WorkerOp,
    ) -> Result<(), ReceiverError> {
        if self.disconnected {
            return Err(ReceiverError::Disconnected);
        }

        let in_batch = self.critical_section.is_in_batch();

        match op {
            WorkerOp::CriticalSection(true) => {
                self.critical_section.enter()?;
                debug!("Entered critical section");
            }
            WorkerOp::CriticalSection(false) => {
                self.leave_critical_section(world, connection, now)?;
            }
            WorkerOp::AddEntity(op) => {
                if in_batch {
                    self.critical_section.buffer_add_entity(op.entity_id);
                } else {
                    self.receive_add_entity(world, now, op.entity_id);
                }
            }
            WorkerOp::RemoveEntity(op) => {
                self.receive_remove_entity(world, now, op.entity_id);
            }
            WorkerOp::AddComponent(op) => {
                if in_batch {
                    self.critical_section.buffer_add_component(op);
                } else {
                    self.receive_add_component(world, now, op, true);
                }
            }
            WorkerOp::RemoveComponent(op) => {
                if in_batch {
                    self.critical_section.buffer_remove_component(op);
                } else {
                    self.queue_remove_component(op);
                }
            }
            WorkerOp::ComponentUpdate(op) => {
                self.receive_component_update(world, now, op);
            }
            WorkerOp::AuthorityChange(op) => {
                if in_batch {
                    self.critical_section.buffer_authority_change(op);
                } else {
                    self.receive_authority_change(world, connection, now, op)?;
                }
            }
            WorkerOp::CommandRequest(op) => {
                self.receive_command_request(world, connection, now, op);
            }
            WorkerOp::CommandResponse(op) => {
                self.receive_command_response(now, op);
            }
            WorkerOp::EntityQueryResponse(op) => {
                self.receive_entity_query_response(connection, now, op);
            }
            WorkerOp::ReserveEntityIdsResponse(op) => {
                self.receive_reserve_entity_ids_response(op);
            }
            WorkerOp::CreateEntityResponse(op) => {
                self.receive_create_entity_response(world, op);
            }
            WorkerOp::Disconnect(op) => {
                self.receive_disconnect(world, op);
                return Ok(());
            }
        }

        if !self.critical_section.is_in_batch() {
            self.flush_remove_component_ops(world, now);
        }

        Ok(())
    }

    /// Runs the time-driven work: retries queued RPCs, evicts the ones that
    /// waited too long, gives up on stale field references, resends due
    /// reliable RPCs, times out silent players and retries worker discovery.
    pub fn advance<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        connection: &mut dyn WorkerConnection,
        now: &Instant,
    ) {
        if self.disconnected {
            return;
        }

        self.process_queued_rpcs(world, now);

        for (id, error) in self.rpc_queue.sweep(now) {
            self.reference_graph.cancel_rpc(id, now);
            self.report_rpc_error(error);
        }

        for (dependent, refs) in self
            .reference_graph
            .sweep(now, self.config.pending_reference_ttl)
        {
            warn!(
                "Gave up waiting for {} unresolved reference(s) of {:?}",
                refs.len(),
                dependent
            );
        }

        self.flush_retry_rpcs(connection, now);

        for entity_id in self.player_connections.take_timed_out(now) {
            warn!("Player entity {} stopped sending heartbeats", entity_id);
            world.on_player_disconnected(entity_id);
        }

        if let Some(request_id) = self.translator.tick(connection, now) {
            self.pending_requests
                .add_entity_query_handler(request_id, EntityQueryHandler::WorkerDiscovery);
        }
    }

    fn receive_disconnect<W: ObjectGraph>(&mut self, world: &mut W, op: DisconnectOp) {
        warn!("Connection lost: {}", op.reason);

        self.critical_section.clear();
        self.queued_remove_component_ops.clear();
        self.reference_graph.clear();
        self.rpc_queue.clear();
        self.pending_requests.clear();
        self.reliable_rpcs.clear();
        self.player_connections.clear();
        self.acl_responsible_entities.clear();
        self.translator.clear();
        self.entity_added_listeners.clear();
        self.entity_removed_listeners.clear();
        self.view.clear();
        self.disconnected = true;

        world.on_disconnect(&op.reason);
    }

    // Listeners

    /// Called once per entity, after its object has been constructed
    pub fn on_entity_added(&mut self, listener: EntityListener) -> ListenerKey {
        self.entity_added_listeners.add(listener)
    }

    /// Called once per announced entity, after it has been removed
    pub fn on_entity_removed(&mut self, listener: EntityListener) -> ListenerKey {
        self.entity_removed_listeners.add(listener)
    }

    pub fn remove_entity_added_listener(&mut self, key: &ListenerKey) -> bool {
        self.entity_added_listeners.remove(key)
    }

    pub fn remove_entity_removed_listener(&mut self, key: &ListenerKey) -> bool {
        self.entity_removed_listeners.remove(key)
    }

    // Virtual Workers

    pub fn set_virtual_worker_ids(&mut self, ids: &[VirtualWorkerId]) {
        self.translator.set_virtual_worker_ids(ids);
    }

    pub fn get_physical_worker_for_virtual_worker(&self, id: VirtualWorkerId) -> Option<&str> {
        self.translator.get_physical_worker_for_virtual_worker(id)
    }

    pub fn translator(&self) -> &VirtualWorkerTranslator {
        &self.translator
    }

    // Inspection

    pub fn view(&self) -> &EntityView {
        &self.view
    }

    pub fn actor_state(&self, entity_id: &EntityId) -> Option<ActorState> {
        self.view.state(entity_id)
    }

    pub fn is_in_critical_section(&self) -> bool {
        self.critical_section.is_in_batch()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub fn is_responsible_for_acl(&self, entity_id: &EntityId) -> bool {
        self.acl_responsible_entities.contains(entity_id)
    }

    pub fn is_tracking_player(&self, entity_id: &EntityId) -> bool {
        self.player_connections.is_tracking(entity_id)
    }

    pub fn queued_rpc_count(&self) -> usize {
        self.rpc_queue.len()
    }

    pub fn pending_reference_count(&self) -> usize {
        self.reference_graph.len()
    }

    /// Number of dependents still waiting on the entity's construction
    pub fn dependents_waiting_on(&self, entity_id: &EntityId) -> usize {
        self.reference_graph.dependents_waiting_on(entity_id)
    }

    pub fn pending_request_count(&self) -> usize {
        self.pending_requests.len()
    }

    pub fn reliable_rpc_count(&self) -> usize {
        self.reliable_rpcs.len()
    }

    /// Drains the incoming RPCs that were dropped since the last call,
    /// oldest first. At most `RpcConfig::max_buffered_errors` are kept
    /// between calls; every drop is logged regardless.
    pub fn take_rpc_errors(&mut self) -> Vec<RpcError> {
        self.rpc_errors.drain(..).collect()
    }

    fn report_rpc_error(&mut self, error: RpcError) {
        warn!("{}", error);
        if self.config.rpc.max_buffered_errors == 0 {
            return;
        }
        while self.rpc_errors.len() >= self.config.rpc.max_buffered_errors {
            self.rpc_errors.pop_front();
        }
        self.rpc_errors.push_back(error);
    }
}
