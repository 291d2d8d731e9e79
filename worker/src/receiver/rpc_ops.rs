use std::time::Instant;

use log::{debug, warn};

use meshwork_shared::{
    CommandIndex, CommandRequestOp, CommandResponseOp, ComponentId, ComponentUpdateOp, EntityId,
    ObjectRef, PackedRpc, RequestId, RpcPayload, SchemaObject, RPC_PAYLOAD_FIELD_ID,
};

use super::Receiver;
use crate::{
    connection::worker_connection::WorkerConnection,
    error::{ReceiverError, RpcApplyError},
    receiver_config::RpcConfig,
    resolution::reference_graph::Dependent,
    rpc::{
        reliable_rpc::ReliableRpcForRetry,
        rpc_error::{RpcError, RpcErrorKind},
        rpc_queue::{ProcessReport, RpcOutcome},
    },
    world::{
        component_registry::ComponentRole,
        entity_view::{ActorState, EntityView},
        object_graph::{FunctionDispatcher, ObjectGraph, RefResolver},
    },
};

/// Command index reliable RPCs are sent under
pub const RPC_COMMAND_INDEX: CommandIndex = 1;

impl Receiver {
    // Incoming

    /// Unpacks every RPC carried in the update's events
    pub(super) fn receive_rpc_events<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        op: &ComponentUpdateOp,
    ) {
        let packed = self.registry.role(&op.update.component_id) == ComponentRole::PackedRpcs;
        let events = &op.update.events;

        for index in 0..events.count(RPC_PAYLOAD_FIELD_ID) {
            let decoded = events
                .index_object(RPC_PAYLOAD_FIELD_ID, index)
                .and_then(|object| {
                    if packed {
                        PackedRpc::from_schema(object).map(|packed_rpc| {
                            (
                                packed_rpc.payload.target(packed_rpc.target_entity),
                                packed_rpc.payload,
                            )
                        })
                    } else {
                        RpcPayload::from_schema(object)
                            .map(|payload| (payload.target(op.entity_id), payload))
                    }
                });

            match decoded {
                Ok((target, payload)) => {
                    self.process_or_queue_incoming_rpc(world, now, target, payload, "");
                }
                Err(source) => {
                    warn!(
                        "{}",
                        ReceiverError::MalformedPayload {
                            entity_id: op.entity_id,
                            component_id: op.update.component_id,
                            source,
                        }
                    );
                    self.report_rpc_error(RpcError {
                        kind: RpcErrorKind::MalformedPayload,
                        target: ObjectRef::root(op.entity_id),
                        rpc_index: index as u32,
                        sender: String::new(),
                    });
                }
            }
        }
    }

    pub(super) fn receive_command_request<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        connection: &mut dyn WorkerConnection,
        now: &Instant,
        op: CommandRequestOp,
    ) {
        if !self.registry.role(&op.component_id).carries_rpcs() {
            warn!(
                "Rejecting command {} on component {} which carries no RPCs",
                op.command_index, op.component_id
            );
            connection.send_command_failure(op.request_id, "Component does not accept commands");
            return;
        }

        let payload = match op
            .request
            .get_object(RPC_PAYLOAD_FIELD_ID)
            .and_then(RpcPayload::from_schema)
        {
            Ok(payload) => payload,
            Err(source) => {
                warn!(
                    "{}",
                    ReceiverError::MalformedPayload {
                        entity_id: op.entity_id,
                        component_id: op.component_id,
                        source,
                    }
                );
                connection.send_command_failure(op.request_id, "Malformed RPC payload");
                return;
            }
        };

        let target = payload.target(op.entity_id);
        self.process_or_queue_incoming_rpc(world, now, target, payload, &op.caller_worker_id);
        connection.send_command_response(op.request_id, op.component_id, SchemaObject::new());
    }

    /// Applies the RPC now if nothing is queued ahead of it and its target
    /// exists, otherwise queues it
    pub(super) fn process_or_queue_incoming_rpc<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        target: ObjectRef,
        payload: RpcPayload,
        sender: &str,
    ) {
        if self.rpc_queue.has_queued(&target) {
            let id = self.rpc_queue.enqueue(target, payload, sender, now);
            debug!("Queued {} behind earlier RPCs for {}", id, target);
            return;
        }

        match evaluate_rpc(&self.view, &self.config.rpc, world, &target, &payload, sender, now, now) {
            RpcOutcome::Applied => {}
            RpcOutcome::Dropped(kind) => {
                self.report_rpc_error(RpcError {
                    kind,
                    target,
                    rpc_index: payload.index,
                    sender: sender.to_string(),
                });
            }
            RpcOutcome::Pending(refs) => {
                let id = self.rpc_queue.enqueue(target, payload, sender, now);
                debug!(
                    "Queued {} for {} until {} reference(s) resolve",
                    id,
                    target,
                    refs.len()
                );
                self.reference_graph
                    .await_resolution(refs, Dependent::Rpc(id), target.entity, now);
            }
        }
    }

    pub(super) fn process_rpc_targets<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        targets: Vec<ObjectRef>,
    ) {
        for target in targets {
            let view = &self.view;
            let config = &self.config.rpc;
            let report = self.rpc_queue.process_target(&target, |rpc| {
                evaluate_rpc(
                    view,
                    config,
                    world,
                    &rpc.target,
                    &rpc.payload,
                    &rpc.sender,
                    &rpc.enqueued_at,
                    now,
                )
            });
            self.handle_rpc_report(report, now);
        }
    }

    pub(super) fn process_queued_rpcs<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
    ) {
        let view = &self.view;
        let config = &self.config.rpc;
        let report = self.rpc_queue.process_all(|rpc| {
            evaluate_rpc(
                view,
                config,
                world,
                &rpc.target,
                &rpc.payload,
                &rpc.sender,
                &rpc.enqueued_at,
                now,
            )
        });
        self.handle_rpc_report(report, now);
    }

    fn handle_rpc_report(&mut self, report: ProcessReport, now: &Instant) {
        for id in report.finished() {
            self.reference_graph.cancel_rpc(id, now);
        }
        for (_, error) in report.dropped {
            self.report_rpc_error(error);
        }
        for (id, target, refs) in report.blocked {
            self.reference_graph
                .await_resolution(refs, Dependent::Rpc(id), target.entity, now);
        }
    }

    // Outgoing

    /// Sends an RPC as a command so the runtime acknowledges it, retrying on
    /// retryable failures. The RPC waits while this worker is not
    /// authoritative over `owner`. Returns the request id if it was sent now.
    pub fn send_reliable_rpc(
        &mut self,
        connection: &mut dyn WorkerConnection,
        owner: EntityId,
        target_entity: EntityId,
        component_id: ComponentId,
        payload: RpcPayload,
    ) -> Option<RequestId> {
        let rpc = ReliableRpcForRetry::new(owner, target_entity, component_id, payload);
        if !self.view.is_authoritative_over_entity(&owner) {
            debug!(
                "Holding reliable RPC from entity {} until this worker is authoritative",
                owner
            );
            self.reliable_rpcs.park(rpc);
            return None;
        }
        Some(self.send_reliable(connection, rpc))
    }

    /// Resends every reliable RPC whose retry is due
    pub fn flush_retry_rpcs(&mut self, connection: &mut dyn WorkerConnection, now: &Instant) {
        for rpc in self.reliable_rpcs.take_due(now) {
            if self.view.is_authoritative_over_entity(&rpc.owner) {
                self.send_reliable(connection, rpc);
            } else {
                self.reliable_rpcs.park(rpc);
            }
        }
    }

    pub(super) fn receive_command_response(&mut self, now: &Instant, op: CommandResponseOp) {
        let Some(rpc) = self.reliable_rpcs.take_in_flight(&op.request_id) else {
            warn!(
                "Dropping command response {} with no matching request",
                op.request_id
            );
            return;
        };

        if op.status.is_success() {
            debug!(
                "Reliable RPC {} to entity {} acknowledged",
                rpc.payload.index, rpc.target_entity
            );
            return;
        }

        if op.status.is_retryable() && rpc.attempts < self.config.rpc.max_reliable_attempts {
            if self.view.is_authoritative_over_entity(&rpc.owner) {
                debug!(
                    "Retrying reliable RPC {} to entity {} after {:?}",
                    rpc.payload.index, rpc.target_entity, op.status
                );
                self.reliable_rpcs
                    .schedule_retry(rpc, *now + self.config.rpc.reliable_retry_delay);
            } else {
                self.reliable_rpcs.park(rpc);
            }
            return;
        }

        warn!(
            "Reliable RPC {} to entity {} failed after {} attempt(s): {:?}",
            rpc.payload.index, rpc.target_entity, rpc.attempts, op.status
        );
    }

    fn send_reliable(
        &mut self,
        connection: &mut dyn WorkerConnection,
        mut rpc: ReliableRpcForRetry,
    ) -> RequestId {
        let mut request = SchemaObject::new();
        request.add_object(RPC_PAYLOAD_FIELD_ID, rpc.payload.to_schema());
        rpc.attempts += 1;

        let request_id = connection.send_command_request(
            rpc.target_entity,
            rpc.component_id,
            RPC_COMMAND_INDEX,
            request,
        );
        self.reliable_rpcs.add_in_flight(request_id, rpc);
        request_id
    }
}

/// Decides what to do with one RPC right now
#[allow(clippy::too_many_arguments)]
fn evaluate_rpc<W: ObjectGraph + FunctionDispatcher>(
    view: &EntityView,
    config: &RpcConfig,
    world: &mut W,
    target: &ObjectRef,
    payload: &RpcPayload,
    sender: &str,
    enqueued_at: &Instant,
    now: &Instant,
) -> RpcOutcome {
    if view.state(&target.entity) == Some(ActorState::TornOff) {
        return RpcOutcome::Dropped(RpcErrorKind::TargetTornOff);
    }
    if !view.is_resolved(target) {
        return RpcOutcome::Pending(vec![*target]);
    }
    if !world.has_object(target) {
        // the sub-object has not been attached yet
        return RpcOutcome::Pending(Vec::new());
    }

    let unresolved: Vec<ObjectRef> = payload
        .refs
        .iter()
        .filter(|object_ref| !view.is_resolved(object_ref))
        .copied()
        .collect();
    if !unresolved.is_empty() {
        if now.saturating_duration_since(*enqueued_at) < config.unresolved_params_timeout {
            return RpcOutcome::Pending(unresolved);
        }
        warn!(
            "Applying RPC {} on {} with {} unresolved argument reference(s)",
            payload.index,
            target,
            unresolved.len()
        );
    }

    match world.apply_rpc(target, payload, sender, view) {
        Ok(()) => RpcOutcome::Applied,
        Err(RpcApplyError::FunctionNotFound { .. }) => {
            RpcOutcome::Dropped(RpcErrorKind::FunctionNotFound)
        }
        Err(RpcApplyError::ObjectDestroyed) => RpcOutcome::Dropped(RpcErrorKind::ObjectDestroyed),
    }
}
