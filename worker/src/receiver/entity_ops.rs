use std::time::Instant;

use log::{debug, info, warn};

use meshwork_shared::{
    AddComponentOp, ClassMetadata, ComponentData, ComponentId, ComponentUpdate, EntityId, FieldId,
    ObjectRef, RemoveComponentOp, RpcsOnEntityCreation, SpawnData, CLASS_METADATA_COMPONENT_ID,
    RPCS_ON_ENTITY_CREATION_COMPONENT_ID, SPAWN_DATA_COMPONENT_ID, TEAR_OFF_COMPONENT_ID,
};

use super::Receiver;
use crate::{
    connection::worker_connection::WorkerConnection,
    error::ReceiverError,
    resolution::reference_graph::Dependent,
    rpc::rpc_error::RpcErrorKind,
    world::{
        component_registry::ComponentRole,
        entity_view::ActorState,
        object_graph::{FunctionDispatcher, ObjectGraph, RefResolver},
    },
};

impl Receiver {
    // Critical Sections

    pub(super) fn leave_critical_section<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        connection: &mut dyn WorkerConnection,
        now: &Instant,
    ) -> Result<(), ReceiverError> {
        let batch = self.critical_section.leave()?;
        debug!(
            "Leaving critical section: {} entities, {} added components, {} removed components, {} authority changes",
            batch.add_entities.len(),
            batch.add_components.len(),
            batch.remove_components.len(),
            batch.authority_changes.len()
        );

        let mut construction_candidates: Vec<EntityId> = Vec::new();
        for entity_id in &batch.add_entities {
            if self.view.add_entity(*entity_id) {
                construction_candidates.push(*entity_id);
            } else {
                debug!("Duplicate AddEntity for {}", entity_id);
            }
        }

        for op in batch.add_components {
            if !construction_candidates.contains(&op.entity_id) {
                construction_candidates.push(op.entity_id);
            }
            self.receive_add_component(world, now, op, false);
        }

        for entity_id in &construction_candidates {
            self.try_construct_entity(world, now, entity_id);
        }

        for op in batch.remove_components {
            self.queue_remove_component(op);
        }
        self.flush_remove_component_ops(world, now);

        for op in batch.authority_changes {
            if let Err(error) = self.receive_authority_change(world, connection, now, op) {
                warn!("Dropping authority change: {}", error);
            }
        }

        Ok(())
    }

    // Adding Entities & Components

    pub(super) fn receive_add_entity<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        entity_id: EntityId,
    ) {
        if !self.view.add_entity(entity_id) {
            debug!("Duplicate AddEntity for {}", entity_id);
            return;
        }
        debug!("Entity {} added, awaiting its initial state", entity_id);
        self.try_construct_entity(world, now, &entity_id);
    }

    /// Stores the component. With `construct` set, a gating component
    /// completes construction right away; inside a batch construction waits
    /// until every component of the batch has been stored.
    pub(super) fn receive_add_component<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        op: AddComponentOp,
        construct: bool,
    ) {
        let entity_id = op.entity_id;
        let component_id = op.data.component_id;

        let Some(state) = self.view.state(&entity_id) else {
            warn!(
                "Dropping component {} added to unknown entity {}",
                component_id, entity_id
            );
            return;
        };
        let role = self.registry.role(&component_id);

        if role == ComponentRole::VirtualWorkerTranslation {
            self.translator.on_component_added(entity_id, &op.data.fields);
        }

        match state {
            ActorState::UnderConstruction => {
                self.view.insert_component(&entity_id, op.data);
                if construct && role.gates_construction() {
                    self.try_construct_entity(world, now, &entity_id);
                }
            }
            ActorState::Live => {
                self.handle_individual_add_component(world, now, entity_id, op.data, role);
            }
            ActorState::TornOff => {
                self.view.insert_component(&entity_id, op.data);
            }
        }
    }

    fn handle_individual_add_component<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        entity_id: EntityId,
        data: ComponentData,
        role: ComponentRole,
    ) {
        let component_id = data.component_id;
        let replaced = self.view.insert_component(&entity_id, data);

        match role {
            ComponentRole::TearOff => {
                self.tear_off_entity(world, now, &entity_id);
            }
            ComponentRole::Data | ComponentRole::Handover => {
                let Some(data) = self.view.component(&entity_id, &component_id) else {
                    return;
                };
                // a repeated add carries the component's full state again
                let result = if replaced {
                    world.apply_component_data(entity_id, data, &self.view)
                } else {
                    world.attach_subobject(entity_id, data, &self.view)
                };
                if let Err(error) = result {
                    warn!("{}", error);
                    return;
                }
                let field_ids: Vec<FieldId> = data.fields.field_ids().collect();
                self.track_field_references(entity_id, component_id, field_ids, now);

                let targets = self.rpc_queue.targets_for_entity(&entity_id);
                self.process_rpc_targets(world, now, targets);
            }
            _ => {}
        }
    }

    // Construction

    /// Builds the entity's object once both gating components are present
    pub(super) fn try_construct_entity<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        entity_id: &EntityId,
    ) {
        if self.view.state(entity_id) != Some(ActorState::UnderConstruction) {
            return;
        }

        let (Some(metadata_data), Some(spawn_data)) = (
            self.view.component(entity_id, &CLASS_METADATA_COMPONENT_ID),
            self.view.component(entity_id, &SPAWN_DATA_COMPONENT_ID),
        ) else {
            return;
        };

        let metadata = match ClassMetadata::from_schema(&metadata_data.fields) {
            Ok(metadata) => metadata,
            Err(source) => {
                warn!(
                    "{}",
                    ReceiverError::MalformedPayload {
                        entity_id: *entity_id,
                        component_id: CLASS_METADATA_COMPONENT_ID,
                        source,
                    }
                );
                return;
            }
        };
        let spawn_data = match SpawnData::from_schema(&spawn_data.fields) {
            Ok(spawn_data) => spawn_data,
            Err(source) => {
                warn!(
                    "{}",
                    ReceiverError::MalformedPayload {
                        entity_id: *entity_id,
                        component_id: SPAWN_DATA_COMPONENT_ID,
                        source,
                    }
                );
                return;
            }
        };

        if self.view.has_component(entity_id, &TEAR_OFF_COMPONENT_ID) {
            info!(
                "Entity {} arrived torn off, no object will be created",
                entity_id
            );
            self.view.set_state(entity_id, ActorState::TornOff);
            return;
        }

        if let Err(error) = world.create_object(*entity_id, &metadata, &spawn_data) {
            warn!("Failed to construct entity {}: {}", entity_id, error);
            return;
        }
        self.view.set_has_object(entity_id, true);
        self.view.set_state(entity_id, ActorState::Live);

        for component_id in self.view.component_ids(entity_id) {
            if !self.registry.role(&component_id).is_object_state() {
                continue;
            }
            let Some(data) = self.view.component(entity_id, &component_id) else {
                continue;
            };
            if let Err(error) = world.apply_component_data(*entity_id, data, &self.view) {
                warn!("{}", error);
                continue;
            }
            let field_ids: Vec<FieldId> = data.fields.field_ids().collect();
            self.track_field_references(*entity_id, component_id, field_ids, now);
        }

        info!("Entity {} constructed as {}", entity_id, metadata.class_path);
        self.entity_added_listeners.broadcast(*entity_id);

        self.on_entity_resolved(world, now, entity_id);
        self.process_rpcs_on_entity_creation(world, now, entity_id);
    }

    /// Applies the RPCs sent along with the entity's initial state, in the
    /// order they were written
    fn process_rpcs_on_entity_creation<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        entity_id: &EntityId,
    ) {
        let Some(data) = self
            .view
            .component(entity_id, &RPCS_ON_ENTITY_CREATION_COMPONENT_ID)
        else {
            return;
        };
        let queued = match RpcsOnEntityCreation::from_schema(&data.fields) {
            Ok(queued) => queued,
            Err(source) => {
                warn!(
                    "{}",
                    ReceiverError::MalformedPayload {
                        entity_id: *entity_id,
                        component_id: RPCS_ON_ENTITY_CREATION_COMPONENT_ID,
                        source,
                    }
                );
                return;
            }
        };

        debug!(
            "Processing {} RPC(s) sent on creation of entity {}",
            queued.rpcs.len(),
            entity_id
        );
        for payload in queued.rpcs {
            let target = payload.target(*entity_id);
            self.process_or_queue_incoming_rpc(world, now, target, payload, "");
        }
    }

    /// Waits on every reference in the given fields that cannot be wired up
    /// yet. A field whose references are all resolved drops any earlier wait.
    pub(super) fn track_field_references(
        &mut self,
        entity_id: EntityId,
        component_id: ComponentId,
        field_ids: Vec<FieldId>,
        now: &Instant,
    ) {
        let Some(data) = self.view.component(&entity_id, &component_id) else {
            return;
        };
        for field_id in field_ids {
            let unresolved: Vec<ObjectRef> = data
                .fields
                .field_object_refs(field_id)
                .into_iter()
                .filter(|object_ref| !self.view.is_resolved(object_ref))
                .collect();
            let dependent = Dependent::Property {
                entity_id,
                component_id,
                field_id,
            };
            if self
                .reference_graph
                .await_resolution(unresolved, dependent, entity_id, now)
                .is_some()
            {
                debug!(
                    "Field {} of component {} on entity {} waits on unresolved references",
                    field_id, component_id, entity_id
                );
            }
        }
    }

    /// The entity's object exists: deliver everything that waited on it
    fn on_entity_resolved<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        entity_id: &EntityId,
    ) {
        let mut targets: Vec<ObjectRef> = Vec::new();

        for resolution in self.reference_graph.resolve(entity_id, now) {
            match resolution.dependent {
                Dependent::Property {
                    entity_id: owner,
                    component_id,
                    field_id,
                } => {
                    self.reapply_field(world, owner, component_id, field_id);
                }
                Dependent::Rpc(id) => {
                    if let Some(target) = self.rpc_queue.target_of(&id) {
                        if !targets.contains(&target) {
                            targets.push(target);
                        }
                    }
                }
            }
        }

        for target in self.rpc_queue.targets_for_entity(entity_id) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        self.process_rpc_targets(world, now, targets);
    }

    fn reapply_field<W: ObjectGraph>(
        &mut self,
        world: &mut W,
        entity_id: EntityId,
        component_id: ComponentId,
        field_id: FieldId,
    ) {
        if self.view.state(&entity_id) != Some(ActorState::Live) {
            return;
        }
        // handover is applied only while authoritative, data only while not
        let handover = self.registry.role(&component_id) == ComponentRole::Handover;
        if self
            .view
            .authority(&entity_id, &component_id)
            .is_authoritative()
            != handover
        {
            return;
        }
        let Some(data) = self.view.component(&entity_id, &component_id) else {
            return;
        };

        let update = ComponentUpdate::with_fields(component_id, data.fields.extract_field(field_id));
        let result = if handover {
            world.apply_handover_update(entity_id, &update, &self.view)
        } else {
            world.apply_component_update(entity_id, &update, &self.view)
        };
        match result {
            Ok(()) => debug!(
                "Re-applied field {} of component {} on entity {}",
                field_id, component_id, entity_id
            ),
            Err(error) => warn!("{}", error),
        }
    }

    // Tearing Off

    fn tear_off_entity<W: ObjectGraph>(&mut self, world: &mut W, now: &Instant, entity_id: &EntityId) {
        if self.view.state(entity_id) != Some(ActorState::Live) {
            return;
        }

        world.tear_off_object(*entity_id);
        self.view.set_state(entity_id, ActorState::TornOff);
        self.reference_graph.release(entity_id, now);

        for (id, error) in self
            .rpc_queue
            .clear_entity(entity_id, RpcErrorKind::TargetTornOff)
        {
            self.reference_graph.cancel_rpc(id, now);
            self.report_rpc_error(error);
        }

        info!("Entity {} torn off", entity_id);
    }

    // Removing Entities & Components

    pub(super) fn receive_remove_entity<W: ObjectGraph>(
        &mut self,
        world: &mut W,
        now: &Instant,
        entity_id: EntityId,
    ) {
        if self.critical_section.is_in_batch()
            && self.critical_section.cancel_entity(&entity_id)
            && !self.view.has_entity(&entity_id)
        {
            debug!(
                "Entity {} added and removed within one critical section",
                entity_id
            );
            return;
        }

        let Some(state) = self.view.state(&entity_id) else {
            debug!("Dropping RemoveEntity for unknown entity {}", entity_id);
            return;
        };

        self.queued_remove_component_ops
            .retain(|op| op.entity_id != entity_id);

        let released = self.reference_graph.release(&entity_id, now);
        if !released.is_empty() {
            debug!(
                "Dropped {} pending reference(s) owned by entity {}",
                released.len(),
                entity_id
            );
        }

        for (id, error) in self
            .rpc_queue
            .clear_entity(&entity_id, RpcErrorKind::ObjectDestroyed)
        {
            self.reference_graph.cancel_rpc(id, now);
            self.report_rpc_error(error);
        }

        self.player_connections.stop_tracking(&entity_id);
        self.acl_responsible_entities.remove(&entity_id);
        let dropped = self.reliable_rpcs.drop_owner(&entity_id);
        if dropped > 0 {
            debug!(
                "Dropped {} unacknowledged reliable RPC(s) sent by entity {}",
                dropped, entity_id
            );
        }

        let announced = self.view.has_object(&entity_id);
        // a torn off object belongs to the local simulation now
        if state == ActorState::Live {
            world.destroy_object(entity_id);
        }
        self.view.remove_entity(&entity_id);

        if announced {
            info!("Entity {} removed", entity_id);
            self.entity_removed_listeners.broadcast(entity_id);
        }
    }

    pub(super) fn queue_remove_component(&mut self, op: RemoveComponentOp) {
        if !self.queued_remove_component_ops.contains(&op) {
            self.queued_remove_component_ops.push(op);
        }
    }

    pub(super) fn flush_remove_component_ops<W: ObjectGraph>(&mut self, world: &mut W, now: &Instant) {
        for op in std::mem::take(&mut self.queued_remove_component_ops) {
            self.remove_component(world, now, op);
        }
    }

    fn remove_component<W: ObjectGraph>(&mut self, world: &mut W, now: &Instant, op: RemoveComponentOp) {
        let entity_id = op.entity_id;
        let component_id = op.component_id;

        let Some(state) = self.view.state(&entity_id) else {
            debug!(
                "Dropping removal of component {} from unknown entity {}",
                component_id, entity_id
            );
            return;
        };
        if self.view.remove_component(&entity_id, &component_id).is_none() {
            debug!(
                "Component {} already absent from entity {}",
                component_id, entity_id
            );
            return;
        }

        self.reference_graph
            .cancel_component(&entity_id, &component_id, now);

        match self.registry.role(&component_id) {
            ComponentRole::EntityAcl => {
                self.acl_responsible_entities.remove(&entity_id);
            }
            ComponentRole::Heartbeat => {
                self.player_connections.stop_tracking(&entity_id);
            }
            role if role.is_object_state() && state == ActorState::Live => {
                world.detach_subobject(entity_id, component_id);
            }
            _ => {}
        }

        if !self.view.is_authoritative_over_entity(&entity_id) {
            self.reliable_rpcs.park_owner(&entity_id);
        }
    }
}
