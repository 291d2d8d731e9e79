use std::time::Instant;

use log::{debug, info, warn};

use meshwork_shared::{ComponentUpdateOp, FieldId, Heartbeat};

use super::Receiver;
use crate::{
    error::ReceiverError,
    world::{
        component_registry::ComponentRole,
        entity_view::ActorState,
        object_graph::{FunctionDispatcher, ObjectGraph},
    },
};

impl Receiver {
    pub(super) fn receive_component_update<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        now: &Instant,
        op: ComponentUpdateOp,
    ) {
        match self.registry.role(&op.update.component_id) {
            ComponentRole::VirtualWorkerTranslation => {
                self.view.apply_update(&op.entity_id, &op.update);
                self.translator.on_component_updated(&op);
            }
            ComponentRole::Heartbeat => {
                self.view.apply_update(&op.entity_id, &op.update);
                self.receive_heartbeat(world, now, &op);
            }
            ComponentRole::RpcEndpoint | ComponentRole::PackedRpcs => {
                self.view.apply_update(&op.entity_id, &op.update);
                self.receive_rpc_events(world, now, &op);
            }
            ComponentRole::Data => {
                self.apply_state_update(world, now, op, false);
            }
            ComponentRole::Handover => {
                self.apply_state_update(world, now, op, true);
            }
            ComponentRole::SpawnData
            | ComponentRole::ClassMetadata
            | ComponentRole::Engine
            | ComponentRole::EntityAcl
            | ComponentRole::TearOff
            | ComponentRole::RpcsOnEntityCreation => {
                self.view.apply_update(&op.entity_id, &op.update);
            }
        }
    }

    /// Replicated data is applied only while this worker is not
    /// authoritative over the component; handover only while it is.
    fn apply_state_update<W: ObjectGraph>(
        &mut self,
        world: &mut W,
        now: &Instant,
        op: ComponentUpdateOp,
        handover: bool,
    ) {
        let entity_id = op.entity_id;
        let component_id = op.update.component_id;

        match self.view.state(&entity_id) {
            None => {
                debug!(
                    "Dropping update of component {} for unknown entity {}",
                    component_id, entity_id
                );
                return;
            }
            Some(ActorState::UnderConstruction) => {
                // applied with the rest of the initial state at construction
                self.view.apply_update(&entity_id, &op.update);
                return;
            }
            Some(ActorState::TornOff) => {
                debug!(
                    "Dropping update of component {} for torn off entity {}",
                    component_id, entity_id
                );
                return;
            }
            Some(ActorState::Live) => {}
        }

        let is_authoritative = self
            .view
            .authority(&entity_id, &component_id)
            .is_authoritative();
        if is_authoritative && !handover {
            debug!(
                "Ignoring update of component {} on entity {}, this worker is authoritative",
                component_id, entity_id
            );
            return;
        }
        if !is_authoritative && handover {
            debug!(
                "Ignoring handover of component {} on entity {}, this worker is not authoritative",
                component_id, entity_id
            );
            return;
        }

        if !self.view.apply_update(&entity_id, &op.update) {
            warn!(
                "Dropping update of component {} which entity {} does not have",
                component_id, entity_id
            );
            return;
        }

        let result = if handover {
            world.apply_handover_update(entity_id, &op.update, &self.view)
        } else {
            world.apply_component_update(entity_id, &op.update, &self.view)
        };
        if let Err(error) = result {
            warn!("{}", error);
            return;
        }

        let field_ids: Vec<FieldId> = op.update.fields.field_ids().collect();
        self.track_field_references(entity_id, component_id, field_ids, now);
    }

    fn receive_heartbeat<W: ObjectGraph>(&mut self, world: &mut W, now: &Instant, op: &ComponentUpdateOp) {
        let entity_id = op.entity_id;
        if !self.player_connections.is_tracking(&entity_id) {
            return;
        }

        let heartbeat = match Heartbeat::from_schema(&op.update.fields) {
            Ok(heartbeat) => heartbeat,
            Err(source) => {
                warn!(
                    "{}",
                    ReceiverError::MalformedPayload {
                        entity_id,
                        component_id: op.update.component_id,
                        source,
                    }
                );
                return;
            }
        };

        if heartbeat.client_has_quit {
            self.player_connections.stop_tracking(&entity_id);
            info!("Player on entity {} quit", entity_id);
            world.on_player_disconnected(entity_id);
        } else {
            self.player_connections.on_heartbeat(&entity_id, now);
        }
    }
}
