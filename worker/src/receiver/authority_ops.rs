use std::time::Instant;

use log::{debug, info};

use meshwork_shared::AuthorityChangeOp;

use super::Receiver;
use crate::{
    connection::worker_connection::WorkerConnection,
    error::ReceiverError,
    requests::pending_requests::EntityQueryHandler,
    world::{
        component_registry::ComponentRole,
        object_graph::{FunctionDispatcher, ObjectGraph},
    },
};

impl Receiver {
    pub(super) fn receive_authority_change<W: ObjectGraph + FunctionDispatcher>(
        &mut self,
        world: &mut W,
        connection: &mut dyn WorkerConnection,
        now: &Instant,
        op: AuthorityChangeOp,
    ) -> Result<(), ReceiverError> {
        let entity_id = op.entity_id;
        let component_id = op.component_id;
        let role = self.registry.role(&component_id);

        if role == ComponentRole::VirtualWorkerTranslation {
            if let Some(request_id) =
                self.translator
                    .authority_changed(entity_id, op.authority, connection)
            {
                self.pending_requests
                    .add_entity_query_handler(request_id, EntityQueryHandler::WorkerDiscovery);
            }
            return Ok(());
        }

        if !self.view.has_entity(&entity_id) {
            return Err(ReceiverError::AuthorityForUnknownEntity {
                entity_id,
                component_id,
            });
        }
        if !self.view.has_component(&entity_id, &component_id) {
            return Err(ReceiverError::AuthorityForUnknownComponent {
                entity_id,
                component_id,
            });
        }

        let was_authoritative = self.view.is_authoritative_over_entity(&entity_id);
        self.view
            .set_authority(&entity_id, &component_id, op.authority);

        match role {
            ComponentRole::EntityAcl => {
                if op.authority.is_authoritative() {
                    self.acl_responsible_entities.insert(entity_id);
                } else {
                    self.acl_responsible_entities.remove(&entity_id);
                }
            }
            ComponentRole::Heartbeat => {
                if !op.authority.is_authoritative() {
                    self.player_connections.stop_tracking(&entity_id);
                } else if !self.player_connections.is_tracking(&entity_id) {
                    self.player_connections.start_tracking(entity_id, now);
                }
            }
            _ => {}
        }

        let is_authoritative = self.view.is_authoritative_over_entity(&entity_id);
        if !was_authoritative && is_authoritative {
            info!("Gained authority over entity {}", entity_id);
            let unparked = self.reliable_rpcs.unpark_owner(&entity_id, now);
            if unparked > 0 {
                debug!(
                    "Releasing {} held reliable RPC(s) from entity {}",
                    unparked, entity_id
                );
                self.flush_retry_rpcs(connection, now);
            }
        } else if was_authoritative && !is_authoritative {
            info!("Lost authority over entity {}", entity_id);
            self.reliable_rpcs.park_owner(&entity_id);
        }

        world.on_authority_changed(entity_id, component_id, op.authority);

        Ok(())
    }
}
