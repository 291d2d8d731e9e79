use std::{
    collections::{BTreeMap, VecDeque},
    time::Instant,
};

use log::{debug, info, warn};

use meshwork_shared::{
    Authority, ComponentUpdate, ComponentUpdateOp, EntityId, EntityQuery, EntityQueryResponseOp,
    PhysicalWorkerName, QueryConstraint, RequestId, SchemaObject, VirtualWorkerId,
    WorkerComponent, VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID, WORKER_COMPONENT_ID,
};

use crate::{connection::worker_connection::WorkerConnection, receiver_config::TranslatorConfig};

const MAPPING_FIELD_ID: u32 = 1;
const MAPPING_VIRTUAL_WORKER_ID_FIELD_ID: u32 = 1;
const MAPPING_PHYSICAL_WORKER_NAME_FIELD_ID: u32 = 2;

/// Translates virtual worker ids, which partition the simulation
/// statically, into the physical workers currently running them.
///
/// Every worker holds a read-only copy of the mapping that follows the
/// translation component. The one worker authoritative over that component
/// fills unassigned slots: it queries the runtime for worker entities,
/// assigns eligible ones to the oldest unassigned ids, and broadcasts the
/// full mapping.
pub struct VirtualWorkerTranslator {
    config: TranslatorConfig,
    virtual_to_physical_mapping: BTreeMap<VirtualWorkerId, PhysicalWorkerName>,
    unassigned_virtual_workers: VecDeque<VirtualWorkerId>,
    known_virtual_workers: Vec<VirtualWorkerId>,
    is_authoritative: bool,
    translation_entity: Option<EntityId>,
    worker_query_in_flight: Option<RequestId>,
    query_retry_at: Option<Instant>,
}

impl VirtualWorkerTranslator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self {
            config,
            virtual_to_physical_mapping: BTreeMap::new(),
            unassigned_virtual_workers: VecDeque::new(),
            known_virtual_workers: Vec::new(),
            is_authoritative: false,
            translation_entity: None,
            worker_query_in_flight: None,
            query_retry_at: None,
        }
    }

    /// Declares the statically enumerated virtual workers. Ids not seen
    /// before are appended to the unassigned queue in the given order.
    pub fn set_virtual_worker_ids(&mut self, ids: &[VirtualWorkerId]) {
        for id in ids {
            self.learn_virtual_worker(*id);
        }
    }

    /// Name of the worker currently running the virtual worker, if any
    pub fn get_physical_worker_for_virtual_worker(&self, id: VirtualWorkerId) -> Option<&str> {
        self.virtual_to_physical_mapping
            .get(&id)
            .map(|name| name.as_str())
    }

    pub fn unassigned_virtual_workers(&self) -> Vec<VirtualWorkerId> {
        self.unassigned_virtual_workers.iter().copied().collect()
    }

    pub fn is_authoritative(&self) -> bool {
        self.is_authoritative
    }

    pub fn worker_query_in_flight(&self) -> Option<RequestId> {
        self.worker_query_in_flight
    }

    pub fn translation_entity(&self) -> Option<EntityId> {
        self.translation_entity
    }

    // Mapping State

    /// Replaces the mapping with the snapshot held in the object's mapping
    /// field
    pub fn apply_mapping(&mut self, object: &SchemaObject) {
        let mut new_mapping = BTreeMap::new();
        for index in 0..object.count(MAPPING_FIELD_ID) {
            let entry = match object.index_object(MAPPING_FIELD_ID, index) {
                Ok(entry) => entry,
                Err(error) => {
                    warn!("Skipping malformed virtual worker mapping entry: {}", error);
                    continue;
                }
            };
            let id = entry.get_u32(MAPPING_VIRTUAL_WORKER_ID_FIELD_ID);
            let name = entry.get_string(MAPPING_PHYSICAL_WORKER_NAME_FIELD_ID);
            match (id, name) {
                (Ok(id), Ok(name)) => {
                    new_mapping.insert(id, name.to_string());
                }
                (Err(error), _) | (_, Err(error)) => {
                    warn!("Skipping malformed virtual worker mapping entry: {}", error);
                }
            }
        }

        self.virtual_to_physical_mapping = new_mapping;

        let mapped: Vec<VirtualWorkerId> =
            self.virtual_to_physical_mapping.keys().copied().collect();
        for id in mapped {
            if !self.known_virtual_workers.contains(&id) {
                self.known_virtual_workers.push(id);
            }
        }

        let mapping = &self.virtual_to_physical_mapping;
        self.unassigned_virtual_workers
            .retain(|id| !mapping.contains_key(id));
        for id in &self.known_virtual_workers {
            if !mapping.contains_key(id) && !self.unassigned_virtual_workers.contains(id) {
                self.unassigned_virtual_workers.push_back(*id);
            }
        }

        debug!(
            "Applied virtual worker mapping: {} assigned, {} unassigned",
            self.virtual_to_physical_mapping.len(),
            self.unassigned_virtual_workers.len()
        );
    }

    /// Writes the whole mapping, one entry per assignment, ordered by
    /// virtual worker id
    pub fn write_mapping(&self) -> SchemaObject {
        let mut object = SchemaObject::new();
        for (id, name) in &self.virtual_to_physical_mapping {
            let mut entry = SchemaObject::new();
            entry
                .add_u32(MAPPING_VIRTUAL_WORKER_ID_FIELD_ID, *id)
                .add_string(MAPPING_PHYSICAL_WORKER_NAME_FIELD_ID, name);
            object.add_object(MAPPING_FIELD_ID, entry);
        }
        object
    }

    /// Initial state of the translation component
    pub fn on_component_added(&mut self, entity_id: EntityId, fields: &SchemaObject) {
        self.translation_entity = Some(entity_id);
        if !self.is_authoritative {
            self.apply_mapping(fields);
        }
    }

    pub fn on_component_updated(&mut self, op: &ComponentUpdateOp) {
        self.translation_entity = Some(op.entity_id);
        // the authoritative worker is the source of the mapping
        if self.is_authoritative {
            return;
        }
        // every update carries the whole mapping; an empty one unassigns all
        self.apply_mapping(&op.update.fields);
    }

    // Authority & Discovery

    /// Returns the id of the discovery query if one was sent
    pub fn authority_changed(
        &mut self,
        entity_id: EntityId,
        authority: Authority,
        connection: &mut dyn WorkerConnection,
    ) -> Option<RequestId> {
        self.translation_entity = Some(entity_id);

        if authority.is_authoritative() {
            if self.is_authoritative {
                return None;
            }
            info!("This worker now owns the virtual worker mapping");
            self.is_authoritative = true;
            if self.unassigned_virtual_workers.is_empty() {
                return None;
            }
            self.query_for_worker_entities(connection)
        } else {
            if self.is_authoritative {
                info!("This worker no longer owns the virtual worker mapping");
            }
            self.is_authoritative = false;
            self.worker_query_in_flight = None;
            self.query_retry_at = None;
            None
        }
    }

    /// Sends the discovery query unless one is already in flight
    pub fn query_for_worker_entities(
        &mut self,
        connection: &mut dyn WorkerConnection,
    ) -> Option<RequestId> {
        if self.worker_query_in_flight.is_some() {
            debug!("Worker entity query already in flight");
            return None;
        }

        let query = EntityQuery::snapshot(
            QueryConstraint::Component(WORKER_COMPONENT_ID),
            vec![WORKER_COMPONENT_ID],
        );
        let request_id = connection.send_entity_query(&query);
        self.worker_query_in_flight = Some(request_id);
        self.query_retry_at = None;
        debug!("Sent worker entity query {}", request_id);
        Some(request_id)
    }

    pub fn handle_worker_query_response(
        &mut self,
        op: &EntityQueryResponseOp,
        connection: &mut dyn WorkerConnection,
        now: &Instant,
    ) {
        if !self.is_authoritative {
            debug!(
                "Discarding worker entity query {} received after losing authority",
                op.request_id
            );
            return;
        }
        if self.worker_query_in_flight != Some(op.request_id) {
            debug!("Discarding stale worker entity query {}", op.request_id);
            return;
        }
        self.worker_query_in_flight = None;

        if !op.status.is_success() {
            warn!(
                "Worker entity query {} failed: {:?}",
                op.request_id, op.status
            );
            self.query_retry_at = Some(*now + self.config.query_retry_delay);
            return;
        }

        let mut assigned = 0;
        for entity in &op.results {
            if self.unassigned_virtual_workers.is_empty() {
                break;
            }
            let Some(data) = entity.component(WORKER_COMPONENT_ID) else {
                continue;
            };
            let worker = match WorkerComponent::from_schema(&data.fields) {
                Ok(worker) => worker,
                Err(error) => {
                    warn!(
                        "Skipping worker entity {} with malformed worker component: {}",
                        entity.entity_id, error
                    );
                    continue;
                }
            };
            if worker.worker_type != self.config.eligible_worker_type {
                continue;
            }
            if self
                .virtual_to_physical_mapping
                .values()
                .any(|name| *name == worker.worker_id)
            {
                continue;
            }
            self.assign_worker(&worker.worker_id);
            assigned += 1;
        }

        if assigned > 0 {
            self.send_virtual_worker_mapping_update(connection);
        }

        if !self.unassigned_virtual_workers.is_empty() {
            self.query_retry_at = Some(*now + self.config.query_retry_delay);
        }
    }

    /// Issues the discovery query while slots are unassigned: once the retry
    /// delay has passed after a failed or partial query, or straight away if
    /// ids were declared after authority was gained
    pub fn tick(
        &mut self,
        connection: &mut dyn WorkerConnection,
        now: &Instant,
    ) -> Option<RequestId> {
        if !self.is_authoritative
            || self.unassigned_virtual_workers.is_empty()
            || self.worker_query_in_flight.is_some()
        {
            return None;
        }
        if let Some(retry_at) = self.query_retry_at {
            if *now < retry_at {
                return None;
            }
        }
        self.query_for_worker_entities(connection)
    }

    pub fn clear(&mut self) {
        self.is_authoritative = false;
        self.worker_query_in_flight = None;
        self.query_retry_at = None;
    }

    // Assignment

    fn learn_virtual_worker(&mut self, id: VirtualWorkerId) {
        if self.known_virtual_workers.contains(&id) {
            return;
        }
        self.known_virtual_workers.push(id);
        if !self.virtual_to_physical_mapping.contains_key(&id) {
            self.unassigned_virtual_workers.push_back(id);
        }
    }

    fn assign_worker(&mut self, worker_id: &str) {
        let Some(id) = self.unassigned_virtual_workers.pop_front() else {
            return;
        };
        info!("Assigned virtual worker {} to {}", id, worker_id);
        self.virtual_to_physical_mapping
            .insert(id, worker_id.to_string());
    }

    fn send_virtual_worker_mapping_update(&self, connection: &mut dyn WorkerConnection) {
        let Some(entity_id) = self.translation_entity else {
            warn!("Cannot broadcast virtual worker mapping without a translation entity");
            return;
        };
        info!(
            "Broadcasting virtual worker mapping with {} assignment(s)",
            self.virtual_to_physical_mapping.len()
        );
        connection.send_component_update(
            entity_id,
            ComponentUpdate::with_fields(
                VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
                self.write_mapping(),
            ),
        );
    }
}
