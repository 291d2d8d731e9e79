use std::collections::{BTreeMap, HashMap};

use meshwork_shared::{Authority, ComponentData, ComponentId, ComponentUpdate, EntityId, ObjectRef};

use super::object_graph::RefResolver;

/// Lifecycle of an entity as seen by this worker.
///
/// An entity that was never added is not in the view at all, and a removed
/// entity is dropped from it, so only the in-between states are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorState {
    /// Added, but its gating components have not all arrived
    UnderConstruction,
    /// Its object exists and receives replicated data
    Live,
    /// Replication into its object has stopped
    TornOff,
}

pub struct EntityRecord {
    state: ActorState,
    has_object: bool,
    components: BTreeMap<ComponentId, ComponentData>,
    authority: HashMap<ComponentId, Authority>,
}

impl EntityRecord {
    fn new() -> Self {
        Self {
            state: ActorState::UnderConstruction,
            has_object: false,
            components: BTreeMap::new(),
            authority: HashMap::new(),
        }
    }

    pub fn state(&self) -> ActorState {
        self.state
    }

    pub fn has_object(&self) -> bool {
        self.has_object
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentData> {
        self.components.values()
    }
}

/// Local copy of every entity the runtime has told this worker about:
/// lifecycle state, the latest data of each component, and per-component
/// authority.
pub struct EntityView {
    records: HashMap<EntityId, EntityRecord>,
}

impl EntityView {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Returns false if the entity was already in the view
    pub fn add_entity(&mut self, entity_id: EntityId) -> bool {
        if self.records.contains_key(&entity_id) {
            return false;
        }
        self.records.insert(entity_id, EntityRecord::new());
        true
    }

    pub fn remove_entity(&mut self, entity_id: &EntityId) -> Option<EntityRecord> {
        self.records.remove(entity_id)
    }

    pub fn has_entity(&self, entity_id: &EntityId) -> bool {
        self.records.contains_key(entity_id)
    }

    pub fn state(&self, entity_id: &EntityId) -> Option<ActorState> {
        self.records.get(entity_id).map(|record| record.state)
    }

    pub fn set_state(&mut self, entity_id: &EntityId, state: ActorState) {
        if let Some(record) = self.records.get_mut(entity_id) {
            record.state = state;
        }
    }

    pub fn has_object(&self, entity_id: &EntityId) -> bool {
        self.records
            .get(entity_id)
            .map(|record| record.has_object)
            .unwrap_or(false)
    }

    pub fn set_has_object(&mut self, entity_id: &EntityId, has_object: bool) {
        if let Some(record) = self.records.get_mut(entity_id) {
            record.has_object = has_object;
        }
    }

    pub fn entities(&self) -> Vec<EntityId> {
        self.records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // Components

    pub fn has_component(&self, entity_id: &EntityId, component_id: &ComponentId) -> bool {
        self.records
            .get(entity_id)
            .map(|record| record.components.contains_key(component_id))
            .unwrap_or(false)
    }

    pub fn component(
        &self,
        entity_id: &EntityId,
        component_id: &ComponentId,
    ) -> Option<&ComponentData> {
        self.records
            .get(entity_id)
            .and_then(|record| record.components.get(component_id))
    }

    /// Component ids of the entity in ascending order
    pub fn component_ids(&self, entity_id: &EntityId) -> Vec<ComponentId> {
        self.records
            .get(entity_id)
            .map(|record| record.components.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Stores the component's full state, replacing any earlier copy.
    /// Returns whether a copy already existed.
    pub fn insert_component(&mut self, entity_id: &EntityId, data: ComponentData) -> bool {
        let Some(record) = self.records.get_mut(entity_id) else {
            return false;
        };
        record.components.insert(data.component_id, data).is_some()
    }

    pub fn remove_component(
        &mut self,
        entity_id: &EntityId,
        component_id: &ComponentId,
    ) -> Option<ComponentData> {
        let record = self.records.get_mut(entity_id)?;
        record.authority.remove(component_id);
        record.components.remove(component_id)
    }

    /// Merges an update into the stored component. Returns false if the
    /// entity or component is unknown.
    pub fn apply_update(&mut self, entity_id: &EntityId, update: &ComponentUpdate) -> bool {
        let Some(data) = self
            .records
            .get_mut(entity_id)
            .and_then(|record| record.components.get_mut(&update.component_id))
        else {
            return false;
        };
        data.apply_update(update);
        true
    }

    // Authority

    pub fn authority(&self, entity_id: &EntityId, component_id: &ComponentId) -> Authority {
        self.records
            .get(entity_id)
            .and_then(|record| record.authority.get(component_id))
            .copied()
            .unwrap_or(Authority::NotAuthoritative)
    }

    pub fn set_authority(
        &mut self,
        entity_id: &EntityId,
        component_id: &ComponentId,
        authority: Authority,
    ) {
        if let Some(record) = self.records.get_mut(entity_id) {
            if authority == Authority::NotAuthoritative {
                record.authority.remove(component_id);
            } else {
                record.authority.insert(*component_id, authority);
            }
        }
    }

    /// Whether this worker is authoritative over at least one component of
    /// the entity
    pub fn is_authoritative_over_entity(&self, entity_id: &EntityId) -> bool {
        self.records
            .get(entity_id)
            .map(|record| {
                record
                    .authority
                    .values()
                    .any(|authority| authority.is_authoritative())
            })
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for EntityView {
    fn default() -> Self {
        Self::new()
    }
}

impl RefResolver for EntityView {
    fn is_resolved(&self, object_ref: &ObjectRef) -> bool {
        object_ref.is_null() || self.has_object(&object_ref.entity)
    }
}
