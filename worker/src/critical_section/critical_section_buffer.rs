use log::debug;

use meshwork_shared::{AddComponentOp, AuthorityChangeOp, EntityId, RemoveComponentOp};

use crate::error::ReceiverError;

/// Ops buffered between a critical section's start and end, ready to be
/// replayed as one unit
#[derive(Debug, Default, PartialEq)]
pub struct CriticalSectionBatch {
    pub add_entities: Vec<EntityId>,
    /// Grouped per entity: entities added in the batch first, in the order
    /// they were added, then any other entity in order of first appearance.
    /// Arrival order is kept within a group.
    pub add_components: Vec<AddComponentOp>,
    pub remove_components: Vec<RemoveComponentOp>,
    pub authority_changes: Vec<AuthorityChangeOp>,
}

impl CriticalSectionBatch {
    pub fn is_empty(&self) -> bool {
        self.add_entities.is_empty()
            && self.add_components.is_empty()
            && self.remove_components.is_empty()
            && self.authority_changes.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CriticalSectionState {
    Open,
    InBatch,
}

/// Holds entity-shaping ops that arrive inside a critical section, so that
/// an entity's initial state is observed all at once
pub struct CriticalSectionBuffer {
    state: CriticalSectionState,
    pending_add_entities: Vec<EntityId>,
    pending_add_components: Vec<AddComponentOp>,
    pending_remove_components: Vec<RemoveComponentOp>,
    pending_authority_changes: Vec<AuthorityChangeOp>,
}

impl CriticalSectionBuffer {
    pub fn new() -> Self {
        Self {
            state: CriticalSectionState::Open,
            pending_add_entities: Vec::new(),
            pending_add_components: Vec::new(),
            pending_remove_components: Vec::new(),
            pending_authority_changes: Vec::new(),
        }
    }

    pub fn is_in_batch(&self) -> bool {
        self.state == CriticalSectionState::InBatch
    }

    pub fn enter(&mut self) -> Result<(), ReceiverError> {
        if self.is_in_batch() {
            return Err(ReceiverError::NestedCriticalSection);
        }
        self.state = CriticalSectionState::InBatch;
        Ok(())
    }

    pub fn leave(&mut self) -> Result<CriticalSectionBatch, ReceiverError> {
        if !self.is_in_batch() {
            return Err(ReceiverError::NotInCriticalSection);
        }
        self.state = CriticalSectionState::Open;

        let add_entities = std::mem::take(&mut self.pending_add_entities);
        let add_components =
            group_by_entity(&add_entities, std::mem::take(&mut self.pending_add_components));

        Ok(CriticalSectionBatch {
            add_entities,
            add_components,
            remove_components: std::mem::take(&mut self.pending_remove_components),
            authority_changes: std::mem::take(&mut self.pending_authority_changes),
        })
    }

    pub fn buffer_add_entity(&mut self, entity_id: EntityId) {
        if !self.pending_add_entities.contains(&entity_id) {
            self.pending_add_entities.push(entity_id);
        }
    }

    /// A repeated add of the same component keeps the latest data
    pub fn buffer_add_component(&mut self, op: AddComponentOp) {
        if let Some(existing) = self.pending_add_components.iter_mut().find(|pending| {
            pending.entity_id == op.entity_id && pending.data.component_id == op.data.component_id
        }) {
            existing.data = op.data;
            return;
        }
        self.pending_add_components.push(op);
    }

    /// Removing a component that was added earlier in the same batch
    /// cancels both ops. Returns whether that happened.
    pub fn buffer_remove_component(&mut self, op: RemoveComponentOp) -> bool {
        let before = self.pending_add_components.len();
        self.pending_add_components.retain(|pending| {
            !(pending.entity_id == op.entity_id && pending.data.component_id == op.component_id)
        });
        if self.pending_add_components.len() != before {
            debug!(
                "Add and remove of component {} on entity {} cancelled within critical section",
                op.component_id, op.entity_id
            );
            return true;
        }

        if !self.pending_remove_components.contains(&op) {
            self.pending_remove_components.push(op);
        }
        false
    }

    pub fn buffer_authority_change(&mut self, op: AuthorityChangeOp) {
        self.pending_authority_changes.push(op);
    }

    pub fn has_pending_add_entity(&self, entity_id: &EntityId) -> bool {
        self.pending_add_entities.contains(entity_id)
    }

    /// Drops every buffered op for the entity. Returns whether the entity
    /// itself was added in this batch.
    pub fn cancel_entity(&mut self, entity_id: &EntityId) -> bool {
        let was_added = self.has_pending_add_entity(entity_id);
        self.pending_add_entities.retain(|pending| pending != entity_id);
        self.pending_add_components
            .retain(|pending| pending.entity_id != *entity_id);
        self.pending_remove_components
            .retain(|pending| pending.entity_id != *entity_id);
        self.pending_authority_changes
            .retain(|pending| pending.entity_id != *entity_id);
        was_added
    }

    pub fn clear(&mut self) {
        self.state = CriticalSectionState::Open;
        self.pending_add_entities.clear();
        self.pending_add_components.clear();
        self.pending_remove_components.clear();
        self.pending_authority_changes.clear();
    }
}

impl Default for CriticalSectionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn group_by_entity(
    add_entities: &[EntityId],
    add_components: Vec<AddComponentOp>,
) -> Vec<AddComponentOp> {
    let mut order: Vec<EntityId> = add_entities.to_vec();
    for op in &add_components {
        if !order.contains(&op.entity_id) {
            order.push(op.entity_id);
        }
    }

    let mut groups: Vec<Vec<AddComponentOp>> = order.iter().map(|_| Vec::new()).collect();
    for op in add_components {
        if let Some(index) = order.iter().position(|entity_id| *entity_id == op.entity_id) {
            groups[index].push(op);
        }
    }
    groups.into_iter().flatten().collect()
}
