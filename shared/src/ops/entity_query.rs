use crate::{ComponentData, ComponentId, EntityId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryConstraint {
    Entity(EntityId),
    Component(ComponentId),
    And(Vec<QueryConstraint>),
    Or(Vec<QueryConstraint>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryResultType {
    Count,
    /// Snapshot of the listed components for every matching entity
    Snapshot(Vec<ComponentId>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityQuery {
    pub constraint: QueryConstraint,
    pub result_type: QueryResultType,
}

impl EntityQuery {
    pub fn snapshot(constraint: QueryConstraint, components: Vec<ComponentId>) -> Self {
        Self {
            constraint,
            result_type: QueryResultType::Snapshot(components),
        }
    }
}

/// One entity returned by a snapshot query
#[derive(Clone, Debug, PartialEq)]
pub struct QueriedEntity {
    pub entity_id: EntityId,
    pub components: Vec<ComponentData>,
}

impl QueriedEntity {
    pub fn component(&self, component_id: ComponentId) -> Option<&ComponentData> {
        self.components
            .iter()
            .find(|data| data.component_id == component_id)
    }
}
