use crate::{ComponentId, SchemaObject};

/// Full state of one component, as delivered by an AddComponent op or as the
/// initial state of an entity-creation request.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentData {
    pub component_id: ComponentId,
    pub fields: SchemaObject,
}

impl ComponentData {
    pub fn new(component_id: ComponentId, fields: SchemaObject) -> Self {
        Self {
            component_id,
            fields,
        }
    }

    pub fn empty(component_id: ComponentId) -> Self {
        Self::new(component_id, SchemaObject::new())
    }

    pub fn apply_update(&mut self, update: &ComponentUpdate) {
        self.fields.merge(&update.fields);
    }
}

/// Partial state change of one component. `fields` holds the changed fields,
/// `events` holds transient payloads (RPCs) that are never merged into state.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentUpdate {
    pub component_id: ComponentId,
    pub fields: SchemaObject,
    pub events: SchemaObject,
}

impl ComponentUpdate {
    pub fn new(component_id: ComponentId) -> Self {
        Self {
            component_id,
            fields: SchemaObject::new(),
            events: SchemaObject::new(),
        }
    }

    pub fn with_fields(component_id: ComponentId, fields: SchemaObject) -> Self {
        Self {
            component_id,
            fields,
            events: SchemaObject::new(),
        }
    }

    pub fn with_events(component_id: ComponentId, events: SchemaObject) -> Self {
        Self {
            component_id,
            fields: SchemaObject::new(),
            events,
        }
    }
}
