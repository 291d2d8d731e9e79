use std::collections::HashMap;

use meshwork_shared::{
    ComponentId, CLASS_METADATA_COMPONENT_ID, CLIENT_RPC_ENDPOINT_COMPONENT_ID,
    ENTITY_ACL_COMPONENT_ID, HEARTBEAT_COMPONENT_ID, MULTICAST_RPCS_COMPONENT_ID,
    PACKED_RPCS_COMPONENT_ID, POSITION_COMPONENT_ID, RPCS_ON_ENTITY_CREATION_COMPONENT_ID,
    SERVER_RPC_ENDPOINT_COMPONENT_ID,
    SPAWN_DATA_COMPONENT_ID, TEAR_OFF_COMPONENT_ID, VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
    WORKER_COMPONENT_ID,
};

/// How the Receiver routes ops for a component
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentRole {
    /// Gates construction: where and how the object spawns
    SpawnData,
    /// Gates construction: which class the object is
    ClassMetadata,
    /// Engine bookkeeping that is stored but never applied to objects
    Engine,
    EntityAcl,
    Heartbeat,
    VirtualWorkerTranslation,
    TearOff,
    /// Carries RPCs for the entity that owns the component
    RpcEndpoint,
    /// Carries RPCs addressed to arbitrary entities
    PackedRpcs,
    /// RPCs sent with the entity's initial state, applied once after
    /// construction
    RpcsOnEntityCreation,
    /// Replicated object state
    Data,
    /// Object state passed between server workers when authority moves.
    /// Only the authoritative worker applies updates to it.
    Handover,
}

impl ComponentRole {
    pub fn gates_construction(&self) -> bool {
        matches!(self, ComponentRole::SpawnData | ComponentRole::ClassMetadata)
    }

    /// State applied to the entity's object, as opposed to bookkeeping
    pub fn is_object_state(&self) -> bool {
        matches!(self, ComponentRole::Data | ComponentRole::Handover)
    }

    pub fn carries_rpcs(&self) -> bool {
        matches!(self, ComponentRole::RpcEndpoint | ComponentRole::PackedRpcs)
    }
}

/// Maps component ids to the role the Receiver gives them. Ids that were
/// never registered are treated as replicated data.
pub struct ComponentRegistry {
    roles: HashMap<ComponentId, ComponentRole>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            roles: HashMap::new(),
        };

        registry.register(SPAWN_DATA_COMPONENT_ID, ComponentRole::SpawnData);
        registry.register(CLASS_METADATA_COMPONENT_ID, ComponentRole::ClassMetadata);
        registry.register(POSITION_COMPONENT_ID, ComponentRole::Engine);
        registry.register(WORKER_COMPONENT_ID, ComponentRole::Engine);
        registry.register(ENTITY_ACL_COMPONENT_ID, ComponentRole::EntityAcl);
        registry.register(HEARTBEAT_COMPONENT_ID, ComponentRole::Heartbeat);
        registry.register(
            VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
            ComponentRole::VirtualWorkerTranslation,
        );
        registry.register(TEAR_OFF_COMPONENT_ID, ComponentRole::TearOff);
        registry.register(SERVER_RPC_ENDPOINT_COMPONENT_ID, ComponentRole::RpcEndpoint);
        registry.register(CLIENT_RPC_ENDPOINT_COMPONENT_ID, ComponentRole::RpcEndpoint);
        registry.register(MULTICAST_RPCS_COMPONENT_ID, ComponentRole::RpcEndpoint);
        registry.register(PACKED_RPCS_COMPONENT_ID, ComponentRole::PackedRpcs);
        registry.register(
            RPCS_ON_ENTITY_CREATION_COMPONENT_ID,
            ComponentRole::RpcsOnEntityCreation,
        );

        registry
    }

    pub fn register(&mut self, component_id: ComponentId, role: ComponentRole) {
        self.roles.insert(component_id, role);
    }

    pub fn role(&self, component_id: &ComponentId) -> ComponentRole {
        self.roles
            .get(component_id)
            .copied()
            .unwrap_or(ComponentRole::Data)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
