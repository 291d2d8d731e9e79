//! Component ids with fixed meaning for the receiver. Every other component id
//! is treated as replicated object data.

use crate::ComponentId;

pub const ENTITY_ACL_COMPONENT_ID: ComponentId = ComponentId::new(50);
pub const POSITION_COMPONENT_ID: ComponentId = ComponentId::new(54);
pub const WORKER_COMPONENT_ID: ComponentId = ComponentId::new(60);

pub const VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID: ComponentId = ComponentId::new(9979);
pub const TEAR_OFF_COMPONENT_ID: ComponentId = ComponentId::new(9982);
pub const PACKED_RPCS_COMPONENT_ID: ComponentId = ComponentId::new(9985);
pub const RPCS_ON_ENTITY_CREATION_COMPONENT_ID: ComponentId = ComponentId::new(9986);
pub const MULTICAST_RPCS_COMPONENT_ID: ComponentId = ComponentId::new(9987);
pub const SERVER_RPC_ENDPOINT_COMPONENT_ID: ComponentId = ComponentId::new(9989);
pub const CLIENT_RPC_ENDPOINT_COMPONENT_ID: ComponentId = ComponentId::new(9990);
pub const HEARTBEAT_COMPONENT_ID: ComponentId = ComponentId::new(9991);
pub const CLASS_METADATA_COMPONENT_ID: ComponentId = ComponentId::new(9996);
pub const SPAWN_DATA_COMPONENT_ID: ComponentId = ComponentId::new(9999);

/// Field of an RPC endpoint's events (and of an RPC command request) holding
/// the payload objects.
pub const RPC_PAYLOAD_FIELD_ID: u32 = 1;
