use crate::{EntityId, ObjectRef, SchemaError, SchemaObject, SchemaValue, RPC_PAYLOAD_FIELD_ID};

const OFFSET_FIELD_ID: u32 = 1;
const INDEX_FIELD_ID: u32 = 2;
const PAYLOAD_FIELD_ID: u32 = 3;
const REFS_FIELD_ID: u32 = 4;

const PACKED_TARGET_FIELD_ID: u32 = 1;
const PACKED_PAYLOAD_FIELD_ID: u32 = 2;

/// A single remote procedure call: which sub-object of the target entity,
/// which function, and the encoded arguments. `refs` lists every object
/// reference the arguments carry so they can be resolved before dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcPayload {
    pub offset: u32,
    pub index: u32,
    pub payload: Vec<u8>,
    pub refs: Vec<ObjectRef>,
}

impl RpcPayload {
    pub fn new(offset: u32, index: u32, payload: Vec<u8>) -> Self {
        Self {
            offset,
            index,
            payload,
            refs: Vec::new(),
        }
    }

    pub fn with_refs(mut self, refs: Vec<ObjectRef>) -> Self {
        self.refs = refs;
        self
    }

    pub fn target(&self, entity_id: EntityId) -> ObjectRef {
        ObjectRef::new(entity_id, self.offset)
    }

    pub fn from_schema(object: &SchemaObject) -> Result<Self, SchemaError> {
        let offset = object.get_u32(OFFSET_FIELD_ID)?;
        let index = object.get_u32(INDEX_FIELD_ID)?;
        let payload = if object.has_field(PAYLOAD_FIELD_ID) {
            object.get_bytes(PAYLOAD_FIELD_ID)?.to_vec()
        } else {
            Vec::new()
        };
        let mut refs = Vec::new();
        for value in object.values(REFS_FIELD_ID) {
            match value {
                SchemaValue::ObjectRef(object_ref) => refs.push(*object_ref),
                other => {
                    return Err(SchemaError::TypeMismatch {
                        field: REFS_FIELD_ID,
                        expected: "object_ref",
                        actual: other.type_name(),
                    })
                }
            }
        }
        Ok(Self {
            offset,
            index,
            payload,
            refs,
        })
    }

    pub fn to_schema(&self) -> SchemaObject {
        let mut object = SchemaObject::new();
        object.add_u32(OFFSET_FIELD_ID, self.offset);
        object.add_u32(INDEX_FIELD_ID, self.index);
        object.add_bytes(PAYLOAD_FIELD_ID, self.payload.clone());
        for object_ref in &self.refs {
            object.add_object_ref(REFS_FIELD_ID, *object_ref);
        }
        object
    }
}

/// An RPC carried on the packed RPC component, addressed to an arbitrary
/// entity rather than the entity whose component carries it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedRpc {
    pub target_entity: EntityId,
    pub payload: RpcPayload,
}

impl PackedRpc {
    pub fn from_schema(object: &SchemaObject) -> Result<Self, SchemaError> {
        Ok(Self {
            target_entity: object.get_entity_id(PACKED_TARGET_FIELD_ID)?,
            payload: RpcPayload::from_schema(object.get_object(PACKED_PAYLOAD_FIELD_ID)?)?,
        })
    }

    pub fn to_schema(&self) -> SchemaObject {
        let mut object = SchemaObject::new();
        object.add_entity_id(PACKED_TARGET_FIELD_ID, self.target_entity);
        object.add_object(PACKED_PAYLOAD_FIELD_ID, self.payload.to_schema());
        object
    }
}

/// RPCs the creator of an entity sent along with its initial state. They
/// are applied once, right after the entity's object is constructed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RpcsOnEntityCreation {
    pub rpcs: Vec<RpcPayload>,
}

impl RpcsOnEntityCreation {
    pub fn from_schema(object: &SchemaObject) -> Result<Self, SchemaError> {
        let mut rpcs = Vec::new();
        for index in 0..object.count(RPC_PAYLOAD_FIELD_ID) {
            rpcs.push(RpcPayload::from_schema(
                object.index_object(RPC_PAYLOAD_FIELD_ID, index)?,
            )?);
        }
        Ok(Self { rpcs })
    }

    pub fn to_schema(&self) -> SchemaObject {
        let mut object = SchemaObject::new();
        for rpc in &self.rpcs {
            object.add_object(RPC_PAYLOAD_FIELD_ID, rpc.to_schema());
        }
        object
    }
}
