use crate::{ObjectRef, SchemaError, SchemaObject};

const CLASS_PATH_FIELD_ID: u32 = 1;
const OWNER_WORKER_FIELD_ID: u32 = 2;
const OUTER_FIELD_ID: u32 = 3;

/// Class information needed to instantiate an entity's root object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassMetadata {
    pub class_path: String,
    /// Worker attribute of the client that owns this object, if any
    pub owner_worker: Option<String>,
    /// Stably-named outer object, for objects that are not spawned dynamically
    pub outer: Option<ObjectRef>,
}

impl ClassMetadata {
    pub fn new(class_path: &str) -> Self {
        Self {
            class_path: class_path.to_string(),
            owner_worker: None,
            outer: None,
        }
    }

    pub fn from_schema(object: &SchemaObject) -> Result<Self, SchemaError> {
        let class_path = object.get_string(CLASS_PATH_FIELD_ID)?.to_string();
        let owner_worker = if object.has_field(OWNER_WORKER_FIELD_ID) {
            Some(object.get_string(OWNER_WORKER_FIELD_ID)?.to_string())
        } else {
            None
        };
        let outer = if object.has_field(OUTER_FIELD_ID) {
            Some(object.get_object_ref(OUTER_FIELD_ID)?)
        } else {
            None
        };
        Ok(Self {
            class_path,
            owner_worker,
            outer,
        })
    }

    pub fn to_schema(&self) -> SchemaObject {
        let mut object = SchemaObject::new();
        object.add_string(CLASS_PATH_FIELD_ID, &self.class_path);
        if let Some(owner_worker) = &self.owner_worker {
            object.add_string(OWNER_WORKER_FIELD_ID, owner_worker);
        }
        if let Some(outer) = &self.outer {
            object.add_object_ref(OUTER_FIELD_ID, *outer);
        }
        object
    }
}
