use crate::{SchemaError, SchemaObject};

const WORKER_ID_FIELD_ID: u32 = 1;
const WORKER_TYPE_FIELD_ID: u32 = 2;

/// Component carried by every worker's own entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerComponent {
    pub worker_id: String,
    pub worker_type: String,
}

impl WorkerComponent {
    pub fn new(worker_id: &str, worker_type: &str) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            worker_type: worker_type.to_string(),
        }
    }

    pub fn from_schema(object: &SchemaObject) -> Result<Self, SchemaError> {
        Ok(Self {
            worker_id: object.get_string(WORKER_ID_FIELD_ID)?.to_string(),
            worker_type: object.get_string(WORKER_TYPE_FIELD_ID)?.to_string(),
        })
    }

    pub fn to_schema(&self) -> SchemaObject {
        let mut object = SchemaObject::new();
        object.add_string(WORKER_ID_FIELD_ID, &self.worker_id);
        object.add_string(WORKER_TYPE_FIELD_ID, &self.worker_type);
        object
    }
}

const CLIENT_HAS_QUIT_FIELD_ID: u32 = 1;

/// Heartbeat sent periodically by a connected client's player entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Heartbeat {
    pub client_has_quit: bool,
}

impl Heartbeat {
    /// Reads a heartbeat update; an update without the quit flag is a plain
    /// keep-alive.
    pub fn from_schema(object: &SchemaObject) -> Result<Self, SchemaError> {
        let client_has_quit = if object.has_field(CLIENT_HAS_QUIT_FIELD_ID) {
            object.get_bool(CLIENT_HAS_QUIT_FIELD_ID)?
        } else {
            false
        };
        Ok(Self { client_has_quit })
    }

    pub fn to_schema(&self) -> SchemaObject {
        let mut object = SchemaObject::new();
        if self.client_has_quit {
            object.add_bool(CLIENT_HAS_QUIT_FIELD_ID, true);
        }
        object
    }
}
