use std::fmt;

use crate::EntityId;

/// Reference to a single replicated object: the entity's root object at
/// offset 0, or one of its sub-objects at a non-zero offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub entity: EntityId,
    pub offset: u32,
}

impl ObjectRef {
    pub const NULL: ObjectRef = ObjectRef {
        entity: EntityId::new(0),
        offset: 0,
    };

    pub fn new(entity: EntityId, offset: u32) -> Self {
        Self { entity, offset }
    }

    pub fn root(entity: EntityId) -> Self {
        Self { entity, offset: 0 }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "(null)");
        }
        write!(f, "(entity: {}, offset: {})", self.entity, self.offset)
    }
}
