use crate::{SchemaError, SchemaObject, SchemaValue};

const LOCATION_FIELD_ID: u32 = 1;
const ROTATION_FIELD_ID: u32 = 2;
const SCALE_FIELD_ID: u32 = 3;
const VELOCITY_FIELD_ID: u32 = 4;

/// Initial transform of an entity's root object. Absent vectors fall back to
/// the identity transform.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnData {
    pub location: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub velocity: [f32; 3],
}

impl Default for SpawnData {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            velocity: [0.0; 3],
        }
    }
}

impl SpawnData {
    pub fn from_schema(object: &SchemaObject) -> Result<Self, SchemaError> {
        let defaults = Self::default();
        Ok(Self {
            location: read_vector(object, LOCATION_FIELD_ID, defaults.location)?,
            rotation: read_vector(object, ROTATION_FIELD_ID, defaults.rotation)?,
            scale: read_vector(object, SCALE_FIELD_ID, defaults.scale)?,
            velocity: read_vector(object, VELOCITY_FIELD_ID, defaults.velocity)?,
        })
    }

    pub fn to_schema(&self) -> SchemaObject {
        let mut object = SchemaObject::new();
        write_vector(&mut object, LOCATION_FIELD_ID, &self.location);
        write_vector(&mut object, ROTATION_FIELD_ID, &self.rotation);
        write_vector(&mut object, SCALE_FIELD_ID, &self.scale);
        write_vector(&mut object, VELOCITY_FIELD_ID, &self.velocity);
        object
    }
}

fn read_vector(
    object: &SchemaObject,
    field: u32,
    default: [f32; 3],
) -> Result<[f32; 3], SchemaError> {
    if !object.has_field(field) {
        return Ok(default);
    }
    let mut output = [0.0; 3];
    for (index, slot) in output.iter_mut().enumerate() {
        match object.index(field, index)? {
            SchemaValue::Float(value) => *slot = *value,
            other => {
                return Err(SchemaError::TypeMismatch {
                    field,
                    expected: "float",
                    actual: other.type_name(),
                })
            }
        }
    }
    Ok(output)
}

fn write_vector(object: &mut SchemaObject, field: u32, vector: &[f32; 3]) {
    for value in vector {
        object.add_f32(field, *value);
    }
}
