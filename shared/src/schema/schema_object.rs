use std::collections::BTreeMap;

use crate::{schema::error::SchemaError, EntityId, FieldId, ObjectRef};

#[derive(Clone, Debug, PartialEq)]
pub enum SchemaValue {
    Bool(bool),
    Uint32(u32),
    Int64(i64),
    Float(f32),
    String(String),
    Bytes(Vec<u8>),
    EntityId(EntityId),
    ObjectRef(ObjectRef),
    Object(SchemaObject),
}

impl SchemaValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaValue::Bool(_) => "bool",
            SchemaValue::Uint32(_) => "uint32",
            SchemaValue::Int64(_) => "int64",
            SchemaValue::Float(_) => "float",
            SchemaValue::String(_) => "string",
            SchemaValue::Bytes(_) => "bytes",
            SchemaValue::EntityId(_) => "entity_id",
            SchemaValue::ObjectRef(_) => "object_ref",
            SchemaValue::Object(_) => "object",
        }
    }

    /// Appends every non-null object reference held by this value, descending
    /// into nested objects.
    pub fn collect_object_refs(&self, output: &mut Vec<ObjectRef>) {
        match self {
            SchemaValue::ObjectRef(object_ref) => {
                if !object_ref.is_null() {
                    output.push(*object_ref);
                }
            }
            SchemaValue::Object(object) => object.collect_object_refs(output),
            _ => {}
        }
    }
}

/// Field-indexed structured value. Every field holds an ordered list of
/// values; single-valued fields simply hold a list of one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaObject {
    fields: BTreeMap<FieldId, Vec<SchemaValue>>,
}

impl SchemaObject {
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields.keys().copied()
    }

    pub fn has_field(&self, field: FieldId) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn count(&self, field: FieldId) -> usize {
        self.fields.get(&field).map(|values| values.len()).unwrap_or(0)
    }

    pub fn values(&self, field: FieldId) -> &[SchemaValue] {
        self.fields
            .get(&field)
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, field: FieldId) -> Option<&SchemaValue> {
        self.fields.get(&field).and_then(|values| values.first())
    }

    pub fn index(&self, field: FieldId, index: usize) -> Result<&SchemaValue, SchemaError> {
        let values = self
            .fields
            .get(&field)
            .ok_or(SchemaError::FieldMissing { field })?;
        values.get(index).ok_or(SchemaError::IndexOutOfRange {
            field,
            index,
            count: values.len(),
        })
    }

    /// Appends `value` to the field's list
    pub fn add(&mut self, field: FieldId, value: SchemaValue) -> &mut Self {
        self.fields.entry(field).or_default().push(value);
        self
    }

    /// Replaces the field's whole list with `values`
    pub fn set_values(&mut self, field: FieldId, values: Vec<SchemaValue>) -> &mut Self {
        if values.is_empty() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, values);
        }
        self
    }

    pub fn remove_field(&mut self, field: FieldId) -> Option<Vec<SchemaValue>> {
        self.fields.remove(&field)
    }

    /// Copies every field of `other` over this object, replacing whole lists.
    pub fn merge(&mut self, other: &SchemaObject) {
        for (field, values) in other.fields.iter() {
            self.fields.insert(*field, values.clone());
        }
    }

    /// Returns a copy holding only `field`
    pub fn extract_field(&self, field: FieldId) -> SchemaObject {
        let mut output = SchemaObject::new();
        if let Some(values) = self.fields.get(&field) {
            output.fields.insert(field, values.clone());
        }
        output
    }

    pub fn collect_object_refs(&self, output: &mut Vec<ObjectRef>) {
        for values in self.fields.values() {
            for value in values {
                value.collect_object_refs(output);
            }
        }
    }

    pub fn field_object_refs(&self, field: FieldId) -> Vec<ObjectRef> {
        let mut output = Vec::new();
        for value in self.values(field) {
            value.collect_object_refs(&mut output);
        }
        output
    }

    // Typed writers

    pub fn add_bool(&mut self, field: FieldId, value: bool) -> &mut Self {
        self.add(field, SchemaValue::Bool(value))
    }

    pub fn add_u32(&mut self, field: FieldId, value: u32) -> &mut Self {
        self.add(field, SchemaValue::Uint32(value))
    }

    pub fn add_i64(&mut self, field: FieldId, value: i64) -> &mut Self {
        self.add(field, SchemaValue::Int64(value))
    }

    pub fn add_f32(&mut self, field: FieldId, value: f32) -> &mut Self {
        self.add(field, SchemaValue::Float(value))
    }

    pub fn add_string(&mut self, field: FieldId, value: &str) -> &mut Self {
        self.add(field, SchemaValue::String(value.to_string()))
    }

    pub fn add_bytes(&mut self, field: FieldId, value: Vec<u8>) -> &mut Self {
        self.add(field, SchemaValue::Bytes(value))
    }

    pub fn add_entity_id(&mut self, field: FieldId, value: EntityId) -> &mut Self {
        self.add(field, SchemaValue::EntityId(value))
    }

    pub fn add_object_ref(&mut self, field: FieldId, value: ObjectRef) -> &mut Self {
        self.add(field, SchemaValue::ObjectRef(value))
    }

    pub fn add_object(&mut self, field: FieldId, value: SchemaObject) -> &mut Self {
        self.add(field, SchemaValue::Object(value))
    }

    // Typed readers

    fn first(&self, field: FieldId) -> Result<&SchemaValue, SchemaError> {
        self.get(field).ok_or(SchemaError::FieldMissing { field })
    }

    pub fn get_bool(&self, field: FieldId) -> Result<bool, SchemaError> {
        match self.first(field)? {
            SchemaValue::Bool(value) => Ok(*value),
            other => Err(mismatch(field, "bool", other)),
        }
    }

    pub fn get_u32(&self, field: FieldId) -> Result<u32, SchemaError> {
        match self.first(field)? {
            SchemaValue::Uint32(value) => Ok(*value),
            other => Err(mismatch(field, "uint32", other)),
        }
    }

    pub fn get_i64(&self, field: FieldId) -> Result<i64, SchemaError> {
        match self.first(field)? {
            SchemaValue::Int64(value) => Ok(*value),
            other => Err(mismatch(field, "int64", other)),
        }
    }

    pub fn get_f32(&self, field: FieldId) -> Result<f32, SchemaError> {
        match self.first(field)? {
            SchemaValue::Float(value) => Ok(*value),
            other => Err(mismatch(field, "float", other)),
        }
    }

    pub fn get_string(&self, field: FieldId) -> Result<&str, SchemaError> {
        match self.first(field)? {
            SchemaValue::String(value) => Ok(value.as_str()),
            other => Err(mismatch(field, "string", other)),
        }
    }

    pub fn get_bytes(&self, field: FieldId) -> Result<&[u8], SchemaError> {
        match self.first(field)? {
            SchemaValue::Bytes(value) => Ok(value.as_slice()),
            other => Err(mismatch(field, "bytes", other)),
        }
    }

    pub fn get_entity_id(&self, field: FieldId) -> Result<EntityId, SchemaError> {
        match self.first(field)? {
            SchemaValue::EntityId(value) => Ok(*value),
            other => Err(mismatch(field, "entity_id", other)),
        }
    }

    pub fn get_object_ref(&self, field: FieldId) -> Result<ObjectRef, SchemaError> {
        match self.first(field)? {
            SchemaValue::ObjectRef(value) => Ok(*value),
            other => Err(mismatch(field, "object_ref", other)),
        }
    }

    pub fn get_object(&self, field: FieldId) -> Result<&SchemaObject, SchemaError> {
        match self.first(field)? {
            SchemaValue::Object(value) => Ok(value),
            other => Err(mismatch(field, "object", other)),
        }
    }

    pub fn index_object(&self, field: FieldId, index: usize) -> Result<&SchemaObject, SchemaError> {
        match self.index(field, index)? {
            SchemaValue::Object(value) => Ok(value),
            other => Err(mismatch(field, "object", other)),
        }
    }

    pub fn index_string(&self, field: FieldId, index: usize) -> Result<&str, SchemaError> {
        match self.index(field, index)? {
            SchemaValue::String(value) => Ok(value.as_str()),
            other => Err(mismatch(field, "string", other)),
        }
    }
}

fn mismatch(field: FieldId, expected: &'static str, actual: &SchemaValue) -> SchemaError {
    SchemaError::TypeMismatch {
        field,
        expected,
        actual: actual.type_name(),
    }
}
