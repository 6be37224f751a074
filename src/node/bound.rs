//! Schema-bound node behavior: typed zero values, defaults, declared-field
//! lookup, schema-ordered insertion and checked scalar assignment.
use std::sync::Arc;

use chrono::{Datelike, Local, Timelike};
use indexmap::IndexMap;
use indextree::NodeId;
use tracing::*;

use crate::error::{Error, ErrorKind, Result};
use crate::parser::{self, ParseOptions};
use crate::schema::{FieldDef, FieldType, SchemaRegistry, StructDef};
use crate::types::{JsonType, Scalar};

use super::{Binding, Content, Document, SchemaSlot};

const COMPONENT: &str = "schema-node";

/// Structs of this name fill their calendar fields with the current local time.
pub const TIMESTAMP_CLASS: &str = "TimeStamp";

/// Bound on nested struct materialization (recursive schemas).
const MAX_SCHEMA_DEPTH: usize = 256;

/// Whether a value of JSON type `incoming` may be stored in a node of type
/// `target`. Null is always accepted and numbers convert into each other.
pub fn test_assign(target: JsonType, incoming: JsonType) -> bool {
    target == incoming || incoming == JsonType::Null || (target.is_number() && incoming.is_number())
}

impl Document {
    pub(crate) fn schema_slot(&self, id: NodeId) -> Option<&SchemaSlot> {
        self.node(id).schema()
    }

    fn slot(&self, id: NodeId) -> Result<SchemaSlot> {
        self.schema_slot(id)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::SchemaLookup, COMPONENT, "node is not schema-bound"))
    }

    fn registry_ref(&self) -> Result<&Arc<SchemaRegistry>> {
        self.registry
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::SchemaLookup, COMPONENT, "document has no schema registry"))
    }

    fn resolve_struct(&self, field: &FieldDef, level: usize) -> Result<Option<Arc<StructDef>>> {
        match field.type_at(level) {
            Some(FieldType::Struct) => Ok(Some(self.registry_ref()?.require_struct(&field.class_name)?)),
            _ => Ok(None),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CHILDREN
// ————————————————————————————————————————————————————————————————————————————

impl Document {

    pub(super) fn schema_append(&mut self, parent: NodeId, key: &str) -> Result<NodeId> {
        let slot = self.slot(parent)?;
        let (child_slot, position) = match slot.field_type() {
            FieldType::Struct => {
                let structure = slot.structure.clone().ok_or_else(|| {
                    Error::new(ErrorKind::SchemaLookup, COMPONENT, "struct node without a descriptor")
                })?;
                let field = structure.field_by_name(key).cloned().ok_or_else(|| {
                    Error::missing(COMPONENT, format!("struct `{}` has no field `{key}`", structure.name))
                })?;
                self.ensure_container(parent, JsonType::Object);
                let position = self.schema_position(parent, &structure, &field.name);
                let nested = self.resolve_struct(&field, 0)?;
                (SchemaSlot { field: Some(field), level: 0, structure: nested }, Some(position))
            }
            ty @ (FieldType::Map | FieldType::List | FieldType::Set) => {
                let field = slot.field.clone().ok_or_else(|| {
                    Error::new(ErrorKind::SchemaLookup, COMPONENT, "container node without a field")
                })?;
                let level = field.child_level(slot.level).ok_or_else(|| {
                    Error::new(
                        ErrorKind::SchemaSource,
                        COMPONENT,
                        format!("field `{}` has no element type below level {}", field.name, slot.level),
                    )
                })?;
                if ty == FieldType::Map {
                    self.ensure_container(parent, JsonType::Object);
                } else {
                    self.ensure_container(parent, JsonType::Array);
                    let len = self.node(parent).len();
                    if key != len.to_string() {
                        return Err(Error::missing(
                            COMPONENT,
                            format!("index {key} is past the end of `{}` (size {len})", field.name),
                        ));
                    }
                }
                let nested = self.resolve_struct(&field, level)?;
                (SchemaSlot { field: Some(field), level, structure: nested }, None)
            }
            other => {
                return Err(Error::type_mismatch(
                    COMPONENT,
                    format!("`{}` is a {other} field and cannot hold `{key}`", slot.field_name()),
                ));
            }
        };

        trace!(parent = %self.get_path(parent), key, "adding schema node");
        let child = self.alloc(key.to_string(), Content::Scalar(Scalar::Null), Binding::Schema(child_slot));
        self.attach(parent, child, position)?;
        if let Err(err) = self.schema_reset(child).and_then(|_| self.apply_default(child)) {
            self.remove(child)?;
            return Err(err);
        }
        Ok(child)
    }

    /// A struct assigned `null` becomes a container again when a child is added.
    fn ensure_container(&mut self, id: NodeId, ty: JsonType) {
        if self.node(id).json_type() == JsonType::Null {
            self.set_content(id, Content::empty(ty));
        }
    }

    /// Insertion point keeping struct members in declaration order.
    fn schema_position(&self, parent: NodeId, structure: &StructDef, name: &str) -> usize {
        let target = structure.field_index(name).unwrap_or(usize::MAX);
        match &self.node(parent).content {
            Content::Object(map) => map
                .keys()
                .position(|key| structure.field_index(key).is_none_or(|index| index > target))
                .unwrap_or(map.len()),
            _ => 0,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RESET & DEFAULTS
// ————————————————————————————————————————————————————————————————————————————

impl Document {

    /// Zero value for the node's type. Structs get their required and
    /// defaulted fields.
    pub(super) fn schema_reset(&mut self, id: NodeId) -> Result<()> {
        let slot = self.slot(id)?;
        let ty = slot.field_type();
        match ty.json_type() {
            JsonType::Object => {
                self.set_content(id, Content::Object(IndexMap::new()));
                if ty != FieldType::Struct {
                    return Ok(());
                }
                if self.depth(id) > MAX_SCHEMA_DEPTH {
                    return Err(Error::new(
                        ErrorKind::SchemaSource,
                        COMPONENT,
                        format!("struct nesting deeper than {MAX_SCHEMA_DEPTH} levels at `{}`", self.get_path(id)),
                    ));
                }
                let structure = slot.structure.clone().ok_or_else(|| {
                    Error::new(ErrorKind::SchemaLookup, COMPONENT, "struct node without a descriptor")
                })?;
                for field in structure.fields().filter(|field| field.is_prepopulated()) {
                    self.schema_append(id, &field.name)?;
                }
                if structure.name == TIMESTAMP_CLASS {
                    self.stamp_time(id)?;
                }
            }
            JsonType::Array => self.set_content(id, Content::Array(Vec::new())),
            _ => {
                let zero = self.zero_scalar(&slot, ty);
                self.set_content(id, Content::Scalar(zero));
            }
        }
        Ok(())
    }

    fn zero_scalar(&self, slot: &SchemaSlot, ty: FieldType) -> Scalar {
        match ty {
            FieldType::Bool => Scalar::Bool(false),
            FieldType::Double | FieldType::Float => Scalar::Double(0.0),
            FieldType::String | FieldType::Binary => Scalar::String(String::new()),
            FieldType::Enum => {
                let first = slot
                    .field
                    .as_ref()
                    .and_then(|field| self.registry.as_ref()?.get_enum(&field.class_name))
                    .and_then(|en| en.names().next().and_then(|name| en.value_of(name)));
                Scalar::Int(first.unwrap_or(0))
            }
            ty if ty.is_integer() => Scalar::Int(0),
            _ => Scalar::Null,
        }
    }

    fn stamp_time(&mut self, id: NodeId) -> Result<()> {
        let now = Local::now();
        let parts = [
            ("year", now.year() as i64),
            ("month", now.month() as i64),
            ("day", now.day() as i64),
            ("hour", now.hour() as i64),
            ("minute", now.minute() as i64),
            ("second", now.second() as i64),
        ];
        for (name, value) in parts {
            let declared = self
                .schema_slot(id)
                .and_then(|slot| slot.structure.as_ref())
                .is_some_and(|structure| structure.field_by_name(name).is_some());
            if declared {
                let child = self.append_node(id, name)?;
                self.set_content(child, Content::Scalar(Scalar::Int(value)));
            }
        }
        Ok(())
    }

    /// Loads the field's default literal, for nodes at the top of their field.
    pub(super) fn apply_default(&mut self, id: NodeId) -> Result<()> {
        let Some(slot) = self.schema_slot(id) else {
            return Ok(());
        };
        if slot.level != 0 {
            return Ok(());
        }
        let Some(field) = slot.field.clone() else {
            return Ok(());
        };
        let Some(literal) = field.default.as_deref() else {
            return Ok(());
        };
        parser::load_into(self, id, literal, &ParseOptions::default()).map_err(|err| {
            Error::new(
                ErrorKind::SchemaSource,
                COMPONENT,
                format!("bad default `{literal}` for field `{}`: {}", field.name, err.message),
            )
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ASSIGNMENT
// ————————————————————————————————————————————————————————————————————————————

impl Document {

    pub(super) fn schema_assign(&mut self, id: NodeId, scalar: Scalar) -> Result<()> {
        let slot = self.slot(id)?;
        let ty = slot.field_type();
        let value = match scalar {
            Scalar::Null => Scalar::Null,
            Scalar::String(name) if ty == FieldType::Enum => {
                let class = slot.field.as_ref().map(|field| field.class_name.as_str()).unwrap_or_default();
                let en = self.registry_ref()?.require_enum(class)?;
                let value = en.value_of(&name).ok_or_else(|| {
                    Error::new(
                        ErrorKind::SchemaLookup,
                        COMPONENT,
                        format!("`{name}` is not a member of enum `{}`", en.name),
                    )
                })?;
                Scalar::Int(value)
            }
            other => {
                let incoming = other.json_type();
                if !test_assign(ty.json_type(), incoming) {
                    debug!(path = %self.get_path(id), %incoming, expected = %ty, "schema rejected value");
                    return Err(Error::type_mismatch(
                        COMPONENT,
                        format!(
                            "cannot assign a {incoming} to `{}` of type {}",
                            self.get_path(id),
                            slot.field.as_ref().map_or_else(|| ty.to_string(), |field| field.type_name()),
                        ),
                    ));
                }
                coerce(other, ty)?
            }
        };
        self.check_limits(id, &slot, ty, &value)?;
        self.set_content(id, Content::Scalar(value));
        Ok(())
    }

    fn check_limits(&self, id: NodeId, slot: &SchemaSlot, ty: FieldType, value: &Scalar) -> Result<()> {
        let number = match value {
            Scalar::Int(i) => *i as f64,
            Scalar::Double(d) => *d,
            _ => return Ok(()),
        };
        let within_field = slot.field.as_ref().is_none_or(|field| field.within_limits(number));
        let within_type = match (ty.integer_bounds(), value) {
            (Some((min, max)), Scalar::Int(i)) => (min..=max).contains(i),
            _ => true,
        };
        if within_field && within_type {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::OutOfRange,
                COMPONENT,
                format!("{} is out of range for `{}`", value.canonical(), self.get_path(id)),
            ))
        }
    }

    pub(super) fn schema_make_container(&mut self, id: NodeId, ty: JsonType) -> Result<()> {
        let slot = self.slot(id)?;
        let declared = slot.field_type();
        if declared.json_type() != ty {
            return Err(Error::type_mismatch(
                COMPONENT,
                format!("`{}` is a {declared} field and cannot hold an {ty}", slot.field_name()),
            ));
        }
        self.schema_reset(id)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTROSPECTION
// ————————————————————————————————————————————————————————————————————————————

impl Document {

    pub(crate) fn fields_used(&self, id: NodeId) -> Vec<String> {
        match (self.schema_slot(id), &self.node(id).content) {
            (Some(slot), Content::Object(map)) if slot.field_type() == FieldType::Struct => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn fields_not_used(&self, id: NodeId) -> Vec<String> {
        let Some(structure) = self.schema_slot(id).and_then(|slot| slot.structure.as_ref()) else {
            return Vec::new();
        };
        structure
            .fields()
            .filter(|field| self.find_child(id, &field.name).is_none())
            .map(|field| field.name.clone())
            .collect()
    }
}

/// Numeric conversion between the incoming value and the declared type.
/// 2^63, the first double past `i64::MAX`.
const I64_EDGE: f64 = 9_223_372_036_854_775_808.0;

fn coerce(value: Scalar, ty: FieldType) -> Result<Scalar> {
    Ok(match (value, ty) {
        (Scalar::Double(d), ty) if ty.is_integer() => {
            if !(-I64_EDGE..I64_EDGE).contains(&d) {
                return Err(Error::new(
                    ErrorKind::OutOfRange,
                    COMPONENT,
                    format!("{d} cannot be stored in a {ty} field"),
                ));
            }
            Scalar::Int(d.trunc() as i64)
        }
        (Scalar::Int(i), FieldType::Double) => Scalar::Double(i as f64),
        (Scalar::Int(i), FieldType::Float) => Scalar::Double(i as f32 as f64),
        (Scalar::Double(d), FieldType::Float) => Scalar::Double(d as f32 as f64),
        (value, _) => value,
    })
}
