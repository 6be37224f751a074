//! Schema registry: struct/field/enum descriptors consulted by schema-bound nodes.
pub mod registry;
pub mod thrift;
pub mod types;

pub use registry::{FormatParser, SchemaRegistry, SchemaSet};
pub use types::{EnumDef, FieldDef, FieldType, Requiredness, StructDef};
