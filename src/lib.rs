//! JSON documents as mutable node trees, either free-form or bound to a
//! Thrift-style schema.
//!
//! ```
//! use json_node::Document;
//!
//! let mut doc = Document::parse(r#"{"a": {"b": [1, 2]}}"#)?;
//! assert_eq!(doc.field("a/b/1").and_then(|n| n.value::<i64>()), Some(2));
//! doc.root_mut().set_value_via_path("a.c", "text")?;
//! assert_eq!(doc.dump(true), r#"{"a":{"b":[1,2],"c":"text"}}"#);
//! # Ok::<(), json_node::Error>(())
//! ```
pub mod builder;
pub mod convert;
pub mod dump;
pub mod error;
pub mod node;
pub mod parser;
pub mod path;
pub mod scalar;
pub mod schema;
pub mod types;

pub use builder::{ArrayBuilder, ObjectBuilder};
pub use convert::{FromNode, IntoNode};
pub use dump::DumpOptions;
pub use error::{Error, ErrorKind, Result};
pub use indextree::NodeId;
pub use node::{Document, NodeMut, NodeRef, test_assign};
pub use parser::ParseOptions;
pub use schema::{EnumDef, FieldDef, FieldType, SchemaRegistry, StructDef};
pub use types::{JsonType, Scalar};
