use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::*;

use crate::error::{Error, ErrorKind, Result};
use super::thrift::parse_thrift;
use super::types::{EnumDef, StructDef};

/// Descriptors produced by one schema source.
#[derive(Debug, Default)]
pub struct SchemaSet {
    pub structs: Vec<StructDef>,
    pub enums: Vec<EnumDef>,
}

/// Parses one schema dialect.
pub type FormatParser = fn(&str) -> Result<SchemaSet>;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Struct and enum descriptors looked up by name.
///
/// Loading takes `&mut self`; once populated, wrap the registry in an `Arc` and
/// hand it to schema-bound documents, which only read from it. Each registry
/// carries an identity tag so trees built from different registries are never
/// mixed by copy or move.
#[derive(Debug)]
pub struct SchemaRegistry {
    id: u64,
    formats: HashMap<String, FormatParser>,
    structs: IndexMap<String, Arc<StructDef>>,
    enums: IndexMap<String, Arc<EnumDef>>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        let mut registry = SchemaRegistry {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            formats: HashMap::new(),
            structs: IndexMap::new(),
            enums: IndexMap::new(),
        };
        registry.register_format("thrift", parse_thrift);
        registry
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn register_format(&mut self, name: impl Into<String>, parser: FormatParser) {
        self.formats.insert(name.into(), parser);
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    /// Parses `text` with the named dialect and adds its descriptors. Returns the
    /// number of structs and enums added. Redefining a name replaces it.
    pub fn load(&mut self, format: &str, text: &str) -> Result<usize> {
        let parser = self.formats.get(format).ok_or_else(|| {
            Error::new(ErrorKind::SchemaLookup, "registry", format!("unknown schema format `{format}`"))
        })?;
        let set = parser(text)?;
        Ok(self.add_set(set))
    }

    pub fn load_file(&mut self, format: &str, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io, "registry", format!("failed to read `{}`: {err}", path.display()))
        })?;
        self.load(format, &text)
    }

    pub fn add_set(&mut self, set: SchemaSet) -> usize {
        let added = set.structs.len() + set.enums.len();
        for def in set.structs {
            debug!(name = %def.name, fields = def.len(), "registering struct");
            self.structs.insert(def.name.clone(), Arc::new(def));
        }
        for def in set.enums {
            debug!(name = %def.name, "registering enum");
            self.enums.insert(def.name.clone(), Arc::new(def));
        }
        added
    }

    pub fn get_struct(&self, name: &str) -> Option<&Arc<StructDef>> {
        self.structs.get(name)
    }

    pub fn get_enum(&self, name: &str) -> Option<&Arc<EnumDef>> {
        self.enums.get(name)
    }

    pub fn require_struct(&self, name: &str) -> Result<Arc<StructDef>> {
        self.get_struct(name).cloned().ok_or_else(|| {
            Error::new(ErrorKind::SchemaLookup, "registry", format!("unknown struct `{name}`"))
        })
    }

    pub fn require_enum(&self, name: &str) -> Result<Arc<EnumDef>> {
        self.get_enum(name).cloned().ok_or_else(|| {
            Error::new(ErrorKind::SchemaLookup, "registry", format!("unknown enum `{name}`"))
        })
    }

    pub fn struct_names(&self) -> impl Iterator<Item = &str> {
        self.structs.keys().map(String::as_str)
    }

    pub fn enum_names(&self) -> impl Iterator<Item = &str> {
        self.enums.keys().map(String::as_str)
    }
}
