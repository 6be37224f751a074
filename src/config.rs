use std::path::{Path, PathBuf};

use anyhow::Context;
use confique::Config as DeriveConfig;
use json_node::{DumpOptions, ParseOptions};

/// File read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "json-node.toml";

#[derive(Debug, DeriveConfig)]
pub struct Config {
    /// Spaces per nesting level in pretty output.
    #[config(default = 4, env = "JSON_NODE_INDENT")]
    pub indent: usize,

    /// Significant digits for doubles. Unset prints the shortest form that
    /// reads back to the same value.
    #[config(env = "JSON_NODE_DOUBLE_PRECISION")]
    pub double_precision: Option<usize>,

    /// Significant digits for schema fields declared `float`.
    #[config(default = 7, env = "JSON_NODE_FLOAT_PRECISION")]
    pub float_precision: usize,

    /// Maximum nesting of objects and arrays accepted by the reader.
    #[config(default = 256, env = "JSON_NODE_MAX_DEPTH")]
    pub max_depth: usize,
}

impl Config {
    /// Environment variables first, then the file, then built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if !path.exists() && path != Path::new(DEFAULT_CONFIG_FILE) {
            anyhow::bail!("config file `{}` does not exist", path.display());
        }
        Config::builder()
            .env()
            .file(&path)
            .load()
            .with_context(|| format!("failed to load configuration from `{}`", path.display()))
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions { max_depth: self.max_depth }
    }

    pub fn dump_options(&self, dense: bool) -> DumpOptions {
        let base = if dense { DumpOptions::dense() } else { DumpOptions::pretty() };
        base.with_indent(self.indent)
            .with_double_precision(self.double_precision)
            .with_float_precision(Some(self.float_precision))
    }
}
