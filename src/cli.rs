//! CLI: format, schema-check and query JSON files.
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use json_node::{Document, SchemaRegistry};
use tracing::*;

use crate::config::Config;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// read JSON (with `#` comments and `~` nulls) into node trees and write it back out
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInterface {
    /// TOML configuration file (`json-node.toml` is used when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// log debug events to stderr
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// parse and re-serialize
    Fmt(FmtOut),
    /// parse into a tree bound to a schema struct and report every rejection
    Check(CheckOut),
    /// print the value at a field path (`a.b.0`, `a/b/0`, `a[b][0]`, ...)
    Get(GetOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct FmtOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// single-line output without whitespace
    #[arg(long, default_value_t = false)]
    dense: bool,

    /// spaces per level (overrides the configuration)
    #[arg(long)]
    indent: Option<usize>,

    /// significant digits for doubles (overrides the configuration)
    #[arg(long)]
    precision: Option<usize>,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema file in the Thrift JSON layout
    #[arg(long)]
    schema: PathBuf,

    /// struct each input must conform to
    #[arg(long = "struct")]
    struct_name: String,
}

#[derive(clap::Parser, Debug)]
struct GetOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// field path to print
    path: String,

    /// single-line output without whitespace
    #[arg(long, default_value_t = false)]
    dense: bool,
}

/// One document: a whole file, or one line of an NDJSON file.
struct SourceUnit {
    name: String,
    text: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Calls `apply` on every document. Failures are reported and counted,
    /// and the remaining documents are still processed.
    fn load_process(&self, mut apply: impl FnMut(&SourceUnit) -> json_node::Result<()>) -> anyhow::Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut total = 0usize;
        let mut failed = 0usize;
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file `{source_path_str}`"))?;
            for unit in split_units(&source_path_str, source, self.ndjson) {
                total += 1;
                debug!(source = %unit.name, bytes = unit.text.len(), "processing");
                if let Err(error) = apply(&unit) {
                    failed += 1;
                    report(&unit, &error);
                }
            }
        }
        if failed > 0 {
            anyhow::bail!("{failed} of {total} inputs failed");
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let config = Config::load(self.config.as_deref())?;
        debug!(?config, "loaded configuration");
        let parse_options = config.parse_options();
        match &self.cmd {
            Command::Fmt(target) => {
                let mut options = config.dump_options(target.dense || target.input_settings.ndjson);
                if let Some(indent) = target.indent {
                    options = options.with_indent(indent);
                }
                if target.precision.is_some() {
                    options = options.with_double_precision(target.precision);
                }
                let mut output = String::new();
                target.input_settings.load_process(|unit| {
                    let doc = Document::parse_with(&unit.text, &parse_options)?;
                    output.push_str(&doc.root().dump_with(&options));
                    if !output.ends_with('\n') {
                        output.push('\n');
                    }
                    Ok(())
                })?;
                write_output(target.out.as_ref(), &output)
            }
            Command::Check(target) => {
                let mut registry = SchemaRegistry::new();
                registry
                    .load_file("thrift", &target.schema)
                    .with_context(|| format!("failed to load schema `{}`", target.schema.display()))?;
                let registry = Arc::new(registry);
                registry
                    .require_struct(&target.struct_name)
                    .with_context(|| format!("schema `{}`", target.schema.display()))?;
                target.input_settings.load_process(|unit| {
                    let mut doc = Document::with_schema(&registry, &target.struct_name)?;
                    doc.root_mut().loads_with(&unit.text, &parse_options)?;
                    println!("{} {}", "ok".green().bold(), unit.name);
                    Ok(())
                })
            }
            Command::Get(target) => {
                let options = config.dump_options(target.dense);
                target.input_settings.load_process(|unit| {
                    let doc = Document::parse_with(&unit.text, &parse_options)?;
                    let node = doc.field(&target.path).ok_or_else(|| {
                        json_node::Error::missing("field-path", format!("no field `{}`", target.path))
                    })?;
                    let text = node.dump_with(&options);
                    println!("{}", text.trim_end());
                    Ok(())
                })
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn split_units(name: &str, source: String, ndjson: bool) -> Vec<SourceUnit> {
    if !ndjson {
        return vec![SourceUnit { name: name.to_string(), text: source }];
    }
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| SourceUnit { name: format!("{name}:{}", index + 1), text: line.to_string() })
        .collect()
}

/// Source excerpt for errors with a position, a one-line message otherwise.
fn report(unit: &SourceUnit, error: &json_node::Error) {
    let Some(offset) = error.offset else {
        eprintln!("{} {}: {error}", "error".red().bold(), unit.name);
        return;
    };
    let span = label_span(&unit.text, offset);
    let printed = Report::<(String, Range<usize>)>::build(ReportKind::Error, unit.name.clone(), span.start)
        .with_message(format!("{} [{} #{}]", error.component, error.kind, error.code()))
        .with_label(
            Label::new((unit.name.clone(), span))
                .with_message(&error.message)
                .with_color(Color::Red),
        )
        .finish()
        .eprint((unit.name.clone(), Source::from(unit.text.as_str())));
    if printed.is_err() {
        eprintln!("{} {}: {error}", "error".red().bold(), unit.name);
    }
}

/// One character at `offset`, or an empty span at the end of the text.
fn label_span(text: &str, offset: usize) -> Range<usize> {
    let mut start = offset.min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let end = text[start..].chars().next().map_or(start, |ch| start + ch.len_utf8());
    start..end
}

fn write_output(out: Option<&PathBuf>, text: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create `{}`", parent.display()))?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write `{}`", out.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_splits_on_non_blank_lines() {
        let units = split_units("f.ndjson", "{\"a\":1}\n\n[2]\n".to_string(), true);
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].name, "f.ndjson:3");
        assert_eq!(units[1].text, "[2]");
        assert_eq!(split_units("f.json", "x".to_string(), false).len(), 1);
    }

    #[test]
    fn spans_stay_on_char_boundaries() {
        assert_eq!(label_span("ab", 1), 1..2);
        assert_eq!(label_span("aé", 1), 1..3);
        assert_eq!(label_span("ab", 9), 2..2);
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "b/c.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("b/c.json")]);
        assert!(resolve_file_path_patterns(["/no/such/dir/*.json"]).is_err());
    }

    #[test]
    fn arguments_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "json-node", "check", "-i", "x.json", "--schema", "s.json", "--struct", "Limits",
        ])
        .unwrap();
        match cli.cmd {
            Command::Check(check) => assert_eq!(check.struct_name, "Limits"),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
