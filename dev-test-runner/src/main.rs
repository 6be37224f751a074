//! Round-trips every JSON fixture under a directory through `json-node` and
//! cross-checks the result against `serde_json`.
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use json_node::Document;
use rayon::prelude::*;

#[derive(Parser, Debug)]
struct Args {
    /// fixture directory
    #[arg(default_value = "tests/data")]
    root: PathBuf,

    /// glob, relative to the fixture directory
    #[arg(long, default_value = "**/*.json")]
    pattern: String,
}

struct Outcome {
    path: PathBuf,
    failures: Vec<String>,
}

fn check_file(path: &Path) -> Outcome {
    let mut failures = Vec::new();
    match std::fs::read_to_string(path) {
        Ok(text) => check_text(&text, &mut failures),
        Err(error) => failures.push(format!("unreadable: {error}")),
    }
    Outcome { path: path.to_path_buf(), failures }
}

fn check_text(text: &str, failures: &mut Vec<String>) {
    let doc = match Document::parse(text) {
        Ok(doc) => doc,
        Err(error) => {
            failures.push(format!("parse: {error}"));
            return;
        }
    };
    for dense in [true, false] {
        let label = if dense { "dense" } else { "pretty" };
        match Document::parse(&doc.dump(dense)) {
            Ok(again) if again == doc => {}
            Ok(again) => failures.push(format!("{label} round trip changed the tree: {}", again.dump(true))),
            Err(error) => failures.push(format!("{label} output does not re-parse: {error}")),
        }
    }
    // Fixtures with comments or `~` are not strict JSON; skip the cross-check for them.
    if let Ok(expected) = serde_json::from_str::<serde_json::Value>(text) {
        let ours = doc.root().value::<serde_json::Value>();
        if ours.as_ref() != Some(&expected) {
            failures.push(format!(
                "disagrees with serde_json: {} vs {}",
                ours.map(|v| v.to_string()).unwrap_or_default(),
                expected
            ));
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let pattern = args.root.join(&args.pattern);
    let paths = glob::glob(&pattern.to_string_lossy())?.collect::<Result<Vec<_>, _>>()?;
    if paths.is_empty() {
        anyhow::bail!("no fixtures match {}", pattern.display());
    }

    let mut outcomes: Vec<Outcome> = paths.par_iter().map(|path| check_file(path)).collect();
    outcomes.sort_by(|a, b| a.path.cmp(&b.path));

    let mut failed = 0usize;
    for outcome in &outcomes {
        if outcome.failures.is_empty() {
            println!("{} {}", "PASS".green().bold(), outcome.path.display());
        } else {
            failed += 1;
            println!("{} {}", "FAIL".red().bold(), outcome.path.display());
            for failure in &outcome.failures {
                println!("     {}", failure.yellow());
            }
        }
    }
    println!("{} passed, {} failed", outcomes.len() - failed, failed);
    if failed > 0 {
        anyhow::bail!("{failed} fixture(s) failed");
    }
    Ok(())
}
