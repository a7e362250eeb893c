use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::{ColoredString, Colorize};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::info;

use sectioned_diff::{apply_batch, diff_collections, diff_with, DiffOptions, EditOp};
use sectioned_store::{ChangeEvent, Mirror, ObservableCollection, StoreConfig};
use sectioned_types::{Change, Collection};

use crate::cli::*;

type JsonCollection = Collection<Value, Value>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    if cli.verbose {
        info!(format = ?cli.format, "verbose output enabled");
    }
    match cli.command {
        Command::Diff(args) => cmd_diff(args, &cli.format, cli.verbose),
        Command::Script(args) => cmd_script(args, &cli.format),
        Command::Verify(args) => cmd_verify(args, &cli.format),
    }
}

fn load_collection(path: &Path) -> anyhow::Result<JsonCollection> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of sections", path.display()))
}

fn load_sequence(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a JSON array", path.display()))
}

fn cmd_diff(args: PairArgs, format: &OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let old = load_collection(&args.old)?;
    let new = load_collection(&args.new)?;
    let options = args.settings.options();
    let result = diff_collections(&old, &new, &options);
    info!(
        algorithm = %options.algorithm,
        operations = result.operation_count(),
        "diffed {} against {}",
        args.old.display(),
        args.new.display()
    );

    let changes = result.changes();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&changes)?),
        OutputFormat::Text => {
            for change in &changes {
                if change.is_empty() && !verbose {
                    continue;
                }
                println!("{}", render_change(change));
            }
            println!(
                "{} operations, {} matched sections",
                result.operation_count().to_string().bold(),
                result.matched.len()
            );
        }
    }
    Ok(())
}

fn render_change(change: &Change) -> ColoredString {
    let text = change.to_string();
    match change {
        Change::InsertItems(_) | Change::InsertSections(_) => text.green(),
        Change::DeleteItems(_) | Change::DeleteSections(_) => text.red(),
        Change::MoveItem { .. } | Change::MoveSection { .. } => text.yellow(),
        Change::UpdateItems(_) | Change::UpdateSections(_) => text.cyan(),
        Change::Reset => text.bold(),
        Change::BeginBatch | Change::EndBatch => text.dimmed(),
    }
}

fn cmd_script(args: PairArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let old = load_sequence(&args.old)?;
    let new = load_sequence(&args.new)?;
    let script = diff_with(&old, &new, &args.settings.options());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&script)?),
        OutputFormat::Text => {
            if script.is_empty() {
                println!("{} Sequences are equal.", "✓".green().bold());
                return Ok(());
            }
            for op in &script.ops {
                match op {
                    EditOp::Delete { at } => println!("{} [{}] {}", "-".red(), at, old[*at]),
                    EditOp::Insert { at, element } => {
                        println!("{} [{}] {}", "+".green(), at, element)
                    }
                    EditOp::Move { from, to } => {
                        println!("{} [{}] -> [{}] {}", "~".yellow(), from, to, old[*from])
                    }
                }
            }
            println!(
                "{} insertions, {} deletions, {} moves",
                script.insertions().to_string().green(),
                script.deletions().to_string().red(),
                script.moves().to_string().yellow()
            );
        }
    }
    Ok(())
}

/// Outcome of replaying a diff two ways.
#[derive(Debug, PartialEq, Eq)]
struct VerifyReport {
    operations: usize,
    events: usize,
}

/// Replay `old -> new` through an observed collection with a mirror attached,
/// and through [`apply_batch`] directly. Both must land on `new`.
fn verify_replay(
    old: &JsonCollection,
    new: &JsonCollection,
    options: DiffOptions,
) -> anyhow::Result<VerifyReport> {
    let changes = diff_collections(old, new, &options);
    let patched = apply_batch(old, &changes.changes(), new)?;
    if &patched != new {
        bail!("applying the change stream did not reproduce the new collection");
    }

    let store = ObservableCollection::with_config(
        old.clone(),
        StoreConfig::labeled("verify").with_diff(options),
    );
    let mirror = Arc::new(Mutex::new(Mirror::new()));
    let events = Arc::new(Mutex::new(0usize));
    let failures = Arc::new(Mutex::new(Vec::new()));
    {
        let (mirror, events, failures) = (
            Arc::clone(&mirror),
            Arc::clone(&events),
            Arc::clone(&failures),
        );
        store.subscribe(move |event: &ChangeEvent<Value, Value>| {
            *events.lock() += 1;
            if let Err(err) = mirror.lock().handle(event) {
                failures.lock().push(err);
            }
        })?;
    }
    store.replace_all(new.clone(), true)?;

    if let Some(err) = failures.lock().first() {
        bail!("mirror replay failed: {err}");
    }
    if mirror.lock().collection() != new {
        bail!("mirror diverged from the observed collection");
    }

    // The subscription reset is not part of the diff run.
    let events = *events.lock() - 1;
    Ok(VerifyReport {
        operations: changes.operation_count(),
        events,
    })
}

fn cmd_verify(args: PairArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let old = load_collection(&args.old)?;
    let new = load_collection(&args.new)?;
    let report = verify_replay(&old, &new, args.settings.options())?;
    info!(
        operations = report.operations,
        events = report.events,
        "replay verified"
    );

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "ok": true,
                "operations": report.operations,
                "events": report.events,
            }))?
        ),
        OutputFormat::Text => {
            println!("{} Replay verified", "✓".green().bold());
            println!("  Operations: {}", report.operations.to_string().bold());
            println!("  Events: {}", report.events);
            println!("  Mirror: {}", "in step".green());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sectioned_diff::Algorithm;
    use std::io::Write;

    fn parse(text: &str) -> JsonCollection {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn loads_collection_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"metadata": "A", "items": [1, 2]}}, {{"metadata": "B", "items": []}}]"#)
            .unwrap();
        let collection = load_collection(file.path()).unwrap();
        assert_eq!(collection.shape(), vec![2, 0]);
        assert_eq!(collection.section(0).unwrap().metadata, json!("A"));
    }

    #[test]
    fn rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"metadata": "A"}}"#).unwrap();
        let err = load_collection(file.path()).unwrap_err();
        assert!(err.to_string().contains("not a JSON array of sections"));
    }

    #[test]
    fn verify_reports_diff_run() {
        let old = parse(r#"[{"metadata": "A", "items": [1, 2, 3]}, {"metadata": "B", "items": [4]}]"#);
        let new = parse(r#"[{"metadata": "B", "items": [4, 5]}, {"metadata": "A", "items": [3, 1]}]"#);
        for algorithm in [Algorithm::Lcs, Algorithm::Myers] {
            let options = DiffOptions::default().with_algorithm(algorithm);
            let report = verify_replay(&old, &new, options).unwrap();
            assert!(report.operations >= 3);
            // Markers plus six category events, plus one per move.
            assert!(report.events >= 8);
        }
    }

    #[test]
    fn verify_identical_collections() {
        let old = parse(r#"[{"metadata": 1, "items": ["x"]}]"#);
        let report = verify_replay(&old, &old, DiffOptions::baseline()).unwrap();
        assert_eq!(report, VerifyReport { operations: 0, events: 6 });
    }

    #[test]
    fn settings_map_to_options() {
        let settings = DiffSettings {
            algorithm: AlgorithmArg::Myers,
            no_moves: true,
        };
        let options = settings.options();
        assert_eq!(options.algorithm, Algorithm::Myers);
        assert!(!options.detect_moves);
    }
}
