use crate::commands::read_document;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use screenkit_editor::{analyze, MergeAnalysis};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Last document both sides agreed on
    #[arg(long)]
    pub base: PathBuf,

    /// Locally edited document
    #[arg(long)]
    pub local: PathBuf,

    /// Document currently stored on the server
    #[arg(long)]
    pub remote: PathBuf,

    /// Write the merged document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Three-way merge of top-level fields; returns whether a candidate was produced
pub fn merge(args: MergeArgs) -> Result<bool> {
    let base = read_document(&args.base)?;
    let local = read_document(&args.local)?;
    let remote = read_document(&args.remote)?;

    let analysis = analyze(Some(&base), &local, &remote);
    print_changes(&analysis);

    let Some(candidate) = &analysis.candidate else {
        eprintln!(
            "{} both sides changed: {}",
            "Cannot merge:".red().bold(),
            join(&analysis.overlapping)
        );
        return Ok(false);
    };

    let json = serde_json::to_string_pretty(candidate)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("✨ {} {}", "Merged into".green().bold(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(true)
}

fn print_changes(analysis: &MergeAnalysis) {
    eprintln!("   {} {}", "Local:".cyan(), join(&analysis.local_changes));
    eprintln!("   {} {}", "Remote:".cyan(), join(&analysis.remote_changes));
    if !analysis.overlapping.is_empty() {
        eprintln!("   {} {}", "Overlap:".red(), join(&analysis.overlapping));
    }
}

fn join(keys: &BTreeSet<String>) -> String {
    if keys.is_empty() {
        "(none)".to_string()
    } else {
        keys.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenkit_model::{Layout, ScreenDocument};

    fn write(dir: &tempfile::TempDir, name: &str, doc: &ScreenDocument) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, serde_json::to_string(doc).unwrap()).unwrap();
        path
    }

    fn args(dir: &tempfile::TempDir, local: &ScreenDocument, remote: &ScreenDocument) -> MergeArgs {
        let base = ScreenDocument::new("orders", "Orders");
        MergeArgs {
            base: write(dir, "base.json", &base),
            local: write(dir, "local.json", local),
            remote: write(dir, "remote.json", remote),
            output: Some(dir.path().join("merged.json")),
        }
    }

    #[test]
    fn test_disjoint_changes_write_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let mut local = ScreenDocument::new("orders", "Orders");
        local.layout = Layout::Fullscreen;
        let remote = ScreenDocument::new("orders", "All orders");

        let args = args(&dir, &local, &remote);
        let output = args.output.clone().unwrap();
        assert!(merge(args).unwrap());

        let merged: ScreenDocument =
            serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(merged.layout, Layout::Fullscreen);
        assert_eq!(merged.display_name, "All orders");
    }

    #[test]
    fn test_overlap_produces_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let local = ScreenDocument::new("orders", "Mine");
        let remote = ScreenDocument::new("orders", "Theirs");

        let args = args(&dir, &local, &remote);
        let output = args.output.clone().unwrap();
        assert!(!merge(args).unwrap());
        assert!(!output.exists());
    }

    #[test]
    fn test_join_lists_keys_in_order() {
        let keys: BTreeSet<String> = ["layout", "actions"].iter().map(|k| k.to_string()).collect();
        assert_eq!(join(&keys), "actions, layout");
        assert_eq!(join(&BTreeSet::new()), "(none)");
    }
}
