use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{error, warn};

use crate::ingest::{progress_bar, MEMORY_SUFFIX};
use crate::model;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeSummary {
    pub files: usize,
    pub merged: usize,
    pub skipped: usize,
    pub scenes: usize,
}

impl MergeSummary {
    pub fn print(&self, output: &Path) {
        println!("Merge complete.");
        println!("Files Found:    {}", self.files);
        println!("Total Episodes: {}", self.merged);
        println!("Total Scenes:   {}", self.scenes);
        if self.skipped > 0 {
            println!("Skipped:        {}", self.skipped);
        }
        println!("Saved to: {}", output.display());
    }
}

/// `*_memory.json` files in `dir`, in file-name order (episode order for `Show_SxEE` names).
pub fn memory_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Input folder not found: {}", dir.display());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(MEMORY_SUFFIX))
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Concatenate every episode's scene array into one master array.
pub fn merge_dir(input_dir: &Path, output_file: &Path) -> Result<MergeSummary> {
    let files = memory_files(input_dir)?;
    let mut summary = MergeSummary {
        files: files.len(),
        ..MergeSummary::default()
    };
    let mut master: Vec<Value> = Vec::new();

    let pb = progress_bar(files.len())?;
    for path in &files {
        match read_value(path) {
            Ok(Value::Array(scenes)) => {
                summary.merged += 1;
                summary.scenes += scenes.len();
                master.extend(scenes);
            }
            Ok(_) => {
                summary.skipped += 1;
                pb.suspend(|| warn!(file = %path.display(), "Not a JSON array, skipping"));
            }
            Err(e) => {
                summary.skipped += 1;
                pb.suspend(|| error!(file = %path.display(), error = %e, "Failed to read episode file"));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    model::write_json(output_file, &master)?;
    Ok(summary)
}

fn read_value(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}
