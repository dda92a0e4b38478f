use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use crate::error::IngestError;
use crate::model::{self, EpisodeName};
use crate::parser::{self, Rules};
use crate::pdf;
use crate::settings::{LayoutSettings, Settings};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Files handed to the worker pool between progress updates.
const CHUNK_SIZE: usize = 8;

pub const MEMORY_SUFFIX: &str = "_memory.json";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestSummary {
    pub files: usize,
    pub ok: usize,
    pub errors: usize,
    pub scenes: usize,
}

impl IngestSummary {
    pub fn print(&self) {
        println!(
            "Ingested {} of {} scripts ({} errors), {} scenes written.",
            self.ok, self.files, self.errors, self.scenes,
        );
    }
}

/// Script files to process: every PDF/TXT in `dir` by name, or just `file`.
///
/// A missing scripts folder is fatal; a missing single file is left to fail
/// per-file so the batch behaves the same either way.
pub fn discover(dir: &Path, file: Option<&str>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Scripts folder not found: {}", dir.display());
    }
    if let Some(name) = file {
        return Ok(vec![dir.join(name)]);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && pdf::is_script_file(p))
        .collect();
    paths.sort();
    Ok(paths)
}

/// `<output_dir>/<stem>_memory.json`
pub fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    output_dir.join(format!("{}{}", episode_id(input), MEMORY_SUFFIX))
}

fn episode_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse one script and write its memory file. Returns the scene count.
pub fn ingest_file(
    path: &Path,
    output_dir: &Path,
    rules: &Rules,
    layout: &LayoutSettings,
) -> Result<usize, IngestError> {
    let episode = episode_id(path);
    match EpisodeName::parse(&episode) {
        Some(name) => debug!(
            show = %name.show,
            code = %name.code(),
            title = name.title.as_deref().unwrap_or("-"),
            "parsing episode"
        ),
        None => warn!(file = %path.display(), "File name does not follow Show_SxEE_Title; using stem as episode id"),
    }

    let pages = pdf::extract_pages(path, layout)?;
    let scenes = parser::parse_script(&pages, &episode, rules);
    model::write_scenes(&output_path(output_dir, path), &scenes)?;
    debug!(episode = %episode, pages = pages.len(), scenes = scenes.len(), "script parsed");
    Ok(scenes.len())
}

pub(crate) fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

#[cfg(feature = "rayon")]
fn run_chunk(
    chunk: &[PathBuf],
    output_dir: &Path,
    rules: &Rules,
    layout: &LayoutSettings,
) -> Vec<Result<usize, IngestError>> {
    chunk
        .par_iter()
        .map(|p| ingest_file(p, output_dir, rules, layout))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn run_chunk(
    chunk: &[PathBuf],
    output_dir: &Path,
    rules: &Rules,
    layout: &LayoutSettings,
) -> Vec<Result<usize, IngestError>> {
    chunk
        .iter()
        .map(|p| ingest_file(p, output_dir, rules, layout))
        .collect()
}

/// Process every script, one worker task per file. Failures are logged and
/// counted; they never stop the batch.
pub fn ingest_all(paths: &[PathBuf], output_dir: &Path, settings: &Settings) -> Result<IngestSummary> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output folder {}", output_dir.display()))?;
    let rules = Rules::from_settings(settings)?;

    let pb = progress_bar(paths.len())?;

    let mut summary = IngestSummary {
        files: paths.len(),
        ..IngestSummary::default()
    };

    for chunk in paths.chunks(CHUNK_SIZE) {
        let results = run_chunk(chunk, output_dir, &rules, &settings.layout);
        for (path, result) in chunk.iter().zip(results) {
            match result {
                Ok(scenes) => {
                    summary.ok += 1;
                    summary.scenes += scenes;
                }
                Err(e) => {
                    summary.errors += 1;
                    pb.suspend(|| error!(file = %path.display(), error = %e, "Failed to process script"));
                }
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripts_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::copy(
            "tests/fixtures/Show_1x01_Pilot.txt",
            dir.path().join("Show_1x01_Pilot.txt"),
        )
        .unwrap();
        fs::write(dir.path().join("Show_1x02_Broken.pdf"), "not a pdf").unwrap();
        fs::write(dir.path().join("notes.md"), "# not a script").unwrap();
        dir
    }

    #[test]
    fn discover_lists_scripts_sorted() {
        let dir = scripts_dir();
        let paths = discover(dir.path(), None).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Show_1x01_Pilot.txt", "Show_1x02_Broken.pdf"]);
    }

    #[test]
    fn discover_single_file_and_missing_dir() {
        let dir = scripts_dir();
        let paths = discover(dir.path(), Some("Show_1x01_Pilot.txt")).unwrap();
        assert_eq!(paths, vec![dir.path().join("Show_1x01_Pilot.txt")]);
        assert!(discover(&dir.path().join("nope"), None).is_err());
    }

    #[test]
    fn output_file_naming() {
        assert_eq!(
            output_path(Path::new("out"), Path::new("scripts/Show_1x01_Pilot.pdf")),
            PathBuf::from("out/Show_1x01_Pilot_memory.json")
        );
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        let dir = scripts_dir();
        let out = dir.path().join("chunks");
        let paths = discover(dir.path(), None).unwrap();

        let summary = ingest_all(&paths, &out, &Settings::default()).unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.ok, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.scenes, 3);

        let scenes = model::read_scenes(&out.join("Show_1x01_Pilot_memory.json")).unwrap();
        assert_eq!(scenes.len(), 3);
        assert!(!out.join("Show_1x02_Broken_memory.json").exists());
    }

    #[test]
    fn missing_single_file_is_a_per_file_error() {
        let dir = scripts_dir();
        let paths = discover(dir.path(), Some("Show_9x99_Missing.txt")).unwrap();
        let summary = ingest_all(&paths, &dir.path().join("chunks"), &Settings::default()).unwrap();
        assert_eq!(summary.errors, 1);
    }
}
