//! Strict structural and content checks over scene JSON files.
//!
//! Works on raw `serde_json::Value` rather than `Scene` so that malformed
//! files produce readable issues instead of a single deserialization error.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::model::{SceneTime, UNKNOWN};

static SLUG_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:INT|EXT|I/E)\b").unwrap());
static DIRECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[a-z\s\.,\?!]+\]$").unwrap());

/// Substrings that should never survive cleaning.
const ARTIFACTS: [&str; 3] = ["[then]", "(NOTE", "SMASH TO BLACK"];

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub scene: Option<usize>,
    pub line: Option<usize>,
    pub message: String,
}

impl Issue {
    fn file(message: impl Into<String>) -> Self {
        Issue { scene: None, line: None, message: message.into() }
    }

    fn scene(i: usize, message: impl Into<String>) -> Self {
        Issue { scene: Some(i), line: None, message: message.into() }
    }

    fn line(i: usize, j: usize, message: impl Into<String>) -> Self {
        Issue { scene: Some(i), line: Some(j), message: message.into() }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.scene, self.line) {
            (Some(i), Some(j)) => write!(f, "Scene {} Line {}: {}", i, j, self.message),
            (Some(i), None) => write!(f, "Scene {}: {}", i, self.message),
            _ => f.write_str(&self.message),
        }
    }
}

pub fn check_value(data: &Value) -> Vec<Issue> {
    let Some(scenes) = data.as_array() else {
        return vec![Issue::file("Root element is not a list")];
    };

    let mut issues = Vec::new();
    for (i, scene) in scenes.iter().enumerate() {
        let Some(scene) = scene.as_object() else {
            issues.push(Issue::scene(i, "Scene is not an object"));
            continue;
        };
        if !scene.contains_key("heading") || !scene.contains_key("content") {
            issues.push(Issue::scene(i, "Missing heading or content keys"));
            continue;
        }

        if !scene["heading"].as_str().is_some_and(|h| !h.is_empty()) {
            issues.push(Issue::scene(i, "Invalid or empty heading"));
        }

        match scene.get("metadata") {
            None => {}
            Some(Value::Object(meta)) => check_metadata(i, meta, &mut issues),
            Some(_) => issues.push(Issue::scene(i, "Metadata is not an object")),
        }

        check_content(i, &scene["content"], &mut issues);
    }
    issues
}

fn check_metadata(i: usize, meta: &Map<String, Value>, issues: &mut Vec<Issue>) {
    let time = meta.get("time").and_then(Value::as_str).unwrap_or(UNKNOWN);
    if !SceneTime::is_valid_label(time) {
        issues.push(Issue::scene(i, format!("Invalid time '{}'", time)));
    }

    if !meta.get("episode").and_then(Value::as_str).is_some_and(|e| !e.is_empty()) {
        issues.push(Issue::scene(i, "Missing episode ID"));
    }

    let location = meta.get("location").and_then(Value::as_str).unwrap_or("");
    if location.is_empty() {
        issues.push(Issue::scene(i, "Empty location"));
    }
    if SLUG_WORD_RE.is_match(location) {
        issues.push(Issue::scene(
            i,
            format!("Location contains INT/EXT artifact: '{}'", location),
        ));
    }
}

fn check_content(i: usize, content: &Value, issues: &mut Vec<Issue>) {
    let Some(lines) = content_lines(content) else {
        issues.push(Issue::scene(i, "Content is neither text nor a list"));
        return;
    };

    for (j, line) in lines.into_iter().enumerate() {
        let Some(line) = line else {
            issues.push(Issue::line(i, j, "Content item is not a string"));
            continue;
        };
        if line.trim().is_empty() {
            issues.push(Issue::line(i, j, "Empty line found"));
        }
        for artifact in ARTIFACTS {
            if line.contains(artifact) {
                issues.push(Issue::line(i, j, format!("Found '{}' artifact", artifact)));
            }
        }
        if line.starts_with('[') && !line.starts_with("[Observation:") && !DIRECTION_RE.is_match(line) {
            issues.push(Issue::line(
                i,
                j,
                format!("Suspicious bracketed line: {}", preview(line, 50)),
            ));
        }
    }
}

/// Scene content as lines: a newline-joined string or an array of strings.
/// Array items that are not strings come back as `None`.
pub(crate) fn content_lines(content: &Value) -> Option<Vec<Option<&str>>> {
    match content {
        Value::String(s) => Some(s.split('\n').map(Some).collect()),
        Value::Array(items) => Some(items.iter().map(Value::as_str).collect()),
        _ => None,
    }
}

pub(crate) fn preview(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}

/// A file that cannot be loaded yields a single issue.
pub fn check_file(path: &Path) -> Vec<Issue> {
    let loaded = fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|raw| serde_json::from_str::<Value>(&raw).map_err(anyhow::Error::from));
    match loaded {
        Ok(data) => check_value(&data),
        Err(e) => vec![Issue::file(format!("JSON Load Error: {}", e))],
    }
}

/// Every `*.json` under a folder (sorted), or the single file given.
pub fn json_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("Input not found: {}", path.display());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(path)
        .with_context(|| format!("Failed to list {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();
    Ok(files)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationSummary {
    pub files: usize,
    pub files_with_issues: usize,
    pub issues: usize,
}

impl ValidationSummary {
    pub fn passed(&self) -> bool {
        self.issues == 0
    }

    pub fn print(&self) {
        if self.passed() {
            println!("\nAll {} files passed strict verification.", self.files);
        } else {
            println!(
                "\nVerification failed: {} of {} files contain {} issues.",
                self.files_with_issues, self.files, self.issues,
            );
        }
    }
}

/// Check every file, echo failures to stdout and write them to `report`.
pub fn validate_paths(paths: &[PathBuf], report: &Path) -> Result<ValidationSummary> {
    let mut out = fs::File::create(report)
        .with_context(|| format!("Failed to create report {}", report.display()))?;
    writeln!(out, "Validation report, {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "{} files checked", paths.len())?;
    writeln!(out, "{}", "-".repeat(40))?;

    let mut summary = ValidationSummary {
        files: paths.len(),
        ..ValidationSummary::default()
    };

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let issues = check_file(path);
        debug!(file = %name, issues = issues.len(), "validated");
        if issues.is_empty() {
            continue;
        }

        summary.files_with_issues += 1;
        summary.issues += issues.len();
        let header = format!("{}: Found {} issues", name, issues.len());
        println!("{}", header);
        writeln!(out, "{}", header)?;
        for issue in &issues {
            println!("   - {}", issue);
            writeln!(out, "   - {}", issue)?;
        }
        writeln!(out, "{}", "-".repeat(40))?;
    }

    Ok(summary)
}
