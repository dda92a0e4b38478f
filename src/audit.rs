//! Heuristic quality audit of parsed scenes.
//!
//! Unlike `validate`, nothing here is a hard failure. Each finding is a
//! line worth a human look: leftover screenplay formatting or text that looks
//! like an extraction artifact.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use itertools::Itertools;
use regex::Regex;
use serde_json::Value;
use tracing::error;

use crate::validate::{content_lines, preview};

/// Examples printed per category.
const MAX_EXAMPLES: usize = 10;
const EXCERPT_LEN: usize = 50;

static MISSED_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:INT|EXT)\.|\bI/E\b").unwrap());
static TRANSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:CUT|FADE|DISSOLVE|SMASH|MATCH) TO:?").unwrap());
static PAREN_LEFTOVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\((?:CONT'D|V\.O\.|O\.S\.|O\.C\.|NOTE|then)\)").unwrap()
});
static PAGE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.?$").unwrap());
static PAGE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z ]*#\d+").unwrap());

static SPACE_PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[.,?!]").unwrap());
static FLOATING_APOS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+['\x{2019}]\s+").unwrap());
static SPACED_LETTERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z] [a-z]\b").unwrap());
static CAMEL_JOIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z][A-Z]").unwrap());
static DOTS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{4,}").unwrap());
static SPACE_CLOSE_QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s\x{2019}").unwrap());
static SPACE_OPEN_QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x{2018}\s").unwrap());

const SMART_QUOTES: [char; 4] = ['\u{201c}', '\u{201d}', '\u{2018}', '\u{2019}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    MissedSlugline,
    Transition,
    Parenthetical,
    Bracket,
    SmartQuote,
    EmptyContent,
    PageNumber,
    DoubleSpace,
    SpaceBeforePunctuation,
    FloatingApostrophe,
    SpacedLetters,
    CamelCaseJoin,
    ExcessiveDots,
    SpaceBeforeClosingQuote,
    SpaceAfterOpeningQuote,
}

impl Category {
    pub const ALL: [Category; 15] = [
        Category::MissedSlugline,
        Category::Transition,
        Category::Parenthetical,
        Category::Bracket,
        Category::SmartQuote,
        Category::EmptyContent,
        Category::PageNumber,
        Category::DoubleSpace,
        Category::SpaceBeforePunctuation,
        Category::FloatingApostrophe,
        Category::SpacedLetters,
        Category::CamelCaseJoin,
        Category::ExcessiveDots,
        Category::SpaceBeforeClosingQuote,
        Category::SpaceAfterOpeningQuote,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::MissedSlugline => "MISSED SLUGLINES",
            Category::Transition => "TRANSITIONS",
            Category::Parenthetical => "PARENTHETICALS",
            Category::Bracket => "BRACKETS",
            Category::SmartQuote => "SMART QUOTES",
            Category::EmptyContent => "EMPTY CONTENT",
            Category::PageNumber => "LIKELY PAGE NUMBERS",
            Category::DoubleSpace => "DOUBLE SPACES",
            Category::SpaceBeforePunctuation => "SPACE BEFORE PUNCTUATION",
            Category::FloatingApostrophe => "FLOATING APOSTROPHE",
            Category::SpacedLetters => "SPACED SINGLE LETTERS",
            Category::CamelCaseJoin => "CAMELCASE JOIN",
            Category::ExcessiveDots => "EXCESSIVE DOTS",
            Category::SpaceBeforeClosingQuote => "SPACE BEFORE CLOSING QUOTE",
            Category::SpaceAfterOpeningQuote => "SPACE AFTER OPENING QUOTE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub category: Category,
    pub file: String,
    pub scene: usize,
    pub line: Option<usize>,
    pub excerpt: String,
}

impl Finding {
    fn describe(&self) -> String {
        match self.line {
            Some(j) => format!("{} - Scene {} Line {}: {}", self.file, self.scene, j, self.excerpt),
            None => format!("{} - Scene {}: {}", self.file, self.scene, self.excerpt),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub files: usize,
    pub scenes: usize,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    #[cfg(test)]
    pub fn count(&self, category: Category) -> usize {
        self.findings.iter().filter(|f| f.category == category).count()
    }

    pub fn absorb(&mut self, other: AuditReport) {
        self.files += other.files;
        self.scenes += other.scenes;
        self.findings.extend(other.findings);
    }

    pub fn print(&self) {
        println!("--- Audit report ({} files, {} scenes) ---", self.files, self.scenes);
        let grouped = self.findings.iter().into_group_map_by(|f| f.category);
        for category in Category::ALL {
            match grouped.get(&category) {
                Some(found) => {
                    println!("\n[{}] Found {} instances:", category.label(), found.len());
                    for f in found.iter().take(MAX_EXAMPLES) {
                        println!("  - {}", f.describe());
                    }
                    if found.len() > MAX_EXAMPLES {
                        println!("  ... and {} more.", found.len() - MAX_EXAMPLES);
                    }
                }
                None => println!("\n[{}] CLEAN", category.label()),
            }
        }
    }
}

/// Scenes are raw JSON so older files with array `content` or partial
/// metadata are audited too.
pub fn audit_scenes(file: &str, scenes: &[Value]) -> AuditReport {
    let mut findings = Vec::new();
    for (i, scene) in scenes.iter().enumerate() {
        let lines = content_lines(&scene["content"]).unwrap_or_default();
        if lines.iter().flatten().all(|l| l.trim().is_empty()) {
            findings.push(Finding {
                category: Category::EmptyContent,
                file: file.to_string(),
                scene: i,
                line: None,
                excerpt: scene["heading"].as_str().unwrap_or_default().to_string(),
            });
            continue;
        }
        for (j, line) in lines.into_iter().enumerate() {
            let Some(line) = line else { continue };
            for (category, excerpt) in check_line(line) {
                findings.push(Finding {
                    category,
                    file: file.to_string(),
                    scene: i,
                    line: Some(j),
                    excerpt,
                });
            }
        }
    }
    AuditReport {
        files: 1,
        scenes: scenes.len(),
        findings,
    }
}

fn check_line(line: &str) -> Vec<(Category, String)> {
    let mut hits = Vec::new();
    let mut flag = |category: Category| hits.push((category, preview(line, EXCERPT_LEN)));

    if MISSED_SLUG_RE.is_match(line) {
        flag(Category::MissedSlugline);
    }
    if TRANSITION_RE.is_match(line) {
        flag(Category::Transition);
    }
    if PAREN_LEFTOVER_RE.is_match(line) {
        flag(Category::Parenthetical);
    }
    if line.contains('[') && !line.contains("[Observation:") {
        flag(Category::Bracket);
    }
    if line.contains(SMART_QUOTES) {
        flag(Category::SmartQuote);
    }
    if PAGE_NUMBER_RE.is_match(line.trim()) || PAGE_HEADER_RE.is_match(line) {
        flag(Category::PageNumber);
    }
    if SPACE_PUNCT_RE.is_match(line) {
        flag(Category::SpaceBeforePunctuation);
    }
    if FLOATING_APOS_RE.is_match(line) {
        flag(Category::FloatingApostrophe);
    }
    if SPACED_LETTERS_RE.is_match(line) {
        flag(Category::SpacedLetters);
    }
    if CAMEL_JOIN_RE.is_match(line) {
        flag(Category::CamelCaseJoin);
    }
    if DOTS_RE.is_match(line) {
        flag(Category::ExcessiveDots);
    }
    if SPACE_CLOSE_QUOTE_RE.is_match(line) {
        flag(Category::SpaceBeforeClosingQuote);
    }
    if SPACE_OPEN_QUOTE_RE.is_match(line) {
        flag(Category::SpaceAfterOpeningQuote);
    }
    if let Some(pos) = line.find("  ") {
        hits.push((Category::DoubleSpace, around(line, pos)));
    }
    hits
}

/// A short window of `line` centred on byte offset `pos`.
fn around(line: &str, pos: usize) -> String {
    let before: String = {
        let chars: Vec<char> = line[..pos].chars().rev().take(10).collect();
        chars.into_iter().rev().collect()
    };
    let after: String = line[pos..].chars().take(20).collect();
    format!("...{}{}...", before, after)
}

/// Audit each scene file; unreadable files are logged and skipped.
pub fn audit_paths(paths: &[PathBuf]) -> AuditReport {
    let mut report = AuditReport::default();
    for path in paths {
        let name = display_name(path);
        match read_scene_array(path) {
            Ok(scenes) => report.absorb(audit_scenes(&name, &scenes)),
            Err(e) => error!(file = %name, error = %e, "Failed to read scene file"),
        }
    }
    report
}

fn read_scene_array(path: &Path) -> Result<Vec<Value>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))? {
        Value::Array(scenes) => Ok(scenes),
        _ => anyhow::bail!("Root element is not a list"),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
