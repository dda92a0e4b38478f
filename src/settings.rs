use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, Source};
use serde::Deserialize;
use tracing::debug;

const DEFAULT_CONFIG_NAME: &str = "script_ingest";
const ENV_PREFIX: &str = "SCRIPT_INGEST";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: Paths,
    pub layout: LayoutSettings,
    pub thresholds: Thresholds,
    pub lexicon: LexiconExtras,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub scripts: PathBuf,
    pub output: PathBuf,
    pub merged: PathBuf,
    pub report: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            scripts: PathBuf::from("episode_scripts"),
            output: PathBuf::from("chunks_output"),
            merged: PathBuf::from("complete_memories.json"),
            report: PathBuf::from("validation_report.txt"),
        }
    }
}

/// Grid used to turn glyph positions into layout text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Points per text column.
    pub x_density: f32,
    /// Baselines closer than this (in points) share a row.
    pub y_tolerance: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings {
            x_density: 5.0,
            y_tolerance: 3.0,
        }
    }
}

/// Indentation gutters for the line classifier, in leading spaces.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub character_indent: usize,
    pub dialogue_indent_min: usize,
    pub dialogue_indent_max: usize,
    pub character_max_words: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            character_indent: 25,
            dialogue_indent_min: 8,
            dialogue_indent_max: 30,
            character_max_words: 4,
        }
    }
}

/// Entries appended to the built-in lexicon lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LexiconExtras {
    pub whole_line_killers: Vec<String>,
    pub dynamic_killers: Vec<String>,
    pub partial_removers: Vec<String>,
    pub character_blacklist: Vec<String>,
    pub slugline_markers: Vec<String>,
}

/// Layered load: built-in defaults, then the TOML file, then env vars of the
/// form `SCRIPT_INGEST__THRESHOLDS__CHARACTER_INDENT`.
///
/// An explicit `path` must exist; otherwise `script_ingest.toml` in the working
/// directory is picked up when present.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };
    build(file, environment())
}

/// `__` separates the prefix as well as nested keys.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

fn build<S>(file: S, env: Environment) -> Result<Settings>
where
    S: Source + Send + Sync + 'static,
{
    let cfg = Config::builder()
        .add_source(file)
        .add_source(env)
        .build()
        .context("Failed to read configuration")?;

    let settings: Settings = cfg
        .try_deserialize()
        .context("Invalid configuration values")?;
    debug!(?settings, "settings loaded");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let s = Settings::default();
        assert_eq!(s.thresholds.character_indent, 25);
        assert_eq!(s.thresholds.dialogue_indent_min, 8);
        assert_eq!(s.thresholds.dialogue_indent_max, 30);
        assert!((s.layout.x_density - 5.0).abs() < f32::EPSILON);
        assert!(s.lexicon.whole_line_killers.is_empty());
    }

    #[test]
    fn toml_overrides_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.toml");
        std::fs::write(
            &path,
            "[thresholds]\ncharacter_indent = 33\n\n[lexicon]\ncharacter_blacklist = [\"GRAHAM\"]\n",
        )
        .unwrap();

        let s = load(Some(&path)).unwrap();
        assert_eq!(s.thresholds.character_indent, 33);
        // untouched fields keep their defaults
        assert_eq!(s.thresholds.dialogue_indent_max, 30);
        assert_eq!(s.lexicon.character_blacklist, vec!["GRAHAM".to_string()]);
    }

    #[test]
    fn shipped_show_config_parses() {
        let s = load(Some(Path::new("config/hannibal.toml"))).unwrap();
        assert!(s.lexicon.whole_line_killers.iter().any(|k| k == "Hannibal"));
        assert!(!s.lexicon.character_blacklist.is_empty());
    }

    #[test]
    fn env_overrides_use_double_underscore() {
        let mut vars = config::Map::new();
        vars.insert("SCRIPT_INGEST__THRESHOLDS__CHARACTER_INDENT".to_string(), "31".to_string());
        vars.insert("SCRIPT_INGEST__LAYOUT__X_DENSITY".to_string(), "6.5".to_string());
        // single underscore after the prefix is not ours
        vars.insert("SCRIPT_INGEST_THRESHOLDS__DIALOGUE_INDENT_MIN".to_string(), "2".to_string());

        let file = File::with_name("config/not_there").required(false);
        let s = build(file, environment().source(Some(vars))).unwrap();
        assert_eq!(s.thresholds.character_indent, 31);
        assert!((s.layout.x_density - 6.5).abs() < f32::EPSILON);
        assert_eq!(s.thresholds.dialogue_indent_min, 8);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(load(Some(Path::new("config/does_not_exist.toml"))).is_err());
    }
}
