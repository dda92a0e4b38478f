pub mod clean;
pub mod junk;
pub mod lines;
pub mod scenes;
pub mod slugline;

use anyhow::Result;

use crate::lexicon::Lexicon;
use crate::model::Scene;
use crate::settings::{Settings, Thresholds};
use lines::Line;
use scenes::SceneBuilder;

/// Classifier gutters plus the compiled lexicon, built once per run.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    pub thresholds: Thresholds,
    pub lexicon: Lexicon,
}

impl Rules {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Rules {
            thresholds: settings.thresholds.clone(),
            lexicon: Lexicon::new(&settings.lexicon)?,
        })
    }
}

/// Three-pass pipeline: layout lines → junk filter → classified lines → scenes.
pub fn parse_script(pages: &[String], episode: &str, rules: &Rules) -> Vec<Scene> {
    let mut builder = SceneBuilder::new(episode, &rules.lexicon);
    for raw in pages.iter().flat_map(|p| p.lines()) {
        if junk::is_junk_line(raw, &rules.lexicon) {
            continue;
        }
        builder.push(lines::classify_line(raw, rules));
    }
    builder.finish()
}

/// One layout line as the classifier sees it.
#[derive(Debug, Clone)]
pub struct Inspected {
    pub page: usize,
    pub indent: usize,
    pub raw: String,
    /// `None` when the junk filter dropped the line.
    pub line: Option<Line>,
}

pub fn inspect(pages: &[String], rules: &Rules) -> Vec<Inspected> {
    let mut out = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        for raw in page.lines() {
            let line = if junk::is_junk_line(raw, &rules.lexicon) {
                None
            } else {
                Some(lines::classify_line(raw, rules))
            };
            out.push(Inspected {
                page: i + 1,
                indent: lines::leading_spaces(raw),
                raw: raw.to_string(),
                line,
            });
        }
    }
    out
}
