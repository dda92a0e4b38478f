use std::collections::HashSet;

use anyhow::{Context, Result};
use itertools::Itertools;
use regex::Regex;

use crate::settings::LexiconExtras;

/// Substrings that drop the whole line (case-sensitive).
const WHOLE_LINE_KILLERS: &[&str] = &[
    "TEASER", "ACT ONE", "ACT TWO", "ACT THREE", "ACT FOUR", "ACT FIVE", "ACT SIX",
    "END OF ACT", "END OF TEASER", "END OF SHOW", "END OF EPISODE", "THE END",
    "FADE IN:", "FADE OUT.", "FADE TO BLACK.", "FADE TO:", "PROLOGUE",
    "CUT TO:", "DISSOLVE TO:", "SMASH TO:", "SMASH TO BLACK.", "MATCH CUT TO:",
    "TIME CUT TO:", "JUMP CUT TO:",
    "CONTINUED", "OMITTED", "FINAL SHOOTING SCRIPT", "FINAL DRAFT", "Collated",
    "REVERSE ANGLE", "CLOSE-UP", "NEW ANGLE", "HIGH ANGLE", "POP WIDE", "POST CREDITS",
    "Written by", "Created by", "Directed by", "Story by", "Teleplay by",
    "Based on the characters", "Based on the novel", "Production Draft", "Shooting Script",
    "Executive Producer", "PRODUCED BY", "Co-Executive Producer", "Associate Producer",
    "Consulting Producer", "Staff Writer",
    "PROPERTY OF:", "ALL RIGHTS RESERVED", "NO PORTIONS OF THIS SCRIPT",
    "PERFORMED, OR REPRODUCED", "WRITTEN CONSENT", "SCRIPT MAY BE", "QUOTED, OR PUBLISHED",
];

/// Whole-line patterns, compiled case-insensitive unless they opt out with `(?-i)`.
const DYNAMIC_KILLERS: &[&str] = &[
    // sound effects on their own line
    r"^\s*(?:FWUM|CLICK|BLAM|WHOOSH|CRASH|BANG|SMASH|KLANG|K'CHUK|K’CHUK|RING|PLIP|WHAM|P'KEE|P’KEE|PFFT|KLAXON|BUZZ|P'KEET|SHLUCK|PWUM|PLOP|ZAP|SHUNK|FWOOM|SCRITCH|KA-CHOO|BING-BONG|K-SHH+|FWUMMP|THWUB|KERSHICK|SLKGHHH|WHACK|THUNK|BARP|P-KEE|CH-CHUNK|WOOMPF)(?:\.|\s)*$",
    r"^\s*(?:SLAM|CHOP|PLIP|PWUM|FWUP|BANG|THWUB|BLEEP|EEK)(?:[-.\s]+(?:SLAM|CHOP|PLIP|PWUM|FWUP|BANG|THWUB|BLEEP|EEK))+\s*$",
    // transitions and camera moves are written in caps
    r"(?-i)^\s*FADE (?:IN|OUT|TO|THROUGH):?",
    r"(?-i)^\s*(?:CUT|SMASH CUT|BACK|MATCH CUT|TIME CUT|QUICK POP|SMASH BACK|HARD CUT|FLASH CUT|QUICK MATCH CUT|SWIPE) TO:?",
    r"(?-i)^\s*DISSOLVE TO:?",
    r"(?-i)^\s*(?:WIDENING|REVERSING|PUSHING|PULLING|PANNING|TILTING|TRACKING|CRANE|DOLLY)\b",
    // revision colour page headers
    r"(?-i)^\s*(?:WHITE|BLUE|PINK|YELLOW|GREEN|GOLDENROD|SALMON|CHERRY|BUFF|TAN)(?:\s+(?:REVISIONS?|PAGES?|DRAFT))?(?:\s*-?\s*\d{1,2}/\d{1,2}/\d{2,4})?\s*$",
    // page furniture
    r"\d{2}/\d{2}/\d{2}\s+\d+\.?\s*$",
    r"^\s*\d+\.\s*$",
    r"\d{1,2}/\d{1,2}/\d{2,4}",
    r"^\s*\(CONTINUED\)\s*$",
    r"^\s*©",
    r"^\s*\(c\)",
    // bare scene numbers and margin codes ("12", "A25", "25B.")
    r"(?-i)^\s*[A-Z]?\d+[A-Z]?\.?\s*$",
];

/// Removed from inside lines. Parenthesized entries ignore case.
const PARTIAL_REMOVERS: &[&str] = &[
    "(CONT'D)", "(CONT’D)", "(CONT)", "(V.O.)", "(O.S.)", "(O.C.)", "(pre-lap)",
    "(into phone)", "(then)", "(MORE)",
    "INTERCUT WITH:", "STOCK FOOTAGE", "MATCH TO:", "TRANSITION TO:", "SWIPE TO BLACK.",
    "A CHYRON tells us", "A CHYRON", "FLASH FORWARD", "DREAM STATE",
];

/// Uppercase lines in the character gutter that are never speakers.
const CHARACTER_BLACKLIST: &[&str] = &[
    "REVEAL", "CAMERA", "CLOSE ON", "ANGLE ON", "INSERT", "BACK TO SCENE", "SERIES OF SHOTS",
    "MONTAGE", "END MONTAGE", "SUPER", "TITLE CARD", "LATER", "CONTINUOUS", "SILENCE",
    "BLACK", "BLACKNESS", "DARKNESS", "SNOW",
];

/// Markers that make any line a scene heading.
const SLUGLINE_MARKERS: &[&str] = &[
    "INT.", "EXT.", "I/E", "INT/EXT", "UNDERWATER", "REALITY", "IN HIS MIND", "IN THE",
    "UNDEFINED LOCATION",
];

/// Compiled phrase and pattern lists shared by the filter, classifier and cleaner.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub whole_line_killers: Vec<String>,
    pub dynamic_killers: Vec<Regex>,
    /// Single alternation, longest phrase first.
    pub partial_removers: Option<Regex>,
    pub character_blacklist: HashSet<String>,
    pub slugline_markers: Vec<String>,
}

impl Lexicon {
    pub fn new(extras: &LexiconExtras) -> Result<Self> {
        let whole_line_killers = merge(WHOLE_LINE_KILLERS, &extras.whole_line_killers);

        let dynamic_killers = merge(DYNAMIC_KILLERS, &extras.dynamic_killers)
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i){}", p))
                    .with_context(|| format!("Invalid dynamic killer pattern: {}", p))
            })
            .collect::<Result<Vec<_>>>()?;

        let partial_removers = build_remover(&merge(PARTIAL_REMOVERS, &extras.partial_removers))?;

        let character_blacklist = merge(CHARACTER_BLACKLIST, &extras.character_blacklist)
            .into_iter()
            .collect();

        let slugline_markers = merge(SLUGLINE_MARKERS, &extras.slugline_markers);

        Ok(Lexicon {
            whole_line_killers,
            dynamic_killers,
            partial_removers,
            character_blacklist,
            slugline_markers,
        })
    }

    /// Strip every partial remover phrase from `text`.
    pub fn remove_partials(&self, text: &str) -> String {
        match &self.partial_removers {
            Some(re) => re.replace_all(text, "").into_owned(),
            None => text.to_string(),
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        // built-in patterns are static and known to compile
        Lexicon::new(&LexiconExtras::default()).expect("built-in lexicon compiles")
    }
}

fn merge(defaults: &[&str], extras: &[String]) -> Vec<String> {
    defaults
        .iter()
        .map(|s| s.to_string())
        .chain(extras.iter().cloned())
        .filter(|s| !s.trim().is_empty())
        .unique()
        .collect()
}

/// Longest-first alternation so "A CHYRON tells us" wins over "A CHYRON".
fn build_remover(phrases: &[String]) -> Result<Option<Regex>> {
    if phrases.is_empty() {
        return Ok(None);
    }
    let pattern = phrases
        .iter()
        .sorted_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
        .map(|p| {
            if p.starts_with('(') {
                format!("(?i:{})", regex::escape(p))
            } else {
                regex::escape(p)
            }
        })
        .join("|");
    let re = Regex::new(&pattern).context("Invalid partial remover list")?;
    Ok(Some(re))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compile() {
        let lex = Lexicon::default();
        assert!(!lex.dynamic_killers.is_empty());
        assert!(lex.partial_removers.is_some());
        assert!(lex.character_blacklist.contains("REVEAL"));
    }

    #[test]
    fn extras_are_appended_once() {
        let extras = LexiconExtras {
            whole_line_killers: vec!["Hannibal".into(), "TEASER".into()],
            ..Default::default()
        };
        let lex = Lexicon::new(&extras).unwrap();
        assert_eq!(lex.whole_line_killers.iter().filter(|k| *k == "TEASER").count(), 1);
        assert!(lex.whole_line_killers.iter().any(|k| k == "Hannibal"));
    }

    #[test]
    fn bad_pattern_is_reported() {
        let extras = LexiconExtras {
            dynamic_killers: vec!["(unclosed".into()],
            ..Default::default()
        };
        assert!(Lexicon::new(&extras).is_err());
    }

    #[test]
    fn parenthesized_removers_ignore_case() {
        let lex = Lexicon::default();
        assert_eq!(lex.remove_partials("WILL (cont'd)"), "WILL ");
        assert_eq!(lex.remove_partials("JACK (V.O.)"), "JACK ");
    }

    #[test]
    fn bare_removers_keep_case() {
        let lex = Lexicon::default();
        assert_eq!(lex.remove_partials("STOCK FOOTAGE of a city"), " of a city");
        assert_eq!(lex.remove_partials("the stock footage"), "the stock footage");
    }

    #[test]
    fn longest_phrase_wins() {
        let lex = Lexicon::default();
        assert_eq!(lex.remove_partials("A CHYRON tells us: Baltimore"), ": Baltimore");
    }
}
