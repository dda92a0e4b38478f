use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::lexicon::Lexicon;

static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+([.,?!:;])").unwrap());
static CONTRACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\w+)\s*'\s*(s|t|d|ll|re|ve|m)\b").unwrap());
static SPACED_ELLIPSIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.\s\.\s\.").unwrap());
static SPACED_WORD4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-z])\s+([a-z])\s+([a-z])\s+([a-z])\b").unwrap());
static SPACED_WORD3_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-z])\s+([a-z])\s+([a-z])\b").unwrap());
static LIGATURE_F_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([fF]) ([il][a-z]+)").unwrap());
static LIGATURE_TH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([tT]) (h[a-z]*)").unwrap());
static MERGED_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    let starts = "but|and|that|what|this|about|let|if|put|cut|out|got|met|set|at|of|in|on|for|with|by|to|do|go|are|was|were|be|been|have|has|had|can|will|would|could|should|did|does|don't|won't|can't|couldn't|wouldn't|shouldn't|didn't|doesn't|isn't|aren't|wasn't|weren't|haven't|hasn't|hadn't|myself|himself|herself|yourself|themselves|ourselves|thought|think|said|says|ask|asked|tell|told|know|knew|see|saw|seen|look|looked|give|gave|take|took|come|came|just|well|like|make|made|where|when|why|who|how|which|then|than|from";
    let ends = "he's|he|she|it|is|in|if|as|at|him|her|his|have|has|had|an|us|we|my|go";
    Regex::new(&format!(r"(?i)\b({})({})\b", starts, ends)).unwrap()
});
static BRACKETED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").unwrap());
static NAMED_NOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\((?:NOTE|subtitled|on screen|louder|croaking|into phone|sucks teeth|preparing).*?\)").unwrap()
});
static NOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\(NOTE.*?\)").unwrap());
static NOTE_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\(NOTE").unwrap());
static EMPTY_PARENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\s*\)").unwrap());
static MULTI_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static CAMERA_CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:OFF|ON)\s+([A-Z0-9'’.!\-]+(?:\s+[A-Z0-9'’.!\-]+)*)(.*)$").unwrap()
});
static REVEAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^REVEAL\b[\s:,.\-]*(.*)$").unwrap());

/// Real words the merged-pair splitter would otherwise break apart.
const MERGED_EXCEPTIONS: &[&str] = &[
    "within", "beat", "bean", "behave", "goat", "goan", "onus", "forgo", "areas", "canis",
    "cutis", "cutin", "outgo", "wherein", "whereas", "whereat", "lethe", "justin", "putin",
    "willis", "metis", "hasan",
];

/// Normalize one line of extracted text and strip production artifacts.
pub fn clean_text(text: &str, lexicon: &Lexicon) -> String {
    let mut s = text
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\u{fb01}', "fi")
        .replace('\u{fb02}', "fl")
        .replace('\u{fb00}', "ff")
        .replace('\u{fb03}', "ffi")
        .replace('\u{fb04}', "ffl");

    s = SPACE_BEFORE_PUNCT_RE.replace_all(&s, "$1").into_owned();
    s = CONTRACTION_RE.replace_all(&s, "$1'$2").into_owned();
    s = SPACED_ELLIPSIS_RE.replace_all(&s, "...").into_owned();

    // "t h e y" before "t h e" so the longer run is not split
    s = SPACED_WORD4_RE.replace_all(&s, "$1$2$3$4").into_owned();
    s = SPACED_WORD3_RE.replace_all(&s, "$1$2$3").into_owned();
    s = LIGATURE_F_RE.replace_all(&s, "$1$2").into_owned();
    s = LIGATURE_TH_RE.replace_all(&s, "$1$2").into_owned();
    s = split_merged_words(&s);

    s = lexicon.remove_partials(&s);
    s = BRACKETED_RE.replace_all(&s, "").into_owned();
    s = NAMED_NOTE_RE.replace_all(&s, "").into_owned();
    s = NOTE_RE.replace_all(&s, "").into_owned();
    s = EMPTY_PARENS_RE.replace_all(&s, "").into_owned();

    tidy_spacing(&s)
}

/// Speech-level pass run on a speaker's joined lines.
///
/// Bracketed stage directions inserted from parentheticals are kept; only
/// notes that spanned several lines and spacing are fixed here.
pub fn clean_speech(text: &str) -> String {
    let s = NAMED_NOTE_RE.replace_all(text, "");
    let s = NOTE_RE.replace_all(&s, "");
    let s = EMPTY_PARENS_RE.replace_all(&s, "");
    tidy_spacing(&s)
}

fn tidy_spacing(s: &str) -> String {
    let s = MULTI_SPACE_RE.replace_all(s, " ");
    let s = SPACE_BEFORE_PUNCT_RE.replace_all(&s, "$1");
    s.trim().to_string()
}

/// "puther" -> "put her", "couldn'thave" -> "couldn't have".
fn split_merged_words(s: &str) -> String {
    MERGED_WORDS_RE
        .replace_all(s, |caps: &Captures| {
            let whole = &caps[0];
            // goin', lookin': the apostrophe stands for a dropped g
            let end = caps.get(0).map_or(0, |m| m.end());
            if s[end..].starts_with(['\'', '\u{2019}'])
                || MERGED_EXCEPTIONS.contains(&whole.to_lowercase().as_str())
            {
                whole.to_string()
            } else {
                format!("{} {}", &caps[1], &caps[2])
            }
        })
        .into_owned()
}

/// Turn camera focus cues into narrative observations.
///
/// `ON WILL as he turns` -> `[Observation: Will reacts: as he turns]`,
/// `OFF JACK.` -> `[Observation: Focus on Jack]`, `REVEAL the body` -> `We see the body`.
pub fn transform_observation(text: &str) -> String {
    if let Some(caps) = CAMERA_CUE_RE.captures(text) {
        let target = title_case(caps[1].trim().trim_end_matches(['.', '!']));
        let desc = caps[2]
            .trim()
            .trim_matches(|c: char| matches!(c, ',' | '.' | '-' | ' '));
        if desc.is_empty() {
            return format!("[Observation: Focus on {}]", target);
        }
        return format!("[Observation: {} reacts: {}]", target, desc);
    }

    if let Some(caps) = REVEAL_RE.captures(text) {
        let rest = caps[1].trim();
        if !rest.is_empty() {
            return format!("We see {}", rest);
        }
    }
    text.to_string()
}

/// Capitalize each word, lowercase the rest; apostrophes do not start a word.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = !matches!(c, '\'' | '’');
        }
    }
    out
}

/// Drop `(NOTE ...)` blocks, including ones that open on one line and close on a later one.
pub fn clean_scene_content(lines: Vec<String>) -> Vec<String> {
    let mut cleaned = Vec::with_capacity(lines.len());
    let mut in_note = false;

    for line in lines {
        if in_note {
            if let Some((_, after)) = line.split_once(')') {
                in_note = false;
                let after = after.trim();
                if !after.is_empty() {
                    cleaned.push(after.to_string());
                }
            }
            continue;
        }

        if let Some(m) = NOTE_OPEN_RE.find(&line) {
            if line[m.start()..].contains(')') {
                let stripped = NOTE_RE.replace_all(&line, "").trim().to_string();
                if !stripped.is_empty() {
                    cleaned.push(stripped);
                }
            } else {
                in_note = true;
                let before = line[..m.start()].trim();
                if !before.is_empty() {
                    cleaned.push(before.to_string());
                }
            }
            continue;
        }

        cleaned.push(line);
    }

    cleaned
}
