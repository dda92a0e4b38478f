use std::sync::LazyLock;

use regex::Regex;

use super::Rules;

static NUMBERED_SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s+[A-Z]").unwrap());
static NAME_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:RETRO|NOW)-").unwrap());
static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").unwrap());

/// Uppercase lines starting with these are shot descriptions, not speakers.
const NON_NAME_PREFIXES: &[&str] = &["A ", "THE ", "EXTREME ", "AN "];

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Slugline(String),
    Character(String),
    Dialogue(String),
    Parenthetical(String),
    Action(String),
    Empty,
}

impl Line {
    pub fn label(&self) -> &'static str {
        match self {
            Line::Slugline(_) => "SLUGLINE",
            Line::Character(_) => "CHARACTER",
            Line::Dialogue(_) => "DIALOGUE",
            Line::Parenthetical(_) => "PARENTHETICAL",
            Line::Action(_) => "ACTION",
            Line::Empty => "EMPTY",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Line::Slugline(t)
            | Line::Character(t)
            | Line::Dialogue(t)
            | Line::Parenthetical(t)
            | Line::Action(t) => t,
            Line::Empty => "",
        }
    }
}

/// Classify one layout line by its markers, case and indentation.
///
/// Order matters: sluglines are checked first so indented scene headers are
/// not mistaken for speakers, then the character gutter, then the dialogue
/// gutter. Anything else is action.
pub fn classify_line(raw: &str, rules: &Rules) -> Line {
    let clean = raw.trim();
    if clean.is_empty() {
        return Line::Empty;
    }
    let leading = leading_spaces(raw);
    let t = &rules.thresholds;

    if rules
        .lexicon
        .slugline_markers
        .iter()
        .any(|m| clean.contains(m.as_str()))
    {
        return Line::Slugline(clean.to_string());
    }
    if is_upper(clean) && NUMBERED_SLUG_RE.is_match(clean) {
        return Line::Slugline(clean.to_string());
    }

    if leading >= t.character_indent
        && is_upper(clean)
        && !clean.starts_with('(')
        && !NON_NAME_PREFIXES.iter().any(|p| clean.starts_with(p))
    {
        let name = PAREN_RE.replace_all(clean, "").trim().to_string();
        let base = NAME_PREFIX_RE.replace(&name, "");
        if !rules.lexicon.character_blacklist.contains(base.as_ref())
            && clean.split_whitespace().count() <= t.character_max_words
        {
            return Line::Character(name);
        }
    }

    if leading >= t.dialogue_indent_min && leading < t.dialogue_indent_max {
        if clean.starts_with('(') && clean.ends_with(')') {
            return Line::Parenthetical(clean.to_string());
        }
        return Line::Dialogue(clean.to_string());
    }

    Line::Action(clean.to_string())
}

pub fn leading_spaces(raw: &str) -> usize {
    raw.chars().take_while(|c| c.is_whitespace()).count()
}

/// At least one cased letter and no lowercase ones.
pub fn is_upper(s: &str) -> bool {
    let mut cased = false;
    for c in s.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}
