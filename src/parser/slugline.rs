use std::sync::LazyLock;

use regex::Regex;

use crate::model::{SceneMetadata, SceneTime, UNKNOWN};

static LEADING_NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]*\d+[A-Z]*\s+").unwrap());
static TRAILING_NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[A-Z]*\d+[A-Z]*\.?$").unwrap());
static INT_EXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:INT\.?\s*/\s*EXT\.?|EXT\.?\s*/\s*INT\.?|I/E\.?|INT\.|EXT\.)\s*").unwrap()
});
static TIME_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-\s*\b(?:DAY|NIGHT|MORNING|EVENING|DAWN|DUSK|TWILIGHT|PREDAWN|SUNSET)\b").unwrap()
});
static CONTINUITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*-?\s*\b(?:THE NEXT MORNING|MOMENTS LATER|SAME TIME|NEXT DAY|CONTINUOUS|RESUMING|PRESENT|FLASHBACK|TWILIGHT|LATER)\b").unwrap()
});
static EMPTY_PARENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\s*\)").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static TIME_RES: LazyLock<Vec<(SceneTime, Regex)>> = LazyLock::new(|| {
    SceneTime::ALL
        .iter()
        .map(|t| (*t, Regex::new(&format!(r"\b{}\b", t.as_str())).unwrap()))
        .collect()
});

const DREAM_MARKERS: &[&str] = &["DREAM", "NIGHTMARE", "HALLUCINATION", "DREAMSCAPE", "FEVERISH", "IN HIS MIND"];
const FLASHBACK_MARKERS: &[&str] = &["FLASHBACK", "MEMORY", "EARLIER", "YEARS LATER"];
const POV_MARKERS: &[&str] = &["POV", "POINT OF VIEW", "THROUGH THE EYES"];
pub const POV_LABEL: &str = "Specific POV";

/// Strip margin scene numbers: `12  INT. KITCHEN - NIGHT  12` -> `INT. KITCHEN - NIGHT`.
pub fn clean_heading(raw: &str) -> String {
    let s = LEADING_NUM_RE.replace(raw.trim(), "");
    let s = TRAILING_NUM_RE.replace(s.trim(), "");
    s.trim().to_string()
}

/// Derive scene metadata from a cleaned heading. Speakers are filled in later.
pub fn extract_metadata(heading: &str, episode: &str) -> SceneMetadata {
    let upper = heading.to_uppercase();

    let time = TIME_RES
        .iter()
        .find(|(_, re)| re.is_match(&upper))
        .map(|(t, _)| *t)
        .unwrap_or(SceneTime::Unknown);

    SceneMetadata {
        is_dream: DREAM_MARKERS.iter().any(|m| upper.contains(m)),
        is_flashback: FLASHBACK_MARKERS.iter().any(|m| upper.contains(m)),
        time,
        location: extract_location(&upper),
        pov: POV_MARKERS
            .iter()
            .any(|m| upper.contains(m))
            .then(|| POV_LABEL.to_string()),
        characters_present: Vec::new(),
        episode: episode.to_string(),
    }
}

fn extract_location(upper: &str) -> String {
    let loc = LEADING_NUM_RE.replace(upper, "");
    let loc = TRAILING_NUM_RE.replace(&loc, "");
    let loc = INT_EXT_RE.replace(&loc, "");
    let loc = TIME_SUFFIX_RE.replace_all(&loc, "");
    let loc = CONTINUITY_RE.replace_all(&loc, "");
    let loc = EMPTY_PARENS_RE.replace_all(&loc, "");
    let loc = SPACES_RE.replace_all(&loc, " ");
    let loc = loc.trim_matches(|c: char| c == ' ' || c == '-');
    if loc.is_empty() {
        UNKNOWN.to_string()
    } else {
        loc.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_numbers_stripped() {
        assert_eq!(clean_heading("12   INT. KITCHEN - NIGHT   12"), "INT. KITCHEN - NIGHT");
        assert_eq!(clean_heading("A25 EXT. ROAD - DAY A25"), "EXT. ROAD - DAY");
        assert_eq!(clean_heading("INT. KITCHEN - NIGHT"), "INT. KITCHEN - NIGHT");
    }

    #[test]
    fn basic_interior() {
        let m = extract_metadata("INT. BALTIMORE STATE HOSPITAL - CELL - NIGHT", "ep");
        assert_eq!(m.time, SceneTime::Night);
        assert_eq!(m.location, "BALTIMORE STATE HOSPITAL - CELL");
        assert!(!m.is_dream);
        assert!(!m.is_flashback);
        assert_eq!(m.pov, None);
        assert_eq!(m.episode, "ep");
    }

    #[test]
    fn flashback_suffix() {
        let m = extract_metadata("EXT. WOLF TRAP, VIRGINIA - WILL'S HOUSE - DAWN (FLASHBACK)", "ep");
        assert!(m.is_flashback);
        assert_eq!(m.time, SceneTime::Dawn);
        assert_eq!(m.location, "WOLF TRAP, VIRGINIA - WILL'S HOUSE");
    }

    #[test]
    fn dream_and_pov() {
        let m = extract_metadata("INT. WILL'S MIND - DREAMSCAPE", "ep");
        assert!(m.is_dream);
        assert_eq!(m.time, SceneTime::Unknown);

        let m = extract_metadata("EXT. FOREST - WILL'S POV - NIGHT", "ep");
        assert_eq!(m.pov.as_deref(), Some(POV_LABEL));
        assert_eq!(m.time, SceneTime::Night);
    }

    #[test]
    fn combined_prefixes() {
        assert_eq!(extract_metadata("I/E JACK'S CAR - MOVING - DAY", "ep").location, "JACK'S CAR - MOVING");
        assert_eq!(extract_metadata("INT./EXT. FBI ACADEMY - DAY", "ep").location, "FBI ACADEMY");
    }

    #[test]
    fn continuity_words_removed() {
        let m = extract_metadata("INT. KITCHEN - MOMENTS LATER", "ep");
        assert_eq!(m.time, SceneTime::Unknown);
        assert_eq!(m.location, "KITCHEN");
    }

    #[test]
    fn lowercase_heading_is_normalized() {
        let m = extract_metadata("int. kitchen - day", "ep");
        assert_eq!(m.time, SceneTime::Day);
        assert_eq!(m.location, "KITCHEN");
    }

    #[test]
    fn nothing_left_is_unknown() {
        assert_eq!(extract_metadata("INT. - NIGHT", "ep").location, UNKNOWN);
    }
}
