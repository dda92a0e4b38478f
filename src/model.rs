use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

static EPISODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)_(\d+)x(\d+)(?:_(.+))?$").unwrap());

pub const START_HEADING: &str = "START";
pub const UNKNOWN: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SceneTime {
    Day,
    Night,
    Morning,
    Evening,
    Dawn,
    Dusk,
    Twilight,
    Predawn,
    Sunset,
    #[default]
    Unknown,
}

impl SceneTime {
    /// Checked in this order; the first whole-word hit wins.
    pub const ALL: [SceneTime; 9] = [
        SceneTime::Day,
        SceneTime::Night,
        SceneTime::Morning,
        SceneTime::Evening,
        SceneTime::Dawn,
        SceneTime::Dusk,
        SceneTime::Twilight,
        SceneTime::Predawn,
        SceneTime::Sunset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SceneTime::Day => "DAY",
            SceneTime::Night => "NIGHT",
            SceneTime::Morning => "MORNING",
            SceneTime::Evening => "EVENING",
            SceneTime::Dawn => "DAWN",
            SceneTime::Dusk => "DUSK",
            SceneTime::Twilight => "TWILIGHT",
            SceneTime::Predawn => "PREDAWN",
            SceneTime::Sunset => "SUNSET",
            SceneTime::Unknown => UNKNOWN,
        }
    }

    pub fn is_valid_label(label: &str) -> bool {
        label == UNKNOWN || SceneTime::ALL.iter().any(|t| t.as_str() == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub is_dream: bool,
    pub is_flashback: bool,
    pub time: SceneTime,
    pub location: String,
    pub pov: Option<String>,
    pub characters_present: Vec<String>,
    pub episode: String,
}

impl SceneMetadata {
    pub fn unknown(episode: &str) -> Self {
        SceneMetadata {
            is_dream: false,
            is_flashback: false,
            time: SceneTime::Unknown,
            location: UNKNOWN.to_string(),
            pov: None,
            characters_present: Vec::new(),
            episode: episode.to_string(),
        }
    }

    /// Record a speaker once, keeping first-appearance order.
    pub fn add_character(&mut self, name: &str) {
        if !name.is_empty() && !self.characters_present.iter().any(|c| c == name) {
            self.characters_present.push(name.to_string());
        }
    }
}

/// One scene of an episode, as written to `<episode>_memory.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub heading: String,
    pub metadata: SceneMetadata,
    pub content: String,
}

impl Scene {
    /// The implicit scene that collects everything before the first slugline.
    pub fn start(episode: &str) -> Self {
        Scene {
            heading: START_HEADING.to_string(),
            metadata: SceneMetadata::unknown(episode),
            content: String::new(),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }
}

/// `Show_SxEE_Title` file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeName {
    pub show: String,
    pub season: u32,
    pub episode: u32,
    pub title: Option<String>,
}

impl EpisodeName {
    pub fn parse(stem: &str) -> Option<EpisodeName> {
        let caps = EPISODE_RE.captures(stem)?;
        Some(EpisodeName {
            show: caps[1].replace('_', " "),
            season: caps[2].parse().ok()?,
            episode: caps[3].parse().ok()?,
            title: caps.get(4).map(|m| m.as_str().replace('_', " ")),
        })
    }

    pub fn code(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

/// Pretty JSON with a four-space indent.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, IngestError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), IngestError> {
    let bytes = to_json(value)?;
    let mut file = fs::File::create(path).map_err(|e| IngestError::io(path, e))?;
    file.write_all(&bytes).map_err(|e| IngestError::io(path, e))?;
    Ok(())
}

pub fn write_scenes(path: &Path, scenes: &[Scene]) -> Result<(), IngestError> {
    write_json(path, scenes)
}

pub fn read_scenes(path: &Path) -> Result<Vec<Scene>, IngestError> {
    let raw = fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_name_convention() {
        let e = EpisodeName::parse("Hannibal_1x01_Aperitif").unwrap();
        assert_eq!(e.show, "Hannibal");
        assert_eq!(e.season, 1);
        assert_eq!(e.episode, 1);
        assert_eq!(e.title.as_deref(), Some("Aperitif"));
        assert_eq!(e.code(), "S01E01");
    }

    #[test]
    fn episode_name_multiword_show_and_title() {
        let e = EpisodeName::parse("Twin_Peaks_2x07_Lonely_Souls").unwrap();
        assert_eq!(e.show, "Twin Peaks");
        assert_eq!(e.season, 2);
        assert_eq!(e.episode, 7);
        assert_eq!(e.title.as_deref(), Some("Lonely Souls"));
    }

    #[test]
    fn episode_name_rejects_other_stems() {
        assert!(EpisodeName::parse("pilot_draft").is_none());
    }

    #[test]
    fn metadata_field_order_and_labels() {
        let scene = Scene {
            heading: START_HEADING.into(),
            metadata: SceneMetadata::unknown("Show_1x01_Pilot"),
            content: "A door opens.".into(),
        };
        let json = String::from_utf8(to_json(&[scene]).unwrap()).unwrap();
        let order = ["\"is_dream\"", "\"is_flashback\"", "\"time\"", "\"location\"", "\"pov\"", "\"characters_present\"", "\"episode\""];
        let positions: Vec<usize> = order.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(json.contains("\"time\": \"UNKNOWN\""));
        assert!(json.contains("\"pov\": null"));
        assert!(json.contains("\n        \"heading\""));
    }

    #[test]
    fn add_character_dedups() {
        let mut meta = SceneMetadata::unknown("ep");
        meta.add_character("WILL");
        meta.add_character("JACK");
        meta.add_character("WILL");
        meta.add_character("");
        assert_eq!(meta.characters_present, vec!["WILL", "JACK"]);
    }

    #[test]
    fn time_labels() {
        assert!(SceneTime::is_valid_label("PREDAWN"));
        assert!(SceneTime::is_valid_label("UNKNOWN"));
        assert!(!SceneTime::is_valid_label("NOON"));
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ep_memory.json");
        let mut meta = SceneMetadata::unknown("ep");
        meta.time = SceneTime::Night;
        let scenes = vec![Scene {
            heading: "INT. KITCHEN - NIGHT".into(),
            metadata: meta,
            content: "WILL: \"Hello.\"".into(),
        }];
        write_scenes(&path, &scenes).unwrap();
        assert_eq!(read_scenes(&path).unwrap(), scenes);
    }
}
