use crate::lexicon::Lexicon;
use crate::model::{Scene, SceneMetadata};

use super::clean::{clean_scene_content, clean_speech, clean_text, transform_observation};
use super::lines::Line;
use super::slugline::{clean_heading, extract_metadata};

/// Folds classified lines into scenes.
///
/// Everything before the first slugline lands in a `START` scene. Dialogue is
/// buffered per speaker and written out as `SPEAKER: "speech"` when the next
/// non-dialogue line arrives.
pub struct SceneBuilder<'a> {
    lexicon: &'a Lexicon,
    episode: String,
    scenes: Vec<Scene>,
    current: Scene,
    content: Vec<String>,
    speaker: Option<String>,
    speech: Vec<String>,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(episode: &str, lexicon: &'a Lexicon) -> Self {
        SceneBuilder {
            lexicon,
            episode: episode.to_string(),
            scenes: Vec::new(),
            current: Scene::start(episode),
            content: Vec::new(),
            speaker: None,
            speech: Vec::new(),
        }
    }

    pub fn push(&mut self, line: Line) {
        match line {
            Line::Slugline(text) => {
                self.flush_dialogue();
                self.close_scene();
                let heading = clean_heading(&text);
                self.current = Scene {
                    metadata: extract_metadata(&heading, &self.episode),
                    heading,
                    content: String::new(),
                };
            }
            Line::Character(name) => {
                self.flush_dialogue();
                let name = clean_text(&name, self.lexicon);
                if !name.is_empty() {
                    self.current.metadata.add_character(&name);
                    self.speaker = Some(name);
                }
            }
            Line::Dialogue(text) => {
                let text = clean_text(&text, self.lexicon);
                if self.speaker.is_some() {
                    self.speech.push(text);
                } else if !text.is_empty() {
                    // orphan dialogue: title cards, indented action
                    self.content.push(text);
                }
            }
            Line::Parenthetical(text) => {
                let text = clean_text(&text, self.lexicon);
                let direction = text.trim_matches(|c| c == '(' || c == ')').trim().to_lowercase();
                if self.speaker.is_some() && !direction.is_empty() {
                    self.speech.push(format!("[{}]", direction));
                }
            }
            Line::Action(text) => {
                self.flush_dialogue();
                let action = transform_observation(&clean_text(&text, self.lexicon));
                if !action.is_empty() {
                    self.content.push(action);
                }
            }
            Line::Empty => {}
        }
    }

    pub fn finish(mut self) -> Vec<Scene> {
        self.flush_dialogue();
        self.close_scene();
        self.scenes
    }

    fn flush_dialogue(&mut self) {
        let speech = std::mem::take(&mut self.speech);
        let Some(speaker) = self.speaker.take() else {
            return;
        };
        let speech = clean_speech(&speech.join(" "));
        if !speech.is_empty() {
            self.content.push(format!("{}: \"{}\"", speaker, speech));
        }
    }

    fn close_scene(&mut self) {
        let lines = clean_scene_content(std::mem::take(&mut self.content));
        let lines: Vec<String> = lines.into_iter().filter(|l| !l.trim().is_empty()).collect();
        let next = Scene {
            heading: String::new(),
            metadata: SceneMetadata::unknown(&self.episode),
            content: String::new(),
        };
        let mut scene = std::mem::replace(&mut self.current, next);
        if lines.is_empty() {
            return;
        }
        scene.content = lines.join("\n");
        self.scenes.push(scene);
    }
}
