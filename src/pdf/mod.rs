//! Layout-preserving text extraction.
//!
//! Each page's content stream is interpreted into positioned spans, which are
//! then laid onto a character grid: rows by baseline, columns by
//! `(x - left) / x_density`. `left` is the leftmost body text in the document,
//! so action lines start at column 0 and dialogue and cues keep their relative
//! indents, the way `pdftotext -layout` output looks.

mod cmap;
mod content;

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use lopdf::Document;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::settings::LayoutSettings;
use content::Span;

/// Margin scene numbers ("12", "A25", "25B.") sit left of the body text.
static MARGIN_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]?\d+[A-Z]?\.?$").unwrap());

/// Page texts for a `.pdf` or layout `.txt` script.
pub fn extract_pages(path: &Path, layout: &LayoutSettings) -> Result<Vec<String>, IngestError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let pages = match ext.as_deref() {
        Some("pdf") => pdf_pages(path, layout)?,
        Some("txt") => {
            let raw = fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
            split_pages(&raw)
        }
        _ => return Err(IngestError::Unsupported(path.to_path_buf())),
    };

    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(IngestError::NoText(path.to_path_buf()));
    }
    debug!(path = %path.display(), pages = pages.len(), "text extracted");
    Ok(pages)
}

pub fn is_script_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf") || e.eq_ignore_ascii_case("txt"))
}

/// `pdftotext -layout` style text: form feeds separate pages.
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\x0c').map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

fn pdf_pages(path: &Path, layout: &LayoutSettings) -> Result<Vec<String>, IngestError> {
    let doc = Document::load(path).map_err(|source| IngestError::Pdf {
        path: path.to_path_buf(),
        source,
    })?;

    let mut pages = Vec::new();
    for (number, page_id) in doc.get_pages() {
        match content::page_spans(&doc, page_id) {
            Ok(spans) => pages.push(spans),
            Err(e) => {
                warn!(path = %path.display(), page = number, error = %e, "Unreadable page content, skipping");
                pages.push(Vec::new());
            }
        }
    }

    let left = text_left(&pages);
    debug!(path = %path.display(), left, "text left edge");
    Ok(pages
        .into_iter()
        .map(|spans| layout_page(spans, left, layout))
        .collect())
}

/// Smallest x of any non-blank span that is not a margin scene number.
/// Falls back to every span, then to 0.
fn text_left(pages: &[Vec<Span>]) -> f32 {
    let visible = || pages.iter().flatten().filter(|s| !s.text.trim().is_empty());
    let body = visible()
        .filter(|s| !MARGIN_CODE_RE.is_match(s.text.trim()))
        .map(|s| s.x)
        .fold(f32::INFINITY, f32::min);
    let left = if body.is_finite() {
        body
    } else {
        visible().map(|s| s.x).fold(f32::INFINITY, f32::min)
    };
    if left.is_finite() {
        left
    } else {
        0.0
    }
}

/// Place spans on a character grid, top row first.
fn layout_page(mut spans: Vec<Span>, left: f32, layout: &LayoutSettings) -> String {
    spans.retain(|s| !s.text.is_empty());
    if spans.is_empty() {
        return String::new();
    }
    let density = layout.x_density.max(0.1);

    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut rows: Vec<Vec<Span>> = Vec::new();
    let mut row_y = f32::NAN;
    for span in spans {
        match rows.last_mut() {
            Some(row) if (row_y - span.y).abs() <= layout.y_tolerance => row.push(span),
            _ => {
                row_y = span.y;
                rows.push(vec![span]);
            }
        }
    }

    rows.into_iter()
        .map(|row| render_row(row, left, density))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The first span of a row sits at its grid column. Later spans follow the
/// gap on paper: touching pieces join, a word gap becomes one space, and
/// anything wider is padded out to the span's own column.
fn render_row(mut row: Vec<Span>, left: f32, density: f32) -> String {
    row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let mut line = String::new();
    let mut prev_end: Option<f32> = None;

    for span in row {
        match prev_end.map(|end| span.x - end) {
            Some(gap) if gap <= density * 0.5 => {}
            Some(gap) if gap <= density * 2.0 => push_space(&mut line, &span.text),
            _ => {
                let col = ((span.x - left) / density).round().max(0.0) as usize;
                let cursor = line.chars().count();
                if col > cursor {
                    line.extend(std::iter::repeat(' ').take(col - cursor));
                } else if prev_end.is_some() {
                    push_space(&mut line, &span.text);
                }
            }
        }
        line.push_str(&span.text);
        prev_end = Some(span.x + span.width);
    }

    line.trim_end().to_string()
}

fn push_space(line: &mut String, next: &str) {
    if !line.is_empty() && !line.ends_with(' ') && !next.starts_with(' ') {
        line.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{self, Rules};
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn span(text: &str, x: f32, y: f32) -> Span {
        Span {
            text: text.into(),
            x,
            y,
            width: text.chars().count() as f32 * 7.2,
        }
    }

    fn indented(n: usize, text: &str) -> String {
        format!("{}{}", " ".repeat(n), text)
    }

    #[test]
    fn rows_by_baseline_columns_from_text_edge() {
        let spans = vec![
            span("WILL", 266.0, 676.0),
            span("The room is dark.", 108.0, 700.0),
            span("Hello.", 180.0, 664.5),
        ];
        let text = layout_page(spans, 108.0, &LayoutSettings::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "The room is dark.".to_string(),
                indented(32, "WILL"),
                indented(14, "Hello."),
            ]
        );
    }

    #[test]
    fn close_baselines_share_a_row() {
        let spans = vec![span("12", 72.0, 700.0), span("INT. HOUSE - DAY", 108.0, 701.5)];
        let text = layout_page(spans, 72.0, &LayoutSettings::default());
        assert_eq!(text, format!("12{}INT. HOUSE - DAY", " ".repeat(5)));
    }

    #[test]
    fn adjacent_spans_join_without_gap() {
        let spans = vec![span("Hel", 180.0, 600.0), span("lo.", 201.6, 600.0)];
        let text = layout_page(spans, 180.0, &LayoutSettings::default());
        assert_eq!(text, "Hello.");
    }

    #[test]
    fn word_gap_becomes_one_space() {
        let spans = vec![span("Hello", 180.0, 600.0), span("there.", 223.2, 600.0)];
        let text = layout_page(spans, 108.0, &LayoutSettings::default());
        assert_eq!(text, indented(14, "Hello there."));
    }

    #[test]
    fn text_left_skips_margin_scene_numbers() {
        let pages = vec![
            vec![span("12", 72.0, 700.0), span("INT. HOUSE - DAY", 108.0, 700.0)],
            vec![span("WILL", 266.0, 600.0), span("A25.", 540.0, 700.0)],
        ];
        assert_eq!(text_left(&pages), 108.0);
        assert_eq!(text_left(&[vec![span("12", 72.0, 700.0)]]), 72.0);
        assert_eq!(text_left(&[]), 0.0);
    }

    #[test]
    fn form_feeds_split_pages() {
        let pages = split_pages("page one\n\x0cpage two\n\x0c");
        assert_eq!(pages, vec!["page one\n".to_string(), "page two\n".to_string()]);
    }

    fn at(x: i64, y: i64) -> Operation {
        Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(x),
                Object::Integer(y),
            ],
        )
    }

    fn tj(text: &str) -> Operation {
        Operation::new("Tj", vec![Object::string_literal(text)])
    }

    /// One Courier 12pt page; `body` runs inside BT/ET.
    fn write_pdf(path: &Path, body: Vec<Operation>) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
        ];
        operations.extend(body);
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn extracts_indented_lines_from_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Show_1x01_Pilot.pdf");
        write_pdf(
            &path,
            vec![
                at(108, 700),
                tj("The room is dark."),
                at(266, 676),
                tj("WILL"),
                at(180, 664),
                Operation::new(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal("Hel"),
                        Object::Integer(0),
                        Object::string_literal("lo."),
                    ])],
                ),
            ],
        );

        let pages = extract_pages(&path, &LayoutSettings::default()).unwrap();
        assert_eq!(pages.len(), 1);
        let lines: Vec<&str> = pages[0].lines().collect();
        assert_eq!(
            lines,
            vec![
                "The room is dark.".to_string(),
                indented(32, "WILL"),
                indented(14, "Hello."),
            ]
        );
    }

    #[test]
    fn action_after_speech_is_not_dialogue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Show_1x01_Pilot.pdf");
        write_pdf(
            &path,
            vec![
                at(72, 720),
                tj("4"),
                at(108, 720),
                tj("INT. KITCHEN - NIGHT"),
                at(266, 690),
                tj("WILL"),
                at(180, 678),
                tj("Hello there."),
                at(108, 654),
                tj("He pours the tea."),
                at(108, 630),
                tj("ON WILL as he turns."),
            ],
        );

        let pages = extract_pages(&path, &LayoutSettings::default()).unwrap();
        let scenes = parser::parse_script(&pages, "Show_1x01_Pilot", &Rules::default());
        let kitchen = scenes
            .iter()
            .find(|s| s.heading == "INT. KITCHEN - NIGHT")
            .unwrap();
        let lines: Vec<&str> = kitchen.lines().collect();
        assert_eq!(
            lines,
            vec![
                "WILL: \"Hello there.\"",
                "He pours the tea.",
                "[Observation: Will reacts: as he turns]",
            ]
        );
    }

    #[test]
    fn text_input_and_errors() {
        let dir = tempfile::tempdir().unwrap();

        let txt = dir.path().join("ep.txt");
        fs::write(&txt, "INT. HOUSE - DAY\n\x0cHe waits.\n").unwrap();
        assert_eq!(extract_pages(&txt, &LayoutSettings::default()).unwrap().len(), 2);

        let blank = dir.path().join("blank.txt");
        fs::write(&blank, "   \n\x0c\n").unwrap();
        assert!(matches!(
            extract_pages(&blank, &LayoutSettings::default()),
            Err(IngestError::NoText(_))
        ));

        let doc = dir.path().join("notes.docx");
        fs::write(&doc, "x").unwrap();
        assert!(matches!(
            extract_pages(&doc, &LayoutSettings::default()),
            Err(IngestError::Unsupported(_))
        ));

        let broken = dir.path().join("broken.pdf");
        fs::write(&broken, "not a pdf").unwrap();
        assert!(matches!(
            extract_pages(&broken, &LayoutSettings::default()),
            Err(IngestError::Pdf { .. })
        ));
    }

    #[test]
    fn script_extensions() {
        assert!(is_script_file(Path::new("a/Show_1x01.PDF")));
        assert!(is_script_file(Path::new("Show_1x01.txt")));
        assert!(!is_script_file(Path::new("Show_1x01_memory.json")));
    }
}
