use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::cmap::{win_ansi, CMap};

/// Glyph width in thousandths of text space when the font gives none (Courier).
const DEFAULT_WIDTH: f32 = 600.0;
/// Parent chain depth before inherited attribute lookup gives up.
const MAX_TREE_DEPTH: usize = 32;

/// One shown string, positioned in device space.
#[derive(Debug, Clone)]
pub struct Span {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

/// Row-vector affine matrix `[a b c d e f]`, as used by `cm` and `Tm`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        let vals: Vec<f32> = operands.iter().take(6).filter_map(number).collect();
        let arr: [f32; 6] = vals.try_into().ok()?;
        Some(Matrix(arr))
    }

    /// `self × other`
    fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    /// `translate(tx, ty) × self`
    fn translate(&self, tx: f32, ty: f32) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        Matrix([a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f])
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (x * a + y * c + e, x * b + y * d + f)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Font {
    to_unicode: Option<CMap>,
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
}

impl Font {
    fn from_dict(doc: &Document, dict: &Dictionary) -> Font {
        let two_byte = dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|n| n == b"Type0");

        let to_unicode = dict.get(b"ToUnicode").ok().and_then(|o| match resolve(doc, o) {
            Object::Stream(stream) => {
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                Some(CMap::parse(&data)).filter(|c| !c.is_empty())
            }
            _ => None,
        });

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(number)
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .map(|arr| arr.iter().map(|w| number(resolve(doc, w)).unwrap_or(0.0)).collect())
            .unwrap_or_default();

        Font {
            to_unicode,
            two_byte,
            first_char,
            widths,
        }
    }

    fn code_len(&self) -> usize {
        if self.two_byte {
            return 2;
        }
        self.to_unicode.as_ref().map_or(1, |c| c.code_len)
    }

    /// Split a string operand into `(code, text)` pairs.
    fn decode(&self, bytes: &[u8]) -> Vec<(u32, String)> {
        let len = self.code_len();
        bytes
            .chunks(len)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
                let mapped = self.to_unicode.as_ref().and_then(|c| c.get(code));
                let text = match mapped {
                    Some(t) => t.to_string(),
                    None if len == 1 => win_ansi(code as u8).map(String::from).unwrap_or_default(),
                    None => String::new(),
                };
                (code, text)
            })
            .collect()
    }

    fn width(&self, code: u32) -> f32 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_WIDTH)
    }
}

/// State saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Vec<u8>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            ctm: Matrix::IDENTITY,
            font: Vec::new(),
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct Interpreter {
    fonts: BTreeMap<Vec<u8>, Font>,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    spans: Vec<Span>,
}

impl Interpreter {
    fn new(fonts: BTreeMap<Vec<u8>, Font>) -> Self {
        Interpreter {
            fonts,
            gs: GraphicsState::default(),
            stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            spans: Vec::new(),
        }
    }

    fn run(&mut self, content: &Content) {
        for op in &content.operations {
            let ops = &op.operands;
            let n = |i: usize| ops.get(i).and_then(number);
            match op.operator.as_str() {
                "q" => self.stack.push(self.gs.clone()),
                "Q" => {
                    if let Some(gs) = self.stack.pop() {
                        self.gs = gs;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(ops) {
                        self.gs.ctm = m.then(&self.gs.ctm);
                    }
                }
                "BT" => {
                    self.tm = Matrix::IDENTITY;
                    self.tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some(Object::Name(name)) = ops.first() {
                        self.gs.font = name.clone();
                    }
                    if let Some(size) = n(1) {
                        self.gs.size = size;
                    }
                }
                "Tc" => self.gs.char_spacing = n(0).unwrap_or(0.0),
                "Tw" => self.gs.word_spacing = n(0).unwrap_or(0.0),
                "Tz" => self.gs.scale = n(0).unwrap_or(100.0) / 100.0,
                "TL" => self.gs.leading = n(0).unwrap_or(0.0),
                "Ts" => self.gs.rise = n(0).unwrap_or(0.0),
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(ops) {
                        self.tm = m;
                        self.tlm = m;
                    }
                }
                "Td" => self.next_line(n(0).unwrap_or(0.0), n(1).unwrap_or(0.0)),
                "TD" => {
                    let ty = n(1).unwrap_or(0.0);
                    self.gs.leading = -ty;
                    self.next_line(n(0).unwrap_or(0.0), ty);
                }
                "T*" => self.next_line(0.0, -self.gs.leading),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = ops.first() {
                        self.show(bytes);
                    }
                }
                "'" => {
                    self.next_line(0.0, -self.gs.leading);
                    if let Some(Object::String(bytes, _)) = ops.first() {
                        self.show(bytes);
                    }
                }
                "\"" => {
                    self.gs.word_spacing = n(0).unwrap_or(self.gs.word_spacing);
                    self.gs.char_spacing = n(1).unwrap_or(self.gs.char_spacing);
                    self.next_line(0.0, -self.gs.leading);
                    if let Some(Object::String(bytes, _)) = ops.get(2) {
                        self.show(bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = ops.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(bytes),
                                other => {
                                    if let Some(adj) = number(other) {
                                        let tx = -adj / 1000.0 * self.gs.size * self.gs.scale;
                                        self.tm = self.tm.translate(tx, 0.0);
                                    }
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.tlm = self.tlm.translate(tx, ty);
        self.tm = self.tlm;
    }

    fn origin(&self) -> (f32, f32) {
        self.tm.then(&self.gs.ctm).apply(0.0, self.gs.rise)
    }

    fn show(&mut self, bytes: &[u8]) {
        let font = self.fonts.get(&self.gs.font).cloned().unwrap_or_default();
        let single_byte = font.code_len() == 1;
        let (x, y) = self.origin();
        let mut text = String::new();

        for (code, glyph) in font.decode(bytes) {
            text.push_str(&glyph);
            let mut advance = font.width(code) / 1000.0 * self.gs.size + self.gs.char_spacing;
            if single_byte && code == 32 {
                advance += self.gs.word_spacing;
            }
            self.tm = self.tm.translate(advance * self.gs.scale, 0.0);
        }

        if text.is_empty() {
            return;
        }
        let (end_x, _) = self.origin();
        self.spans.push(Span {
            text,
            x,
            y,
            width: end_x - x,
        });
    }
}

/// Interpret one page's content stream into positioned spans.
pub fn page_spans(doc: &Document, page_id: ObjectId) -> Result<Vec<Span>, lopdf::Error> {
    let data = doc.get_page_content(page_id)?;
    let content = Content::decode(&data)?;
    let mut interp = Interpreter::new(page_fonts(doc, page_id));
    interp.run(&content);
    Ok(interp.spans)
}

fn page_fonts(doc: &Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, Font> {
    let mut fonts = BTreeMap::new();
    let Some(resources) = inherited(doc, page_id, b"Resources").and_then(|o| o.as_dict().ok()) else {
        return fonts;
    };
    let Some(font_dict) = resources
        .get(b"Font")
        .ok()
        .and_then(|o| resolve(doc, o).as_dict().ok())
    else {
        return fonts;
    };
    for (name, obj) in font_dict.iter() {
        if let Ok(dict) = resolve(doc, obj).as_dict() {
            fonts.insert(name.clone(), Font::from_dict(doc, dict));
        }
    }
    fonts
}

/// Page attribute lookup that walks up the page tree.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(obj) = dict.get(key) {
            return Some(resolve(doc, obj));
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f as f32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_translate_then_scale() {
        let ctm = Matrix([2.0, 0.0, 0.0, 2.0, 10.0, 20.0]);
        let tm = Matrix::IDENTITY.translate(5.0, 7.0);
        assert_eq!(tm.then(&ctm).apply(0.0, 0.0), (20.0, 34.0));
    }

    #[test]
    fn font_defaults_to_courier_width() {
        let font = Font::default();
        assert_eq!(font.width(65), DEFAULT_WIDTH);
        let decoded = font.decode(b"Hi");
        assert_eq!(decoded, vec![(72, "H".to_string()), (105, "i".to_string())]);
    }

    #[test]
    fn widths_table_offsets_by_first_char() {
        let font = Font {
            first_char: 32,
            widths: vec![250.0, 333.0],
            ..Font::default()
        };
        assert_eq!(font.width(33), 333.0);
        assert_eq!(font.width(90), DEFAULT_WIDTH);
    }
}
