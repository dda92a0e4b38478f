use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static CODESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"begincodespacerange\s*<([0-9A-Fa-f]+)>").unwrap());
static BFCHAR_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)beginbfchar(.*?)endbfchar").unwrap());
static BFRANGE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)beginbfrange(.*?)endbfrange").unwrap());
static PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]*)>").unwrap());
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(?:<([0-9A-Fa-f]*)>|\[([^\]]*)\])").unwrap()
});
static HEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([0-9A-Fa-f]*)>").unwrap());

/// Upper bound on codes expanded from one bfrange entry.
const MAX_RANGE: u32 = 0xFFFF;

/// A font's `ToUnicode` map: character code to text.
#[derive(Debug, Clone, Default)]
pub struct CMap {
    /// Bytes per character code.
    pub code_len: usize,
    map: HashMap<u32, String>,
}

impl CMap {
    pub fn parse(data: &[u8]) -> CMap {
        let text = String::from_utf8_lossy(data);
        let mut map = HashMap::new();

        for block in BFCHAR_BLOCK_RE.captures_iter(&text) {
            for pair in PAIR_RE.captures_iter(&block[1]) {
                if let Some(code) = hex_code(&pair[1]) {
                    map.insert(code, utf16_hex(&pair[2]));
                }
            }
        }

        for block in BFRANGE_BLOCK_RE.captures_iter(&text) {
            for range in RANGE_RE.captures_iter(&block[1]) {
                let (Some(lo), Some(hi)) = (hex_code(&range[1]), hex_code(&range[2])) else {
                    continue;
                };
                if hi < lo || hi - lo > MAX_RANGE {
                    continue;
                }
                if let Some(dst) = range.get(3) {
                    let base = hex_bytes(dst.as_str());
                    for (offset, code) in (lo..=hi).enumerate() {
                        map.insert(code, utf16(&bump_last_unit(&base, offset as u32)));
                    }
                } else if let Some(list) = range.get(4) {
                    for (code, item) in (lo..=hi).zip(HEX_RE.captures_iter(list.as_str())) {
                        map.insert(code, utf16_hex(&item[1]));
                    }
                }
            }
        }

        let code_len = CODESPACE_RE
            .captures(&text)
            .map(|c| c[1].len() / 2)
            .or_else(|| {
                let block = BFCHAR_BLOCK_RE.captures(&text)?;
                let first = PAIR_RE.captures(&block[1])?;
                Some(first[1].len() / 2)
            })
            .unwrap_or(1)
            .max(1);

        CMap { code_len, map }
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn hex_code(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 8 {
        return None;
    }
    u32::from_str_radix(s, 16).ok()
}

fn hex_bytes(s: &str) -> Vec<u8> {
    let mut digits: Vec<u8> = s.bytes().collect();
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    digits
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .filter_map(|pair| u8::from_str_radix(pair, 16).ok())
        .collect()
}

fn utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|c| match c {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [b] => *b as u16,
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}

fn utf16_hex(s: &str) -> String {
    utf16(&hex_bytes(s))
}

fn bump_last_unit(base: &[u8], offset: u32) -> Vec<u8> {
    let mut out = base.to_vec();
    if out.len() >= 2 {
        let n = out.len();
        let unit = u16::from_be_bytes([out[n - 2], out[n - 1]]).wrapping_add(offset as u16);
        out[n - 2..].copy_from_slice(&unit.to_be_bytes());
    } else if let Some(last) = out.last_mut() {
        *last = last.wrapping_add(offset as u8);
    }
    out
}

/// Single-byte fallback when a simple font has no `ToUnicode` map.
pub fn win_ansi(byte: u8) -> Option<char> {
    let c = match byte {
        0x20..=0x7E => byte as char,
        0x80 => '€',
        0x85 => '…',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0xA0..=0xFF => byte as char,
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
1 begincodespacerange
<00> <FF>
endcodespacerange
2 beginbfchar
<20> <0020>
<41> <0041>
endbfchar
1 beginbfrange
<61> <63> <0061>
endbfrange
endcmap";

    #[test]
    fn bfchar_and_incrementing_range() {
        let cmap = CMap::parse(SIMPLE.as_bytes());
        assert_eq!(cmap.code_len, 1);
        assert_eq!(cmap.get(0x41), Some("A"));
        assert_eq!(cmap.get(0x61), Some("a"));
        assert_eq!(cmap.get(0x63), Some("c"));
        assert_eq!(cmap.get(0x64), None);
        assert_eq!(cmap.get(0x62), Some("b"));
    }

    #[test]
    fn two_byte_codes_and_array_ranges() {
        let data = "begincodespacerange <0000> <FFFF> endcodespacerange
beginbfrange
<0010> <0011> [<0057> <FB01>]
endbfrange";
        let cmap = CMap::parse(data.as_bytes());
        assert_eq!(cmap.code_len, 2);
        assert_eq!(cmap.get(0x10), Some("W"));
        assert_eq!(cmap.get(0x11), Some("\u{fb01}"));
    }

    #[test]
    fn code_length_from_bfchar_when_no_codespace() {
        let cmap = CMap::parse(b"beginbfchar <0003> <0020> endbfchar");
        assert_eq!(cmap.code_len, 2);
        assert_eq!(cmap.get(3), Some(" "));
    }

    #[test]
    fn garbage_is_empty() {
        let cmap = CMap::parse(b"not a cmap");
        assert!(cmap.is_empty());
        assert_eq!(cmap.code_len, 1);
    }

    #[test]
    fn win_ansi_quotes() {
        assert_eq!(win_ansi(b'A'), Some('A'));
        assert_eq!(win_ansi(0x92), Some('\u{2019}'));
        assert_eq!(win_ansi(0x07), None);
    }
}
