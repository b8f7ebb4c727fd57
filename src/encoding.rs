//! Single-byte code pages found in MiraMon files.
//!
//! REL sidecars are written in Windows-1252, DBF tables in ISO 8859-1, the
//! DOS code page 850 or UTF-8 depending on their language driver byte.

/// Code page of a byte string.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CodePage {
    Windows1252,
    Latin1,
    Oem850,
    Utf8,
}

impl CodePage {
    /// Decode `bytes` to a `String`.
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            CodePage::Windows1252 => bytes.iter().map(|&b| cp1252_char(b)).collect(),
            CodePage::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            CodePage::Oem850 => bytes.iter().map(|&b| cp850_char(b)).collect(),
            CodePage::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

// 0x80..=0x9F. Unassigned positions keep their C1 code point.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

fn cp1252_char(b: u8) -> char {
    match b {
        0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

// 0x80..=0xFF
const CP850_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', 'ø', '£', 'Ø', '×', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '®', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', 'Á', 'Â', 'À', '©', '╣', '║', '╗', '╝', '¢', '¥', '┐', //
    '└', '┴', '┬', '├', '─', '┼', 'ã', 'Ã', '╚', '╔', '╩', '╦', '╠', '═', '╬', '¤', //
    'ð', 'Ð', 'Ê', 'Ë', 'È', 'ı', 'Í', 'Î', 'Ï', '┘', '┌', '█', '▄', '¦', 'Ì', '▀', //
    'Ó', 'ß', 'Ô', 'Ò', 'õ', 'Õ', 'µ', 'þ', 'Þ', 'Ú', 'Û', 'Ù', 'ý', 'Ý', '¯', '´', //
    '\u{AD}', '±', '‗', '¾', '¶', '§', '÷', '¸', '°', '¨', '·', '¹', '³', '²', '■', '\u{A0}',
];

fn cp850_char(b: u8) -> char {
    if b < 0x80 {
        b as char
    } else {
        CP850_HIGH[(b - 0x80) as usize]
    }
}
