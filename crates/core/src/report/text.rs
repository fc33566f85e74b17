//! WinAnsi encoding and Helvetica metrics for the standard-14 fonts the PDF uses.

const MM_PER_PT: f32 = 25.4 / 72.0;
const FALLBACK_WIDTH: u16 = 556;

// AFM advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// Resource name inside the page's /Font dictionary.
    pub fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }

    fn advance(self, byte: u8) -> u16 {
        let table = match self {
            Font::Regular => &HELVETICA,
            Font::Bold => &HELVETICA_BOLD,
        };
        match byte {
            0x20..=0x7E => table[usize::from(byte - 0x20)],
            _ => FALLBACK_WIDTH,
        }
    }
}

/// Encodes `text` for a WinAnsiEncoding font. Characters the encoding lacks
/// are transliterated where a close glyph exists, otherwise `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' '..='~' => out.push(c as u8),
            '\u{A0}'..='\u{FF}' => out.push(c as u32 as u8),
            '€' => out.push(0x80),
            '…' => out.push(0x85),
            '‘' => out.push(0x91),
            '’' => out.push(0x92),
            '“' => out.push(0x93),
            '”' => out.push(0x94),
            '•' => out.push(0x95),
            '–' => out.push(0x96),
            '—' => out.push(0x97),
            '⚠' => out.push(b'!'),
            '\u{FE00}'..='\u{FE0F}' | '\u{200D}' => {}
            '\t' | '\n' | '\r' => out.push(b' '),
            _ => out.push(b'?'),
        }
    }
    out
}

pub fn width_mm(encoded: &[u8], font: Font, size_pt: f32) -> f32 {
    let units: u32 = encoded.iter().map(|b| u32::from(font.advance(*b))).sum();
    units as f32 / 1000.0 * size_pt * MM_PER_PT
}

/// Greedy word wrap of already-encoded text. Words wider than the line are
/// split between characters.
pub fn wrap(encoded: &[u8], font: Font, size_pt: f32, max_width_mm: f32) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut current: Vec<u8> = Vec::new();

    for word in encoded.split(|b| *b == b' ').filter(|w| !w.is_empty()) {
        let candidate_width = if current.is_empty() {
            width_mm(word, font, size_pt)
        } else {
            width_mm(&current, font, size_pt)
                + width_mm(b" ", font, size_pt)
                + width_mm(word, font, size_pt)
        };

        if candidate_width <= max_width_mm {
            if !current.is_empty() {
                current.push(b' ');
            }
            current.extend_from_slice(word);
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if width_mm(word, font, size_pt) <= max_width_mm {
            current.extend_from_slice(word);
            continue;
        }

        for &b in word {
            let next = width_mm(&current, font, size_pt) + width_mm(&[b], font, size_pt);
            if !current.is_empty() && next > max_width_mm {
                lines.push(std::mem::take(&mut current));
            }
            current.push(b);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
