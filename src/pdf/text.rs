//! WinAnsi encoding and greedy line breaking for the document engine.
//!
//! The standard PDF fonts are used with `WinAnsiEncoding`, so text is written
//! as single bytes. Characters outside that code page become `?`.

use crate::metrics;
use crate::style::{FontFamily, FontSpec};

/// Average glyph width (in em) assumed for faces without a width table.
const FALLBACK_EM: f32 = 0.5;

/// Encode `s` as Windows-1252 bytes.
pub fn encode_win_ansi(s: &str) -> Vec<u8> {
    s.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => code as u8,
        _ => match c {
            '\t' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        },
    }
}

/// Width of `s` in points, falling back to an average glyph width for
/// faces without a bundled table.
pub fn text_width(s: &str, font: &FontSpec) -> f32 {
    metrics::string_width(s, font).unwrap_or_else(|| {
        let em = match font.family {
            FontFamily::Courier => 0.6,
            _ => FALLBACK_EM,
        };
        s.chars().count() as f32 * em * font.size
    })
}

// ── Line breaking ────────────────────────────────────────────────────────

/// A run of text set in one font on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub font: FontSpec,
    pub width: f32,
}

/// One laid-out line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    pub width: f32,
    /// Largest leading among the fonts that contributed to the line.
    pub leading: f32,
    /// Largest font size on the line.
    pub max_size: f32,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.fragments.iter().all(|f| f.text.trim().is_empty())
    }

    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
enum Token {
    Word(String, FontSpec),
    Space(FontSpec),
    Newline(FontSpec),
}

/// Breaks a sequence of styled runs into lines one at a time.
///
/// The caller supplies the width of each line as it asks for it, so lines
/// beside a floating image can be narrower than the rest.
#[derive(Debug)]
pub struct LineBreaker {
    tokens: Vec<Token>,
    pos: usize,
    trailing_empty: bool,
}

impl LineBreaker {
    pub fn new<'a>(runs: impl IntoIterator<Item = (&'a str, FontSpec)>) -> Self {
        let mut tokens = Vec::new();
        for (text, font) in runs {
            let mut word = String::new();
            for c in text.chars() {
                match c {
                    '\n' => {
                        flush_word(&mut word, font, &mut tokens);
                        tokens.push(Token::Newline(font));
                    }
                    c if c.is_whitespace() => {
                        flush_word(&mut word, font, &mut tokens);
                        tokens.push(Token::Space(font));
                    }
                    c => word.push(c),
                }
            }
            flush_word(&mut word, font, &mut tokens);
        }
        Self {
            tokens,
            pos: 0,
            trailing_empty: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.tokens.len() && !self.trailing_empty
    }

    /// Produce the next line no wider than `max_width`.
    ///
    /// A word wider than a whole line is split between characters. Returns
    /// `None` once every token has been consumed.
    pub fn next_line(&mut self, max_width: f32) -> Option<Line> {
        if self.pos >= self.tokens.len() {
            if self.trailing_empty {
                self.trailing_empty = false;
                return Some(Line {
                    fragments: Vec::new(),
                    width: 0.0,
                    leading: self.last_font().map(|f| f.leading()).unwrap_or(0.0),
                    max_size: self.last_font().map(|f| f.size).unwrap_or(0.0),
                });
            }
            return None;
        }

        let mut builder = LineBuilder::default();
        while self.pos < self.tokens.len() {
            match &self.tokens[self.pos] {
                Token::Newline(font) => {
                    builder.touch(font);
                    self.pos += 1;
                    if self.pos == self.tokens.len() {
                        self.trailing_empty = true;
                    }
                    break;
                }
                Token::Space(font) => {
                    builder.touch(font);
                    if !builder.is_empty() {
                        builder.pending_space = Some(*font);
                    }
                    self.pos += 1;
                }
                Token::Word(word, font) => {
                    let word_width = text_width(word, font);
                    let space_width = builder
                        .pending_space
                        .map(|f| text_width(" ", &f))
                        .unwrap_or(0.0);
                    if builder.width + space_width + word_width <= max_width {
                        builder.push_word(word, *font, word_width);
                        self.pos += 1;
                    } else if builder.is_empty() {
                        let (head, tail) = split_to_width(word, font, max_width);
                        let head_width = text_width(&head, font);
                        builder.push_word(&head, *font, head_width);
                        match tail {
                            Some(rest) => self.tokens[self.pos] = Token::Word(rest, *font),
                            None => self.pos += 1,
                        }
                        break;
                    } else {
                        break;
                    }
                }
            }
        }
        Some(builder.finish())
    }

    fn last_font(&self) -> Option<FontSpec> {
        self.tokens.last().map(|t| match t {
            Token::Word(_, f) | Token::Space(f) | Token::Newline(f) => *f,
        })
    }
}

fn flush_word(word: &mut String, font: FontSpec, tokens: &mut Vec<Token>) {
    if !word.is_empty() {
        tokens.push(Token::Word(std::mem::take(word), font));
    }
}

/// Split `word` so the head fits `max_width`; the head always keeps at
/// least one character.
fn split_to_width(word: &str, font: &FontSpec, max_width: f32) -> (String, Option<String>) {
    let mut head = String::new();
    let mut width = 0.0;
    for (i, c) in word.char_indices() {
        let w = text_width(c.encode_utf8(&mut [0; 4]), font);
        if width + w > max_width && !head.is_empty() {
            return (head, Some(word[i..].to_string()));
        }
        head.push(c);
        width += w;
    }
    (head, None)
}

#[derive(Default)]
struct LineBuilder {
    fragments: Vec<Fragment>,
    width: f32,
    leading: f32,
    max_size: f32,
    pending_space: Option<FontSpec>,
}

impl LineBuilder {
    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn touch(&mut self, font: &FontSpec) {
        self.leading = self.leading.max(font.leading());
        self.max_size = self.max_size.max(font.size);
    }

    fn push_word(&mut self, word: &str, font: FontSpec, word_width: f32) {
        self.touch(&font);
        if let Some(space_font) = self.pending_space.take() {
            self.append(" ", space_font, text_width(" ", &space_font));
        }
        self.append(word, font, word_width);
    }

    fn append(&mut self, text: &str, font: FontSpec, width: f32) {
        self.width += width;
        match self.fragments.last_mut() {
            Some(last) if last.font == font => {
                last.text.push_str(text);
                last.width += width;
            }
            _ => self.fragments.push(Fragment {
                text: text.to_string(),
                font,
                width,
            }),
        }
    }

    fn finish(self) -> Line {
        Line {
            fragments: self.fragments,
            width: self.width,
            leading: self.leading,
            max_size: self.max_size,
        }
    }
}
