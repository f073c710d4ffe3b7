//! Glyph-width tables and the line-count estimator.
//!
//! Widths come from the Adobe AFM files of the standard PDF fonts and are in
//! 1/1000 em. The tables cover ASCII 0x20..=0x7E (95 printable characters);
//! index = `(char as usize) - 32`. Anything outside that range falls back to
//! the table's average width, which is close enough for Latin-1 letters.
//!
//! The estimator does not perform real layout (no kerning, no hyphenation).
//! It only has to be good enough to tell whether a text block beside an image
//! ends before the image does.

use crate::error::ElementError;
use crate::style::{FontFamily, FontSpec};
use tracing::debug;

/// Static character-width table for one font face.
pub struct WidthTable {
    pub name: &'static str,
    widths: [u16; 95],
    /// Fallback width for characters outside the printable ASCII range.
    pub average: u16,
}

impl WidthTable {
    /// Width of `s` in points when set at `size`.
    pub fn measure(&self, s: &str, size: f32) -> f32 {
        let units: u32 = s
            .chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32] as u32
                } else {
                    self.average as u32
                }
            })
            .sum();
        units as f32 * size / 1000.0
    }
}

/// Helvetica and Helvetica-Oblique.
#[rustfmt::skip]
static HELVETICA: WidthTable = WidthTable {
    name: "Helvetica",
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0    1    2    3    4    5    6    7    8    9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        278, 278, 584, 584, 584, 556, 1015,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        278, 278, 278, 469, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
        // {    |    }    ~
        334, 260, 334, 584,
    ],
    average: 556,
};

/// Helvetica-Bold and Helvetica-BoldOblique.
#[rustfmt::skip]
static HELVETICA_BOLD: WidthTable = WidthTable {
    name: "Helvetica-Bold",
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0    1    2    3    4    5    6    7    8    9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        333, 333, 584, 584, 584, 611, 975,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        333, 278, 333, 584, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
        // {    |    }    ~
        389, 280, 389, 584,
    ],
    average: 611,
};

/// Every Courier face is monospaced at 600 units.
static COURIER: WidthTable = WidthTable {
    name: "Courier",
    widths: [600; 95],
    average: 600,
};

/// Look up the width table for a font.
///
/// Returns `None` for faces without a bundled table (the Times family); the
/// estimator reports those as [`ElementError::MetricsUnavailable`].
pub fn width_table(font: &FontSpec) -> Option<&'static WidthTable> {
    match font.family {
        FontFamily::Helvetica if font.style.is_bold() => Some(&HELVETICA_BOLD),
        FontFamily::Helvetica => Some(&HELVETICA),
        FontFamily::Courier => Some(&COURIER),
        FontFamily::TimesRoman => None,
    }
}

/// Width of `s` in points, if the font's metrics are known.
pub fn string_width(s: &str, font: &FontSpec) -> Option<f32> {
    width_table(font).map(|t| t.measure(s, font.size))
}

/// Estimate how many times `text` wraps inside `available_width`.
///
/// Splits on whitespace and greedily accumulates token widths plus one space
/// per token. Each time the next token would overflow the width the counter
/// is incremented and accumulation restarts with that token. The counter
/// starts at zero, so a text that fits on one line yields 0.
///
/// # Errors
/// [`ElementError::MetricsUnavailable`] when the font has no width table.
pub fn try_estimate_line_count(
    text: &str,
    font: &FontSpec,
    available_width: f32,
) -> Result<usize, ElementError> {
    let table = width_table(font).ok_or_else(|| ElementError::MetricsUnavailable {
        font: font.base_font_name().to_string(),
    })?;

    let space_width = table.measure(" ", font.size);
    let mut lines = 0usize;
    let mut current_width = 0.0_f32;

    for token in text.split_whitespace() {
        let token_width = table.measure(token, font.size);
        if current_width + token_width > available_width {
            lines += 1;
            current_width = token_width;
        } else {
            current_width += space_width + token_width;
        }
    }

    debug!(
        "Estimated {} wrap(s) for {} chars at width {:.1}",
        lines,
        text.len(),
        available_width
    );
    Ok(lines)
}

/// Infallible form of [`try_estimate_line_count`]: unknown metrics yield 0.
pub fn estimate_line_count(text: &str, font: &FontSpec, available_width: f32) -> usize {
    try_estimate_line_count(text, font, available_width).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, FontStyle};

    fn helvetica(size: f32) -> FontSpec {
        FontSpec::new(FontFamily::Helvetica, size, FontStyle::Normal, Color::BLACK)
    }

    #[test]
    fn measures_known_glyphs() {
        // "Hi" = H(722) + i(222) = 944 units → 11.328pt at 12pt
        let w = string_width("Hi", &helvetica(12.0)).unwrap();
        assert!((w - 11.328).abs() < 1e-3, "got {w}");
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let regular = helvetica(12.0);
        let bold = FontSpec::new(FontFamily::Helvetica, 12.0, FontStyle::Bold, Color::BLACK);
        let text = "Sunday, January 01, 2012";
        assert!(string_width(text, &bold).unwrap() > string_width(text, &regular).unwrap());
    }

    #[test]
    fn courier_is_monospaced() {
        let courier = FontSpec::new(FontFamily::Courier, 10.0, FontStyle::Normal, Color::BLACK);
        assert_eq!(string_width("iiii", &courier), string_width("WWWW", &courier));
    }

    #[test]
    fn non_ascii_uses_average_width() {
        let w = string_width("é", &helvetica(10.0)).unwrap();
        assert!((w - 5.56).abs() < 1e-3);
    }

    #[test]
    fn short_text_does_not_wrap() {
        assert_eq!(estimate_line_count("hello world", &helvetica(12.0), 500.0), 0);
    }

    #[test]
    fn empty_text_yields_zero() {
        assert_eq!(estimate_line_count("", &helvetica(12.0), 100.0), 0);
        assert_eq!(estimate_line_count("   \n\t ", &helvetica(12.0), 100.0), 0);
    }

    #[test]
    fn counts_wrap_points() {
        // Courier 10pt: every char is 6pt, a space is 6pt.
        let courier = FontSpec::new(FontFamily::Courier, 10.0, FontStyle::Normal, Color::BLACK);
        // "aaaa" = 24pt. Width 60 holds "aaaa aaaa" (6+24+6+24 = 60 accumulated
        // with the leading space) but not a third token.
        let text = "aaaa aaaa aaaa aaaa aaaa aaaa";
        assert_eq!(estimate_line_count(text, &courier, 60.0), 2);
    }

    #[test]
    fn narrower_width_never_reduces_count() {
        let font = helvetica(12.0);
        let text = "The quick brown fox jumps over the lazy dog ".repeat(20);
        let wide = estimate_line_count(&text, &font, 400.0);
        let narrow = estimate_line_count(&text, &font, 150.0);
        assert!(narrow >= wide);
    }

    #[test]
    fn monotonic_in_text_length() {
        let font = helvetica(12.0);
        let words: Vec<&str> = "Lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor incididunt ut labore et dolore magna aliqua"
            .split(' ')
            .collect();
        let mut previous = 0;
        for n in 0..=words.len() * 4 {
            let text: Vec<&str> = words.iter().cycle().take(n).copied().collect();
            let count = estimate_line_count(&text.join(" "), &font, 120.0);
            assert!(count >= previous, "count dropped at {n} tokens");
            previous = count;
        }
    }

    #[test]
    fn times_metrics_are_unavailable() {
        let times = FontSpec::new(FontFamily::TimesRoman, 12.0, FontStyle::Normal, Color::BLACK);
        assert_eq!(estimate_line_count("a b c d e f", &times, 1.0), 0);
        assert!(matches!(
            try_estimate_line_count("a b c", &times, 1.0),
            Err(ElementError::MetricsUnavailable { .. })
        ));
    }
}
