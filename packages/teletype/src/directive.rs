/// Character the incoming text stream uses to encode a line break.
///
/// The construction service emits running text in one line and marks breaks
/// with this sentinel; two in a row form a paragraph break.
pub const BREAK_SENTINEL: char = '<';

/// One step for the typing renderer.
///
/// Raw characters are translated exactly once, by the diff pass, so the
/// renderer itself never inspects text for sentinels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Append the character as-is.
    Glyph(char),
    /// Move to the next line.
    Break,
}

impl Directive {
    pub fn from_char(ch: char) -> Self {
        if ch == BREAK_SENTINEL {
            Directive::Break
        } else {
            Directive::Glyph(ch)
        }
    }
}

/// Translate a chunk of incoming text into rendering steps.
pub fn directives(text: &str) -> Vec<Directive> {
    text.chars().map(Directive::from_char).collect()
}
