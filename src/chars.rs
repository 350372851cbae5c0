//! Character classes used by the reader, the scanners and the emitter.
//!
//! Predicates taking `impl Into<Option<char>>` treat `None` as the end of
//! the input, so they can be fed straight from [`Reader::peek`](crate::Reader::peek).

pub(crate) fn is_alpha(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some('0'..='9' | 'A'..='Z' | 'a'..='z' | '_' | '-'))
}

pub(crate) fn is_digit(ch: impl Into<Option<char>>) -> bool {
    ch.into().is_some_and(|ch| ch.is_ascii_digit())
}

pub(crate) fn as_digit(ch: char) -> u32 {
    ch.to_digit(10).unwrap_or(0)
}

pub(crate) fn is_hex(ch: impl Into<Option<char>>) -> bool {
    ch.into().is_some_and(|ch| ch.is_ascii_hexdigit())
}

pub(crate) fn as_hex(ch: char) -> u32 {
    ch.to_digit(16).unwrap_or(0)
}

pub(crate) fn is_ascii(ch: char) -> bool {
    ch.is_ascii()
}

/// Characters the reader accepts in a YAML stream.
pub(crate) fn is_yaml_char(ch: char) -> bool {
    matches!(
        ch,
        '\x09'
            | '\x0A'
            | '\x0D'
            | '\x20'..='\x7E'
            | '\u{0085}'
            | '\u{00A0}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Characters the emitter may write unescaped.
pub(crate) fn is_printable(ch: char) -> bool {
    match ch {
        '\u{feff}' | '\u{fffe}' | '\u{ffff}' => false,
        '\x0a'
        | '\x20'..='\x7e'
        | '\u{00a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}' => true,
        _ => false,
    }
}

pub(crate) fn is_bom(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some('\u{feff}')
}

pub(crate) fn is_space(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some(' ')
}

pub(crate) fn is_tab(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some('\t')
}

pub(crate) fn is_blank(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_space(ch) || is_tab(ch)
}

pub(crate) fn is_blankz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_blank(ch) || is_breakz(ch)
}

pub(crate) fn is_break(ch: impl Into<Option<char>>) -> bool {
    matches!(
        ch.into(),
        Some('\r' | '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}')
    )
}

pub(crate) fn is_breakz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_break(ch) || ch.is_none()
}

pub(crate) fn is_flow_indicator(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some(',' | '[' | ']' | '{' | '}'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_of_input_is_a_break_but_not_blank() {
        assert!(is_breakz(None));
        assert!(is_blankz(None));
        assert!(!is_break(None));
        assert!(!is_blank(None));
    }

    #[test]
    fn reader_and_emitter_printable_sets_differ() {
        assert!(is_yaml_char('\t'));
        assert!(!is_printable('\t'));
        assert!(is_yaml_char('\u{feff}'));
        assert!(!is_printable('\u{feff}'));
        assert!(!is_yaml_char('\x07'));
        assert!(is_printable('\u{1F600}'));
    }

    #[test]
    fn unicode_breaks() {
        for ch in ['\r', '\n', '\u{85}', '\u{2028}', '\u{2029}'] {
            assert!(is_break(ch), "{ch:?}");
        }
        assert!(!is_break('\u{2027}'));
    }
}
