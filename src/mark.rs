use alloc::sync::Arc;
use core::fmt;

/// A position in the input stream.
///
/// Marks are attached to every token and event and to every error raised
/// while reading, scanning or parsing. When the input was supplied as a
/// string, the mark also keeps a handle to the source text so that
/// diagnostics can show the offending line.
#[derive(Clone)]
#[non_exhaustive]
pub struct Mark {
    /// The name of the input, such as `"<unicode string>"` or a file name.
    pub name: Arc<str>,
    /// The position index, counted in characters.
    pub index: u64,
    /// The position line, zero-based.
    pub line: u64,
    /// The position column, zero-based.
    pub column: u64,
    snapshot: Option<Snapshot>,
}

#[derive(Clone)]
struct Snapshot {
    buffer: Arc<str>,
    pointer: usize,
}

const BREAKS: &[char] = &['\0', '\r', '\n', '\u{85}', '\u{2028}', '\u{2029}'];

impl Mark {
    pub fn new(name: Arc<str>, index: u64, line: u64, column: u64) -> Mark {
        Mark {
            name,
            index,
            line,
            column,
            snapshot: None,
        }
    }

    pub(crate) fn with_snapshot(mut self, buffer: Arc<str>, pointer: usize) -> Mark {
        self.snapshot = Some(Snapshot { buffer, pointer });
        self
    }

    /// Render the source line around this mark, followed by a line with a
    /// caret under the marked character.
    ///
    /// Returns `None` when the mark was produced from a byte stream rather
    /// than a string.
    pub fn snippet(&self, indent: usize, max_length: usize) -> Option<String> {
        let Snapshot { buffer, pointer } = self.snapshot.as_ref()?;
        let pointer = (*pointer).min(buffer.len());
        let half = (max_length / 2).saturating_sub(1);

        let mut head = "";
        let mut start = pointer;
        for (offset, ch) in buffer[..pointer].char_indices().rev() {
            if BREAKS.contains(&ch) {
                break;
            }
            if buffer[offset..pointer].chars().count() > half {
                head = " ... ";
                start = offset + ch.len_utf8();
                break;
            }
            start = offset;
        }

        let mut tail = "";
        let mut end = buffer.len();
        for (offset, ch) in buffer[pointer..].char_indices() {
            let offset = pointer + offset;
            if BREAKS.contains(&ch) {
                end = offset;
                break;
            }
            if buffer[pointer..offset].chars().count() > half {
                tail = " ... ";
                end = offset;
                break;
            }
        }

        let caret_column = head.chars().count() + buffer[start..pointer].chars().count();
        Some(format!(
            "{:indent$}{head}{}{tail}\n{:width$}^",
            "",
            &buffer[start..end],
            "",
            width = indent + caret_column,
        ))
    }
}

impl Default for Mark {
    fn default() -> Self {
        Mark::new(Arc::from(""), 0, 0, 0)
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.line == other.line
            && self.column == other.column
            && self.name == other.name
    }
}

impl Eq for Mark {}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mark")
            .field("index", &self.index)
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  in \"{}\", line {}, column {}",
            self.name,
            self.line + 1,
            self.column + 1
        )?;
        if let Some(snippet) = self.snippet(4, 75) {
            write!(f, ":\n{snippet}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mark_at(source: &str, pointer: usize) -> Mark {
        Mark::new(Arc::from("<test>"), 0, 0, 0).with_snapshot(Arc::from(source), pointer)
    }

    #[test]
    fn snippet_points_at_column() {
        let mark = mark_at("first\nkey: [value\nlast", 11);
        assert_eq!(
            mark.snippet(4, 75).as_deref(),
            Some("    key: [value\n         ^")
        );
    }

    #[test]
    fn snippet_clips_long_lines() {
        let line = "x".repeat(200);
        let mark = mark_at(&line, 100);
        let snippet = mark.snippet(0, 20).unwrap();
        let (text, caret) = snippet.split_once('\n').unwrap();
        assert!(text.starts_with(" ... "));
        assert!(text.ends_with(" ... "));
        assert_eq!(caret.len() - 1, text.find('x').unwrap() + 9);
    }

    #[test]
    fn display_without_snapshot() {
        let mark = Mark::new(Arc::from("<byte stream>"), 12, 2, 4);
        assert_eq!(mark.to_string(), "  in \"<byte stream>\", line 3, column 5");
    }

    #[test]
    fn equality_ignores_snapshot() {
        let a = mark_at("abc", 1);
        let b = Mark::new(Arc::from("<test>"), 0, 0, 0);
        assert_eq!(a, b);
    }
}
