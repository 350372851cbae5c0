use std::io::BufRead;

use alloc::collections::VecDeque;
use alloc::sync::Arc;

use crate::chars::{is_break, is_yaml_char};
use crate::{Encoding, Mark, ReaderError};

const BOM_UTF8: [u8; 3] = [0xef, 0xbb, 0xbf];
const BOM_UTF16LE: [u8; 2] = [0xff, 0xfe];
const BOM_UTF16BE: [u8; 2] = [0xfe, 0xff];

const MAX_OFFSET: usize = usize::MAX / 2;

enum Input<'r> {
    String(&'r [u8]),
    Stream(&'r mut dyn BufRead),
}

impl<'r> Input<'r> {
    fn as_buf_read(&mut self) -> &mut dyn BufRead {
        match self {
            Input::String(bytes) => bytes,
            Input::Stream(reader) => &mut **reader,
        }
    }
}

/// A decoding cursor over the input stream.
///
/// The reader detects the encoding once, decodes characters on demand into a
/// lookahead buffer, rejects characters that are not allowed in YAML and
/// keeps track of the position of the next unconsumed character.
pub struct Reader<'r> {
    input: Option<Input<'r>>,
    encoding: Encoding,
    name: Arc<str>,
    source: Option<Arc<str>>,
    buffer: VecDeque<char>,
    eof: bool,
    /// Byte offset of the decoded input, for reader errors.
    offset: usize,
    /// Byte offset of the next unconsumed character in `source`.
    pointer: usize,
    index: u64,
    line: u64,
    column: u64,
    last_was_cr: bool,
}

impl<'r> Default for Reader<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Reader<'r> {
    pub fn new() -> Reader<'r> {
        Reader {
            input: None,
            encoding: Encoding::Any,
            name: Arc::from("<unicode string>"),
            source: None,
            buffer: VecDeque::with_capacity(16),
            eof: false,
            offset: 0,
            pointer: 0,
            index: 0,
            line: 0,
            column: 0,
            last_was_cr: false,
        }
    }

    /// Read from a string. Marks produced by this reader will carry
    /// snippets of the source text.
    pub fn set_input_string(&mut self, input: &'r str) {
        assert!(self.input.is_none(), "input already set");
        self.input = Some(Input::String(input.as_bytes()));
        self.source = Some(Arc::from(input));
        self.name = Arc::from("<unicode string>");
    }

    /// Read from a generic input stream.
    pub fn set_input(&mut self, input: &'r mut dyn BufRead) {
        assert!(self.input.is_none(), "input already set");
        self.input = Some(Input::Stream(input));
        self.name = Arc::from("<byte stream>");
    }

    /// Force the input encoding instead of detecting it from the BOM.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        assert!(self.encoding == Encoding::Any, "encoding already set");
        self.encoding = encoding;
    }

    /// Set the source name reported in marks.
    pub fn set_name(&mut self, name: &str) {
        self.name = Arc::from(name);
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn column(&self) -> u64 {
        self.column
    }

    /// The position of the next unconsumed character.
    pub fn mark(&self) -> Mark {
        let mark = Mark::new(self.name.clone(), self.index, self.line, self.column);
        match &self.source {
            Some(source) => mark.with_snapshot(source.clone(), self.pointer),
            None => mark,
        }
    }

    /// Look at the character `offset` positions ahead without consuming it.
    ///
    /// Only characters made available by a previous [`Reader::cache`] call
    /// are visible; `None` means the end of the input.
    pub fn peek(&self, offset: usize) -> Option<char> {
        self.buffer.get(offset).copied()
    }

    pub fn check(&self, ch: char) -> bool {
        self.peek(0) == Some(ch)
    }

    pub fn check_at(&self, ch: char, offset: usize) -> bool {
        self.peek(offset) == Some(ch)
    }

    /// The next `length` characters, or fewer at the end of the input.
    pub fn prefix(&self, length: usize) -> String {
        self.buffer.iter().take(length).collect()
    }

    pub fn is_eof(&self) -> bool {
        self.buffer.is_empty() && self.eof
    }

    /// Consume `length` characters, updating the position.
    pub fn forward(&mut self, length: usize) {
        for _ in 0..length {
            let Some(ch) = self.buffer.pop_front() else {
                return;
            };
            self.index += 1;
            if self.source.is_some() {
                self.pointer += ch.len_utf8();
            }
            if ch == '\n' && self.last_was_cr {
                // Second half of a CRLF pair.
            } else if is_break(ch) {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
            self.last_was_cr = ch == '\r';
        }
    }

    /// Ensure that at least `length` characters are buffered, unless the
    /// input ends first.
    pub fn cache(&mut self, length: usize) -> Result<(), ReaderError> {
        if self.buffer.len() >= length || self.eof {
            return Ok(());
        }
        let input = self.input.as_mut().ok_or(ReaderError::NoInput)?.as_buf_read();

        if self.encoding == Encoding::Any {
            if let Some((encoding, bom_length)) = determine_encoding(input)? {
                self.encoding = encoding;
                if self.source.is_some() {
                    self.pointer = bom_length;
                }
            } else {
                self.encoding = Encoding::Utf8;
                self.eof = true;
                return Ok(());
            }
        }

        while self.buffer.len() < length {
            let more = match self.encoding {
                Encoding::Any | Encoding::Utf8 => {
                    read_utf8_buffered(input, &mut self.buffer, &mut self.offset)?
                }
                Encoding::Utf16Le => {
                    read_utf16_buffered::<false>(input, &mut self.buffer, &mut self.offset)?
                }
                Encoding::Utf16Be => {
                    read_utf16_buffered::<true>(input, &mut self.buffer, &mut self.offset)?
                }
            };
            if !more {
                self.eof = true;
                break;
            }
        }

        if self.offset >= MAX_OFFSET {
            return Err(ReaderError::TooLong);
        }
        Ok(())
    }
}

/// Detect the encoding from the byte order mark, consuming it. Returns the
/// encoding and the BOM length, or `None` for an empty input.
fn determine_encoding(reader: &mut dyn BufRead) -> Result<Option<(Encoding, usize)>, ReaderError> {
    let initial_bytes = reader.fill_buf()?;
    if initial_bytes.is_empty() {
        return Ok(None);
    }

    if initial_bytes.starts_with(&BOM_UTF8) {
        reader.consume(BOM_UTF8.len());
        return Ok(Some((Encoding::Utf8, BOM_UTF8.len())));
    }

    match initial_bytes[0] {
        0xff | 0xfe => {
            let mut bom = [0; 2];
            reader.read_exact(&mut bom)?;
            if bom == BOM_UTF16LE {
                Ok(Some((Encoding::Utf16Le, 2)))
            } else if bom == BOM_UTF16BE {
                Ok(Some((Encoding::Utf16Be, 2)))
            } else {
                Err(ReaderError::InvalidBom)
            }
        }
        _ => Ok(Some((Encoding::Utf8, 0))),
    }
}

fn read_utf8_buffered(
    reader: &mut dyn BufRead,
    out: &mut VecDeque<char>,
    offset: &mut usize,
) -> Result<bool, ReaderError> {
    let available = loop {
        match reader.fill_buf() {
            Ok([]) => return Ok(false),
            Ok(available) => break available,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    };

    let (valid, error) = match core::str::from_utf8(available) {
        Ok(valid) => (valid, None),
        Err(err) => {
            let valid = core::str::from_utf8(&available[..err.valid_up_to()])
                .map_err(|_| ReaderError::InvalidUtf8 { value: available[0] })?;
            (valid, Some(err))
        }
    };
    for ch in valid.chars() {
        push_char(out, ch, *offset)?;
        *offset += ch.len_utf8();
    }
    let used = valid.len();

    match error {
        None => {
            reader.consume(used);
            Ok(true)
        }
        Some(err) if err.error_len().is_some() => Err(ReaderError::InvalidUtf8 {
            value: available[used],
        }),
        Some(_) if used != 0 => {
            // The tail is an incomplete sequence; leave it for the next read.
            reader.consume(used);
            Ok(true)
        }
        Some(_) => {
            let initial = available[0];
            read_utf8_char_unbuffered(reader, out, initial, offset)?;
            Ok(true)
        }
    }
}

fn read_utf8_char_unbuffered(
    reader: &mut dyn BufRead,
    out: &mut VecDeque<char>,
    initial: u8,
    offset: &mut usize,
) -> Result<(), ReaderError> {
    let width = utf8_char_width(initial);
    if width == 0 {
        return Err(ReaderError::InvalidUtf8 { value: initial });
    }
    let mut buffer = [0; 4];
    reader.read_exact(&mut buffer[..width])?;
    match core::str::from_utf8(&buffer[..width])
        .ok()
        .and_then(|valid| valid.chars().next())
    {
        Some(ch) => {
            push_char(out, ch, *offset)?;
            *offset += width;
            Ok(())
        }
        None => Err(ReaderError::InvalidUtf8 { value: buffer[0] }),
    }
}

fn decode_u16<const BIG_ENDIAN: bool>(bytes: [u8; 2]) -> u16 {
    if BIG_ENDIAN {
        u16::from_be_bytes(bytes)
    } else {
        u16::from_le_bytes(bytes)
    }
}

fn read_utf16_buffered<const BIG_ENDIAN: bool>(
    reader: &mut dyn BufRead,
    out: &mut VecDeque<char>,
    offset: &mut usize,
) -> Result<bool, ReaderError> {
    let available = loop {
        match reader.fill_buf() {
            Ok([]) => return Ok(false),
            Ok(available) => break available,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    };

    let units = available
        .chunks_exact(2)
        .map(|chunk| decode_u16::<BIG_ENDIAN>([chunk[0], chunk[1]]));

    let mut used = 0;
    for ch in core::char::decode_utf16(units) {
        // An unpaired surrogate may be the first half of a pair split by the
        // buffer boundary; the unbuffered path below sorts that out.
        let Ok(ch) = ch else { break };
        push_char(out, ch, *offset)?;
        let width = ch.len_utf16() * 2;
        *offset += width;
        used += width;
    }

    if used == 0 {
        read_utf16_char_unbuffered::<BIG_ENDIAN>(reader, out, offset)?;
    } else {
        reader.consume(used);
    }
    Ok(true)
}

fn read_utf16_char_unbuffered<const BIG_ENDIAN: bool>(
    reader: &mut dyn BufRead,
    out: &mut VecDeque<char>,
    offset: &mut usize,
) -> Result<(), ReaderError> {
    let mut buffer = [0; 2];
    reader.read_exact(&mut buffer)?;
    let first = decode_u16::<BIG_ENDIAN>(buffer);

    let (decoded, width) = if (0xD800..=0xDFFF).contains(&first) {
        reader.read_exact(&mut buffer)?;
        let second = decode_u16::<BIG_ENDIAN>(buffer);
        (core::char::decode_utf16([first, second]).next(), 4)
    } else {
        (core::char::decode_utf16([first]).next(), 2)
    };

    match decoded {
        Some(Ok(ch)) => {
            push_char(out, ch, *offset)?;
            *offset += width;
            Ok(())
        }
        Some(Err(err)) => Err(ReaderError::InvalidUtf16 {
            value: err.unpaired_surrogate(),
        }),
        None => Err(ReaderError::InvalidUtf16 { value: first }),
    }
}

fn utf8_char_width(initial: u8) -> usize {
    if initial & 0x80 == 0 {
        1
    } else if initial & 0xE0 == 0xC0 {
        2
    } else if initial & 0xF0 == 0xE0 {
        3
    } else if initial & 0xF8 == 0xF0 {
        4
    } else {
        0
    }
}

fn push_char(out: &mut VecDeque<char>, ch: char, offset: usize) -> Result<(), ReaderError> {
    if !is_yaml_char(ch) {
        return Err(ReaderError::Problem {
            problem: "control characters are not allowed",
            offset,
            value: ch as u32,
        });
    }
    out.push_back(ch);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn positions(input: &str) -> Vec<(u64, u64, u64)> {
        let mut reader = Reader::new();
        reader.set_input_string(input);
        let mut out = Vec::new();
        loop {
            reader.cache(1).unwrap();
            let mark = reader.mark();
            out.push((mark.index, mark.line, mark.column));
            if reader.is_eof() {
                break;
            }
            reader.forward(1);
        }
        out
    }

    #[test]
    fn line_breaks_advance_the_line() {
        assert_eq!(
            positions("a\r\nb\rc\u{85}d\u{2028}e"),
            vec![
                (0, 0, 0),
                (1, 0, 1),
                (2, 1, 0),
                (3, 1, 0),
                (4, 1, 1),
                (5, 2, 0),
                (6, 2, 1),
                (7, 3, 0),
                (8, 3, 1),
                (9, 4, 0),
                (10, 4, 1),
            ]
        );
    }

    #[test]
    fn utf16_with_bom() {
        let mut bytes: &[u8] = &[0xff, 0xfe, b'a', 0, 0x3d, 0xd8, 0x00, 0xde];
        let mut reader = Reader::new();
        reader.set_input(&mut bytes);
        reader.cache(4).unwrap();
        assert_eq!(reader.encoding(), Encoding::Utf16Le);
        assert_eq!(reader.prefix(4), "a\u{1F600}");
    }

    #[test]
    fn utf8_bom_is_consumed() {
        let mut bytes: &[u8] = b"\xef\xbb\xbfkey";
        let mut reader = Reader::new();
        reader.set_input(&mut bytes);
        reader.cache(3).unwrap();
        assert_eq!(reader.encoding(), Encoding::Utf8);
        assert_eq!(reader.prefix(3), "key");
        assert_eq!(reader.name(), "<byte stream>");
    }

    #[test]
    fn rejects_control_characters() {
        let mut reader = Reader::new();
        reader.set_input_string("ab\x07");
        let err = reader.cache(3).unwrap_err();
        assert!(matches!(
            err,
            ReaderError::Problem {
                offset: 2,
                value: 7,
                ..
            }
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut bytes: &[u8] = b"a\xff";
        let mut reader = Reader::new();
        reader.set_input(&mut bytes);
        assert!(matches!(
            reader.cache(2),
            Err(ReaderError::InvalidUtf8 { value: 0xff })
        ));
    }

    #[test]
    fn string_marks_have_snippets() {
        let mut reader = Reader::new();
        reader.set_input_string("key: value");
        reader.cache(5).unwrap();
        reader.forward(5);
        assert_eq!(
            reader.mark().snippet(0, 75).as_deref(),
            Some("key: value\n     ^")
        );
    }
}
