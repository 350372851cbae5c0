//! A scanner and parser for the canonical subset of YAML.
//!
//! Canonical YAML is fully explicit: every collection is in flow style, every
//! scalar is double-quoted, and every mapping entry uses `?` and `:`. This
//! pair reads that subset independently of [`Scanner`](crate::Scanner) and
//! [`Parser`](crate::Parser), so the two can be checked against each other.

use alloc::collections::VecDeque;
use std::io::BufRead;

use tracing::trace;

use crate::chars::{as_hex, is_alpha, is_blank, is_blankz, is_break, is_hex};
use crate::scanner::unescape;
use crate::{
    Event, EventData, ImplicitLevel, MappingStyle, Mark, ParserError, Reader, ScalarStyle,
    ScannerError, SequenceStyle, Token, TokenData, VersionDirective,
};

/// Tokenizes canonical YAML.
///
/// The whole input is scanned on first access; an error anywhere in the
/// stream is reported before any token is handed out.
pub struct CanonicalScanner<'r> {
    reader: Reader<'r>,
    tokens: VecDeque<Token>,
    scanned: bool,
}

impl<'r> Default for CanonicalScanner<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> CanonicalScanner<'r> {
    pub fn new() -> CanonicalScanner<'r> {
        CanonicalScanner {
            reader: Reader::new(),
            tokens: VecDeque::new(),
            scanned: false,
        }
    }

    pub fn set_input_string(&mut self, input: &'r str) {
        self.reader.set_input_string(input);
    }

    pub fn set_input(&mut self, input: &'r mut dyn BufRead) {
        self.reader.set_input(input);
    }

    pub fn set_name(&mut self, name: &str) {
        self.reader.set_name(name);
    }

    pub fn check_token(&mut self) -> Result<bool, ScannerError> {
        Ok(self.peek_token()?.is_some())
    }

    pub fn peek_token(&mut self) -> Result<Option<&Token>, ScannerError> {
        self.ensure_scanned()?;
        Ok(self.tokens.front())
    }

    pub fn get_token(&mut self) -> Result<Option<Token>, ScannerError> {
        self.ensure_scanned()?;
        let token = self.tokens.pop_front();
        if let Some(token) = &token {
            trace!(kind = token.data.kind(), "canonical token");
        }
        Ok(token)
    }

    fn ensure_scanned(&mut self) -> Result<(), ScannerError> {
        if self.scanned {
            return Ok(());
        }
        self.scanned = true;
        if let Err(err) = self.scan() {
            self.tokens.clear();
            return Err(err);
        }
        Ok(())
    }

    fn ch(&mut self, offset: usize) -> Result<Option<char>, ScannerError> {
        self.reader.cache(offset + 1)?;
        Ok(self.reader.peek(offset))
    }

    fn push(&mut self, data: TokenData, start_mark: Mark) {
        let end_mark = self.reader.mark();
        self.tokens.push_back(Token::new(data, start_mark, end_mark));
    }

    fn error<T>(
        &self,
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
    ) -> Result<T, ScannerError> {
        Err(ScannerError::Problem {
            context,
            context_mark,
            problem,
            problem_mark: self.reader.mark(),
        })
    }

    fn scan(&mut self) -> Result<(), ScannerError> {
        self.reader.cache(1)?;
        let mark = self.reader.mark();
        self.push(
            TokenData::StreamStart {
                encoding: self.reader.encoding(),
            },
            mark,
        );

        loop {
            self.skip_to_next_token()?;
            let start_mark = self.reader.mark();
            let Some(ch) = self.ch(0)? else {
                self.push(TokenData::StreamEnd, start_mark);
                return Ok(());
            };
            let simple = match ch {
                '[' => Some(TokenData::FlowSequenceStart),
                ']' => Some(TokenData::FlowSequenceEnd),
                '{' => Some(TokenData::FlowMappingStart),
                '}' => Some(TokenData::FlowMappingEnd),
                '?' => Some(TokenData::Key),
                ':' => Some(TokenData::Value),
                ',' => Some(TokenData::FlowEntry),
                _ => None,
            };
            if let Some(data) = simple {
                self.reader.forward(1);
                self.push(data, start_mark);
                continue;
            }
            match ch {
                '%' => self.scan_directive(start_mark)?,
                '-' => {
                    self.reader.cache(4)?;
                    if self.reader.prefix(3) != "---" || !is_blankz(self.reader.peek(3)) {
                        return self.error(
                            "while scanning for the next token",
                            start_mark,
                            "found character that cannot start any token",
                        );
                    }
                    self.reader.forward(3);
                    self.push(TokenData::DocumentStart, start_mark);
                }
                '*' | '&' => {
                    self.reader.forward(1);
                    let value = self.scan_name(start_mark.clone(), ch == '*')?;
                    let data = if ch == '*' {
                        TokenData::Alias { value }
                    } else {
                        TokenData::Anchor { value }
                    };
                    self.push(data, start_mark);
                }
                '!' => {
                    let suffix = self.scan_tag(start_mark.clone())?;
                    self.push(
                        TokenData::Tag {
                            handle: String::new(),
                            suffix,
                        },
                        start_mark,
                    );
                }
                '"' => {
                    let value = self.scan_scalar(start_mark.clone())?;
                    self.push(
                        TokenData::Scalar {
                            value,
                            style: ScalarStyle::DoubleQuoted,
                        },
                        start_mark,
                    );
                }
                _ => {
                    return self.error(
                        "while scanning for the next token",
                        start_mark,
                        "found character that cannot start any token",
                    )
                }
            }
        }
    }

    fn skip_to_next_token(&mut self) -> Result<(), ScannerError> {
        loop {
            match self.ch(0)? {
                Some(ch) if is_blank(ch) || is_break(ch) || ch == '\u{feff}' => {
                    self.reader.forward(1);
                }
                Some('#') => {
                    while !is_break(self.ch(0)?) && self.ch(0)?.is_some() {
                        self.reader.forward(1);
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_directive(&mut self, start_mark: Mark) -> Result<(), ScannerError> {
        const CONTEXT: &str = "while scanning a directive";
        self.reader.forward(1);
        let mut name = String::new();
        while let Some(ch) = self.ch(0)?.filter(|ch| is_alpha(*ch)) {
            name.push(ch);
            self.reader.forward(1);
        }
        if name != "YAML" {
            return self.error(CONTEXT, start_mark, "found unknown directive name");
        }
        while is_blank(self.ch(0)?) {
            self.reader.forward(1);
        }
        let mut version = String::new();
        while let Some(ch) = self.ch(0)?.filter(|ch| !is_blankz(*ch)) {
            version.push(ch);
            self.reader.forward(1);
        }
        if version != "1.1" {
            return self.error(CONTEXT, start_mark, "found incompatible YAML version");
        }
        self.push(TokenData::VersionDirective { major: 1, minor: 1 }, start_mark);
        Ok(())
    }

    fn scan_name(&mut self, start_mark: Mark, alias: bool) -> Result<String, ScannerError> {
        let mut value = String::new();
        while let Some(ch) = self.ch(0)?.filter(|ch| is_alpha(*ch)) {
            value.push(ch);
            self.reader.forward(1);
        }
        if value.is_empty() {
            return self.error(
                if alias {
                    "while scanning an alias"
                } else {
                    "while scanning an anchor"
                },
                start_mark,
                "did not find expected alphabetic or numeric character",
            );
        }
        Ok(value)
    }

    /// Reads a tag and expands it to its full form.
    fn scan_tag(&mut self, start_mark: Mark) -> Result<String, ScannerError> {
        const CONTEXT: &str = "while scanning a tag";
        self.reader.forward(1);

        if self.ch(0)? == Some('<') {
            self.reader.forward(1);
            let mut uri = String::new();
            loop {
                match self.ch(0)? {
                    Some('>') => break,
                    Some(ch) if !is_blankz(ch) => {
                        uri.push(ch);
                        self.reader.forward(1);
                    }
                    _ => return self.error(CONTEXT, start_mark, "did not find the expected '>'"),
                }
            }
            self.reader.forward(1);
            return self.decode_escapes(&uri, start_mark);
        }

        let secondary = self.ch(0)? == Some('!');
        if secondary {
            self.reader.forward(1);
        }
        let mut suffix = String::new();
        while let Some(ch) = self.ch(0)?.filter(|ch| !is_blankz(*ch) && !",]}".contains(*ch)) {
            suffix.push(ch);
            self.reader.forward(1);
        }
        let suffix = self.decode_escapes(&suffix, start_mark.clone())?;
        if secondary {
            if suffix.is_empty() {
                return self.error(CONTEXT, start_mark, "did not find expected tag URI");
            }
            return Ok(format!("{}{suffix}", crate::CORE_SCHEMA_PREFIX));
        }
        Ok(format!("!{suffix}"))
    }

    fn decode_escapes(&self, value: &str, start_mark: Mark) -> Result<String, ScannerError> {
        const CONTEXT: &str = "while parsing a tag";
        if !value.contains('%') {
            return Ok(String::from(value));
        }
        let mut bytes = Vec::with_capacity(value.len());
        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            if ch != '%' {
                let mut buffer = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buffer).as_bytes());
                continue;
            }
            match (chars.next(), chars.next()) {
                (Some(high), Some(low)) if is_hex(high) && is_hex(low) => {
                    // Two hex digits always fit in a byte.
                    bytes.push((as_hex(high) << 4 | as_hex(low)) as u8);
                }
                _ => {
                    return self.error(
                        CONTEXT,
                        start_mark,
                        "did not find URI escaped octet",
                    )
                }
            }
        }
        match String::from_utf8(bytes) {
            Ok(decoded) => Ok(decoded),
            Err(_) => self.error(CONTEXT, start_mark, "found an incorrect UTF-8 sequence"),
        }
    }

    fn scan_scalar(&mut self, start_mark: Mark) -> Result<String, ScannerError> {
        const CONTEXT: &str = "while scanning a quoted scalar";
        self.reader.forward(1);
        let mut value = String::new();

        loop {
            let Some(ch) = self.ch(0)? else {
                return self.error(CONTEXT, start_mark, "found unexpected end of stream");
            };
            match ch {
                '"' => {
                    self.reader.forward(1);
                    return Ok(value);
                }
                '\\' => {
                    let Some(escape) = self.ch(1)? else {
                        return self.error(CONTEXT, start_mark, "found unexpected end of stream");
                    };
                    if is_break(escape) {
                        self.reader.forward(1);
                        self.skip_break()?;
                        while is_blank(self.ch(0)?) {
                            self.reader.forward(1);
                        }
                        continue;
                    }
                    let length = match escape {
                        'x' => 2,
                        'u' => 4,
                        'U' => 8,
                        _ => 0,
                    };
                    if length == 0 {
                        let Some(unescaped) = unescape(escape) else {
                            return self.error(CONTEXT, start_mark, "found unknown escape character");
                        };
                        value.push(unescaped);
                        self.reader.forward(2);
                        continue;
                    }
                    self.reader.forward(2);
                    let mut code = 0;
                    for offset in 0..length {
                        match self.ch(offset)? {
                            Some(digit) if is_hex(digit) => code = code << 4 | as_hex(digit),
                            _ => {
                                return self.error(
                                    CONTEXT,
                                    start_mark,
                                    "did not find expected hexadecimal number",
                                )
                            }
                        }
                    }
                    let Some(decoded) = char::from_u32(code) else {
                        return self.error(
                            CONTEXT,
                            start_mark,
                            "found invalid Unicode character escape code",
                        );
                    };
                    value.push(decoded);
                    self.reader.forward(length);
                }
                ch if is_break(ch) => {
                    let mut breaks = 0;
                    while is_break(self.ch(0)?) {
                        self.skip_break()?;
                        breaks += 1;
                        while is_blank(self.ch(0)?) {
                            self.reader.forward(1);
                        }
                    }
                    if breaks == 1 {
                        value.push(' ');
                    } else {
                        value.extend(core::iter::repeat('\n').take(breaks - 1));
                    }
                }
                ch => {
                    value.push(ch);
                    self.reader.forward(1);
                }
            }
        }
    }

    fn skip_break(&mut self) -> Result<(), ScannerError> {
        if self.ch(0)? == Some('\r') && self.ch(1)? == Some('\n') {
            self.reader.forward(2);
        } else {
            self.reader.forward(1);
        }
        Ok(())
    }
}

impl<'r> Iterator for CanonicalScanner<'r> {
    type Item = Result<Token, ScannerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_token().transpose()
    }
}

impl core::iter::FusedIterator for CanonicalScanner<'_> {}

enum Frame {
    Sequence,
    Mapping { value_pending: bool },
}

/// Builds events from canonical YAML.
///
/// Nesting is tracked on an explicit stack, so deeply nested input does not
/// grow the call stack.
pub struct CanonicalParser<'r> {
    scanner: CanonicalScanner<'r>,
    events: VecDeque<Event>,
    parsed: bool,
}

impl<'r> Default for CanonicalParser<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> CanonicalParser<'r> {
    pub fn new() -> CanonicalParser<'r> {
        CanonicalParser {
            scanner: CanonicalScanner::new(),
            events: VecDeque::new(),
            parsed: false,
        }
    }

    pub fn set_input_string(&mut self, input: &'r str) {
        self.scanner.set_input_string(input);
    }

    pub fn set_input(&mut self, input: &'r mut dyn BufRead) {
        self.scanner.set_input(input);
    }

    pub fn set_name(&mut self, name: &str) {
        self.scanner.set_name(name);
    }

    pub fn check_event(&mut self) -> Result<bool, ParserError> {
        Ok(self.peek_event()?.is_some())
    }

    pub fn peek_event(&mut self) -> Result<Option<&Event>, ParserError> {
        self.ensure_parsed()?;
        Ok(self.events.front())
    }

    pub fn get_event(&mut self) -> Result<Option<Event>, ParserError> {
        self.ensure_parsed()?;
        let event = self.events.pop_front();
        if let Some(event) = &event {
            trace!(kind = event.data.kind(), "canonical event");
        }
        Ok(event)
    }

    fn ensure_parsed(&mut self) -> Result<(), ParserError> {
        if self.parsed {
            return Ok(());
        }
        self.parsed = true;
        if let Err(err) = self.parse_stream() {
            self.events.clear();
            return Err(err);
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token, ParserError> {
        self.scanner.get_token()?.ok_or(ParserError::UnexpectedEof)
    }

    fn peek_data(&mut self) -> Result<&TokenData, ParserError> {
        match self.scanner.peek_token()? {
            Some(token) => Ok(&token.data),
            None => Err(ParserError::UnexpectedEof),
        }
    }

    fn push(&mut self, data: EventData, start_mark: Mark, end_mark: Mark) {
        self.events.push_back(Event::new(data, start_mark, end_mark));
    }

    fn parse_stream(&mut self) -> Result<(), ParserError> {
        let token = self.next_token()?;
        let TokenData::StreamStart { encoding } = token.data else {
            return Err(problem("did not find expected <stream-start>", token.start_mark));
        };
        self.push(
            EventData::StreamStart { encoding },
            token.start_mark,
            token.end_mark,
        );

        loop {
            let token = self.next_token()?;
            let (version_directive, token) = match token.data {
                TokenData::StreamEnd => {
                    self.push(EventData::StreamEnd, token.start_mark, token.end_mark);
                    return Ok(());
                }
                TokenData::VersionDirective { major, minor } => {
                    let start_mark = token.start_mark;
                    let token = self.next_token()?;
                    (
                        Some((VersionDirective { major, minor }, start_mark)),
                        token,
                    )
                }
                _ => (None, token),
            };
            if token.data != TokenData::DocumentStart {
                return Err(problem("did not find expected <document start>", token.start_mark));
            }
            let (version_directive, start_mark) = match version_directive {
                Some((directive, mark)) => (Some(directive), mark),
                None => (None, token.start_mark.clone()),
            };
            self.push(
                EventData::DocumentStart {
                    version_directive,
                    tag_directives: Vec::new(),
                    implicit: false,
                },
                start_mark,
                token.end_mark,
            );

            self.parse_document_content()?;

            let mark = self.events.back().map(|event| event.end_mark.clone()).unwrap_or_default();
            self.push(EventData::DocumentEnd { implicit: true }, mark.clone(), mark);
        }
    }

    fn parse_document_content(&mut self) -> Result<(), ParserError> {
        let mut stack = Vec::new();
        loop {
            if self.parse_node(&mut stack)? {
                continue;
            }
            if !self.close_nodes(&mut stack)? {
                return Ok(());
            }
        }
    }

    /// Parses one node's properties and content start. Returns true if a
    /// collection was opened and its first child follows.
    fn parse_node(&mut self, stack: &mut Vec<Frame>) -> Result<bool, ParserError> {
        let token = self.next_token()?;
        let start_mark = token.start_mark.clone();

        if let TokenData::Alias { value } = token.data {
            self.push(EventData::Alias { anchor: value }, start_mark, token.end_mark);
            return Ok(false);
        }

        let mut anchor = None;
        let mut tag = None;
        let mut token = token;
        loop {
            match token.data {
                TokenData::Anchor { value } if anchor.is_none() => anchor = Some(value),
                TokenData::Tag { suffix, .. } if tag.is_none() => tag = Some(suffix),
                data => {
                    token.data = data;
                    break;
                }
            }
            token = self.next_token()?;
        }

        let untagged_or_bang = tag.as_deref().map_or(true, |tag| tag == "!");
        match token.data {
            TokenData::Scalar { value, .. } => {
                let implicit = match tag.as_deref() {
                    None => ImplicitLevel::NonPlain,
                    Some("!") => ImplicitLevel::Plain,
                    Some(_) => ImplicitLevel::None,
                };
                self.push(
                    EventData::Scalar {
                        anchor,
                        tag,
                        value,
                        implicit,
                        style: ScalarStyle::DoubleQuoted,
                    },
                    start_mark,
                    token.end_mark,
                );
                Ok(false)
            }
            TokenData::FlowSequenceStart => {
                self.push(
                    EventData::SequenceStart {
                        anchor,
                        tag,
                        implicit: untagged_or_bang,
                        style: SequenceStyle::Flow,
                    },
                    start_mark,
                    token.end_mark,
                );
                if *self.peek_data()? == TokenData::FlowSequenceEnd {
                    let end = self.next_token()?;
                    self.push(EventData::SequenceEnd, end.start_mark, end.end_mark);
                    return Ok(false);
                }
                stack.push(Frame::Sequence);
                Ok(true)
            }
            TokenData::FlowMappingStart => {
                self.push(
                    EventData::MappingStart {
                        anchor,
                        tag,
                        implicit: untagged_or_bang,
                        style: MappingStyle::Flow,
                    },
                    start_mark,
                    token.end_mark,
                );
                let next = self.next_token()?;
                match next.data {
                    TokenData::FlowMappingEnd => {
                        self.push(EventData::MappingEnd, next.start_mark, next.end_mark);
                        Ok(false)
                    }
                    TokenData::Key => {
                        stack.push(Frame::Mapping {
                            value_pending: true,
                        });
                        Ok(true)
                    }
                    _ => Err(problem("did not find expected '?' or '}'", next.start_mark)),
                }
            }
            _ => Err(problem("did not find expected node content", token.start_mark)),
        }
    }

    /// Consumes the tokens that follow a complete node, closing every
    /// collection that ends there. Returns false once the document's root
    /// node is complete.
    fn close_nodes(&mut self, stack: &mut Vec<Frame>) -> Result<bool, ParserError> {
        loop {
            let (in_sequence, value_pending) = match stack.last() {
                None => return Ok(false),
                Some(Frame::Sequence) => (true, false),
                Some(Frame::Mapping { value_pending }) => (false, *value_pending),
            };
            let token = self.next_token()?;

            if in_sequence {
                match token.data {
                    TokenData::FlowEntry => {
                        if *self.peek_data()? != TokenData::FlowSequenceEnd {
                            return Ok(true);
                        }
                        let end = self.next_token()?;
                        stack.pop();
                        self.push(EventData::SequenceEnd, end.start_mark, end.end_mark);
                    }
                    TokenData::FlowSequenceEnd => {
                        stack.pop();
                        self.push(EventData::SequenceEnd, token.start_mark, token.end_mark);
                    }
                    _ => return Err(problem("did not find expected ',' or ']'", token.start_mark)),
                }
                continue;
            }

            if value_pending {
                if token.data != TokenData::Value {
                    return Err(problem("did not find expected ':'", token.start_mark));
                }
                set_value_pending(stack, false);
                return Ok(true);
            }

            match token.data {
                TokenData::FlowEntry => {
                    let next = self.next_token()?;
                    match next.data {
                        TokenData::Key => {
                            set_value_pending(stack, true);
                            return Ok(true);
                        }
                        TokenData::FlowMappingEnd => {
                            stack.pop();
                            self.push(EventData::MappingEnd, next.start_mark, next.end_mark);
                        }
                        _ => {
                            return Err(problem("did not find expected '?' or '}'", next.start_mark))
                        }
                    }
                }
                TokenData::FlowMappingEnd => {
                    stack.pop();
                    self.push(EventData::MappingEnd, token.start_mark, token.end_mark);
                }
                _ => return Err(problem("did not find expected ',' or '}'", token.start_mark)),
            }
        }
    }
}

fn set_value_pending(stack: &mut [Frame], pending: bool) {
    if let Some(Frame::Mapping { value_pending }) = stack.last_mut() {
        *value_pending = pending;
    }
}

fn problem(problem: &'static str, mark: Mark) -> ParserError {
    ParserError::Problem { problem, mark }
}

impl<'r> Iterator for CanonicalParser<'r> {
    type Item = Result<Event, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_event().transpose()
    }
}

impl core::iter::FusedIterator for CanonicalParser<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<&'static str> {
        let mut scanner = CanonicalScanner::new();
        scanner.set_input_string(input);
        scanner.map(|token| token.unwrap().data.kind()).collect()
    }

    fn events(input: &str) -> Vec<EventData> {
        let mut parser = CanonicalParser::new();
        parser.set_input_string(input);
        parser.map(|event| event.unwrap().data).collect()
    }

    fn scalar(anchor: Option<&str>, tag: Option<&str>, value: &str) -> EventData {
        let implicit = match tag {
            None => ImplicitLevel::NonPlain,
            Some("!") => ImplicitLevel::Plain,
            Some(_) => ImplicitLevel::None,
        };
        EventData::Scalar {
            anchor: anchor.map(String::from),
            tag: tag.map(String::from),
            value: String::from(value),
            implicit,
            style: ScalarStyle::DoubleQuoted,
        }
    }

    #[test]
    fn scans_tokens() {
        let input = "%YAML 1.1\n# comment\n--- !!map {\n  ? \"a\" : [ &x \"b\", *x, ],\n}\n";
        assert_eq!(
            kinds(input),
            [
                "STREAM-START",
                "VERSION-DIRECTIVE",
                "DOCUMENT-START",
                "TAG",
                "FLOW-MAPPING-START",
                "KEY",
                "SCALAR",
                "VALUE",
                "FLOW-SEQUENCE-START",
                "ANCHOR",
                "SCALAR",
                "FLOW-ENTRY",
                "ALIAS",
                "FLOW-ENTRY",
                "FLOW-SEQUENCE-END",
                "FLOW-ENTRY",
                "FLOW-MAPPING-END",
                "STREAM-END",
            ]
        );
    }

    #[test]
    fn expands_tags() {
        let mut scanner = CanonicalScanner::new();
        scanner.set_input_string("! !!str !local !<tag:example.com,2000:x> !e%21x");
        let tags: Vec<String> = scanner
            .filter_map(|token| match token.unwrap().data {
                TokenData::Tag { suffix, .. } => Some(suffix),
                _ => None,
            })
            .collect();
        assert_eq!(
            tags,
            [
                "!",
                "tag:yaml.org,2002:str",
                "!local",
                "tag:example.com,2000:x",
                "!e!x"
            ]
        );
    }

    #[test]
    fn parses_documents() {
        let input = "%YAML 1.1\n--- !!map {\n  ? ! \"a\"\n  : [ &x \"b\", *x ],\n  ? \"c\" : { },\n}\n--- \"d\"\n";
        assert_eq!(
            events(input),
            [
                EventData::StreamStart {
                    encoding: crate::Encoding::Utf8
                },
                EventData::DocumentStart {
                    version_directive: Some(VersionDirective { major: 1, minor: 1 }),
                    tag_directives: Vec::new(),
                    implicit: false,
                },
                EventData::MappingStart {
                    anchor: None,
                    tag: Some(String::from("tag:yaml.org,2002:map")),
                    implicit: false,
                    style: MappingStyle::Flow,
                },
                scalar(None, Some("!"), "a"),
                EventData::SequenceStart {
                    anchor: None,
                    tag: None,
                    implicit: true,
                    style: SequenceStyle::Flow,
                },
                scalar(Some("x"), None, "b"),
                EventData::Alias {
                    anchor: String::from("x")
                },
                EventData::SequenceEnd,
                scalar(None, None, "c"),
                EventData::MappingStart {
                    anchor: None,
                    tag: None,
                    implicit: true,
                    style: MappingStyle::Flow,
                },
                EventData::MappingEnd,
                EventData::MappingEnd,
                EventData::DocumentEnd { implicit: true },
                EventData::DocumentStart {
                    version_directive: None,
                    tag_directives: Vec::new(),
                    implicit: false,
                },
                scalar(None, None, "d"),
                EventData::DocumentEnd { implicit: true },
                EventData::StreamEnd,
            ]
        );
    }

    #[test]
    fn scalar_escapes_and_folding() {
        let input = "--- [\"a\\tb\\x41\\u263A\\U0001F600\", \"one\n   two\", \"x\\\n   y\", \"p\n\n  q\"]";
        let values: Vec<String> = events(input)
            .into_iter()
            .filter_map(|event| match event {
                EventData::Scalar { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(
            values,
            ["a\tbA\u{263a}\u{1f600}", "one two", "xy", "p\nq"]
        );
    }

    #[test]
    fn rejects_other_versions() {
        let mut scanner = CanonicalScanner::new();
        scanner.set_input_string("%YAML 1.2\n--- \"a\"");
        match scanner.get_token() {
            Err(ScannerError::Problem { problem, .. }) => {
                assert_eq!(problem, "found incompatible YAML version");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(scanner.get_token().unwrap().is_none());
    }

    #[test]
    fn rejects_non_canonical_content() {
        let mut scanner = CanonicalScanner::new();
        scanner.set_input_string("--- plain");
        assert!(matches!(
            scanner.get_token(),
            Err(ScannerError::Problem {
                problem: "found character that cannot start any token",
                ..
            })
        ));

        let mut scanner = CanonicalScanner::new();
        scanner.set_input_string("--- \"abc");
        match scanner.get_token() {
            Err(ScannerError::Problem {
                problem,
                context_mark,
                ..
            }) => {
                assert_eq!(problem, "found unexpected end of stream");
                assert_eq!(context_mark.column, 4);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn grammar_errors() {
        for (input, expected) in [
            ("--- [\"a\" \"b\"]", "did not find expected ',' or ']'"),
            ("--- { \"a\" : \"b\" }", "did not find expected '?' or '}'"),
            ("--- { ? \"a\" \"b\" }", "did not find expected ':'"),
            ("\"a\"", "did not find expected <document start>"),
            ("--- ]", "did not find expected node content"),
        ] {
            let mut parser = CanonicalParser::new();
            parser.set_input_string(input);
            match parser.get_event() {
                Err(ParserError::Problem { problem, .. }) => assert_eq!(problem, expected),
                other => panic!("{input:?}: unexpected result {other:?}"),
            }
            assert!(!parser.check_event().unwrap());
        }
    }

    #[test]
    fn deep_nesting_uses_no_recursion() {
        let depth = 10_000;
        let input = format!("--- {}{}", "[".repeat(depth), "]".repeat(depth));
        let count = events(&input)
            .iter()
            .filter(|event| matches!(event, EventData::SequenceStart { .. }))
            .count();
        assert_eq!(count, depth);
    }
}
