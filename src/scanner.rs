use std::io::BufRead;

use alloc::collections::VecDeque;
use tracing::trace;

use crate::chars::{
    as_digit, as_hex, is_alpha, is_blank, is_blankz, is_bom, is_break, is_breakz, is_digit,
    is_flow_indicator, is_hex, is_space, is_tab,
};
use crate::{Encoding, Mark, Reader, ReaderError, ScalarStyle, ScannerError, Token, TokenData};

const MAX_NUMBER_LENGTH: usize = 9;

/// A simple key stays a candidate for at most this many characters.
const MAX_SIMPLE_KEY_LENGTH: u64 = 1024;

/// A potential simple key, waiting for the `:` that confirms it.
#[derive(Clone, Debug, Default)]
struct SimpleKey {
    /// Is a simple key possible?
    possible: bool,
    /// Is a simple key required?
    required: bool,
    /// The number of the token.
    token_number: usize,
    /// The position mark.
    mark: Mark,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Chomping {
    Strip,
    Clip,
    Keep,
}

/// Given an input stream, produce a sequence of tokens.
///
/// The scanner fetches tokens one grammar construct at a time into an
/// internal queue. A token is handed out only once it is known not to be
/// preceded by a retroactively inserted `KEY` or `BLOCK-MAPPING-START`.
pub struct Scanner<'r> {
    pub(crate) reader: Reader<'r>,
    /// Have we started to scan the input stream?
    stream_start_produced: bool,
    /// Have we reached the end of the input stream?
    stream_end_produced: bool,
    /// The number of unclosed '[' and '{' indicators.
    flow_level: i32,
    /// The tokens queue.
    tokens: VecDeque<Token>,
    /// The number of tokens fetched from the queue.
    tokens_parsed: usize,
    /// Does the tokens queue contain a token ready for dequeueing.
    token_available: bool,
    /// The indentation levels stack.
    indents: Vec<i64>,
    /// The current indentation level.
    indent: i64,
    /// May a simple key occur at the current position?
    simple_key_allowed: bool,
    /// The stack of simple keys, one per flow level.
    simple_keys: Vec<SimpleKey>,
}

impl<'r> Default for Scanner<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Scanner<'r> {
    pub fn new() -> Scanner<'r> {
        Scanner {
            reader: Reader::new(),
            stream_start_produced: false,
            stream_end_produced: false,
            flow_level: 0,
            tokens: VecDeque::with_capacity(16),
            tokens_parsed: 0,
            token_available: false,
            indents: Vec::with_capacity(16),
            indent: 0,
            simple_key_allowed: false,
            simple_keys: Vec::with_capacity(16),
        }
    }

    /// Set a string input.
    pub fn set_input_string(&mut self, input: &'r str) {
        self.reader.set_input_string(input);
    }

    /// Set a generic input handler.
    pub fn set_input(&mut self, input: &'r mut dyn BufRead) {
        self.reader.set_input(input);
    }

    /// Set the source encoding.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.reader.set_encoding(encoding);
    }

    /// Set the name reported in marks.
    pub fn set_name(&mut self, name: &str) {
        self.reader.set_name(name);
    }

    /// Is there another token?
    pub fn check_token(&mut self) -> Result<bool, ScannerError> {
        Ok(self.peek_token()?.is_some())
    }

    /// Look at the next token without consuming it.
    ///
    /// Returns `None` once the STREAM-END token has been consumed.
    pub fn peek_token(&mut self) -> Result<Option<&Token>, ScannerError> {
        if self.stream_end_produced {
            return Ok(None);
        }
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        Ok(self.tokens.front())
    }

    pub(crate) fn peek_token_mut(&mut self) -> Result<Option<&mut Token>, ScannerError> {
        if self.stream_end_produced {
            return Ok(None);
        }
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        Ok(self.tokens.front_mut())
    }

    /// Scan the input stream and produce the next token.
    ///
    /// The first token is STREAM-START and the last one is STREAM-END; after
    /// that, `None` is returned.
    pub fn get_token(&mut self) -> Result<Option<Token>, ScannerError> {
        if self.stream_end_produced {
            return Ok(None);
        }
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let token = self.tokens.pop_front();
        if let Some(token) = &token {
            self.token_available = false;
            self.tokens_parsed += 1;
            if let TokenData::StreamEnd = token.data {
                self.stream_end_produced = true;
            }
            trace!(
                "Token {} at {}:{}",
                token.data.kind(),
                token.start_mark.line,
                token.start_mark.column
            );
        }
        Ok(token)
    }

    /// Drop the token returned by the last `peek_token`.
    pub(crate) fn skip_token(&mut self) {
        self.token_available = false;
        self.tokens_parsed = self.tokens_parsed.wrapping_add(1);
        if let Some(token) = self.tokens.pop_front() {
            if let TokenData::StreamEnd = token.data {
                self.stream_end_produced = true;
            }
            trace!(
                "Token {} at {}:{}",
                token.data.kind(),
                token.start_mark.line,
                token.start_mark.column
            );
        }
    }

    fn cache(&mut self, length: usize) -> Result<(), ReaderError> {
        self.reader.cache(length)
    }

    fn ch(&self) -> Option<char> {
        self.reader.peek(0)
    }

    fn ch_at(&self, offset: usize) -> Option<char> {
        self.reader.peek(offset)
    }

    fn check(&self, ch: char) -> bool {
        self.reader.check(ch)
    }

    fn check_at(&self, ch: char, offset: usize) -> bool {
        self.reader.check_at(ch, offset)
    }

    fn column(&self) -> i64 {
        self.reader.column() as i64
    }

    fn mark(&self) -> Mark {
        self.reader.mark()
    }

    fn skip(&mut self) {
        self.reader.forward(1);
    }

    fn skip_line(&mut self) {
        if self.check('\r') && self.check_at('\n', 1) {
            self.reader.forward(2);
        } else if is_break(self.ch()) {
            self.reader.forward(1);
        }
    }

    fn read(&mut self, string: &mut String) {
        if let Some(ch) = self.ch() {
            string.push(ch);
            self.reader.forward(1);
        }
    }

    fn read_line(&mut self, string: &mut String) {
        if self.check('\r') && self.check_at('\n', 1) {
            string.push('\n');
            self.reader.forward(2);
        } else if let Some(ch) = self.ch().filter(|ch| is_break(*ch)) {
            // Unicode line and paragraph separators are kept as they are.
            if ch == '\u{2028}' || ch == '\u{2029}' {
                string.push(ch);
            } else {
                string.push('\n');
            }
            self.reader.forward(1);
        }
    }

    /// `---` or `...` at the start of a line, followed by a blank.
    fn at_document_indicator(&self) -> bool {
        self.reader.column() == 0
            && (self.check('-') && self.check_at('-', 1) && self.check_at('-', 2)
                || self.check('.') && self.check_at('.', 1) && self.check_at('.', 2))
            && is_blankz(self.ch_at(3))
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
            problem_mark: self.mark(),
        })
    }

    fn fetch_more_tokens(&mut self) -> Result<(), ScannerError> {
        loop {
            let mut need_more_tokens = false;
            if self.tokens.is_empty() {
                need_more_tokens = true;
            } else {
                self.stale_simple_keys()?;
                for simple_key in &self.simple_keys {
                    if simple_key.possible && simple_key.token_number == self.tokens_parsed {
                        need_more_tokens = true;
                        break;
                    }
                }
            }
            if !need_more_tokens {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<(), ScannerError> {
        self.cache(1)?;
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        let mark = self.mark();
        self.unroll_indent(self.column(), &mark);
        self.cache(4)?;

        let Some(ch) = self.ch() else {
            return self.fetch_stream_end();
        };
        let next = self.ch_at(1);

        if self.reader.column() == 0 && ch == '%' {
            return self.fetch_directive();
        }
        if self.at_document_indicator() {
            return self.fetch_document_indicator(if ch == '-' {
                TokenData::DocumentStart
            } else {
                TokenData::DocumentEnd
            });
        }
        match ch {
            '[' => return self.fetch_flow_collection_start(TokenData::FlowSequenceStart),
            '{' => return self.fetch_flow_collection_start(TokenData::FlowMappingStart),
            ']' => return self.fetch_flow_collection_end(TokenData::FlowSequenceEnd),
            '}' => return self.fetch_flow_collection_end(TokenData::FlowMappingEnd),
            ',' => return self.fetch_flow_entry(),
            '-' if is_blankz(next) => return self.fetch_block_entry(),
            '?' if self.flow_level != 0 || is_blankz(next) => return self.fetch_key(),
            ':' if self.flow_level != 0 || is_blankz(next) => return self.fetch_value(),
            '*' => return self.fetch_anchor(true),
            '&' => return self.fetch_anchor(false),
            '!' => return self.fetch_tag(),
            '|' if self.flow_level == 0 => return self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => return self.fetch_block_scalar(false),
            '\'' => return self.fetch_flow_scalar(true),
            '"' => return self.fetch_flow_scalar(false),
            _ => {}
        }

        let starts_plain = !(is_blankz(ch) || "-?:,[]{}#&*!|>'\"%@`".contains(ch))
            || ch == '-' && !is_blank(next)
            || self.flow_level == 0 && (ch == '?' || ch == ':') && !is_blankz(next);
        if starts_plain {
            return self.fetch_plain_scalar();
        }
        self.error(
            "while scanning for the next token",
            self.mark(),
            "found character that cannot start any token",
        )
    }

    /// Invalidate simple keys that can no longer be completed: a simple key
    /// is limited to a single line and to 1024 characters.
    fn stale_simple_keys(&mut self) -> Result<(), ScannerError> {
        let line = self.reader.line();
        let index = self.reader.index();
        for simple_key in &mut self.simple_keys {
            let mark = &simple_key.mark;
            if simple_key.possible
                && (mark.line < line || mark.index + MAX_SIMPLE_KEY_LENGTH < index)
            {
                if simple_key.required {
                    return Err(ScannerError::Problem {
                        context: "while scanning a simple key",
                        context_mark: mark.clone(),
                        problem: "could not find expected ':'",
                        problem_mark: self.reader.mark(),
                    });
                }
                simple_key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<(), ScannerError> {
        if self.simple_key_allowed {
            let required = self.flow_level == 0 && self.indent == self.column();
            let simple_key = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_parsed + self.tokens.len(),
                mark: self.mark(),
            };
            self.remove_simple_key()?;
            if let Some(last) = self.simple_keys.last_mut() {
                *last = simple_key;
            }
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), ScannerError> {
        let Some(simple_key) = self.simple_keys.last_mut() else {
            return Ok(());
        };
        if simple_key.possible && simple_key.required {
            return Err(ScannerError::Problem {
                context: "while scanning a simple key",
                context_mark: simple_key.mark.clone(),
                problem: "could not find expected ':'",
                problem_mark: self.reader.mark(),
            });
        }
        simple_key.possible = false;
        Ok(())
    }

    fn increase_flow_level(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == i32::MAX {
            return self.error(
                "while increasing flow level",
                self.mark(),
                "exceeded maximum flow level",
            );
        }
        self.simple_keys.push(SimpleKey::default());
        self.flow_level += 1;
        Ok(())
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level != 0 {
            self.flow_level -= 1;
            let _ = self.simple_keys.pop();
        }
    }

    /// Push the current indentation level and emit `data` if `column` is
    /// deeper. `number` is the queue position of a retroactive insertion.
    fn roll_indent(&mut self, column: i64, number: Option<usize>, data: TokenData, mark: Mark) {
        if self.flow_level != 0 || self.indent >= column {
            return;
        }
        self.indents.push(self.indent);
        self.indent = column;
        let token = Token::new(data, mark.clone(), mark);
        match number {
            None => self.tokens.push_back(token),
            Some(number) => self.tokens.insert(number - self.tokens_parsed, token),
        }
    }

    /// Pop indentation levels deeper than `column`, emitting a BLOCK-END for
    /// each of them.
    fn unroll_indent(&mut self, column: i64, mark: &Mark) {
        if self.flow_level != 0 {
            return;
        }
        while self.indent > column {
            self.tokens
                .push_back(Token::new(TokenData::BlockEnd, mark.clone(), mark.clone()));
            self.indent = self.indents.pop().unwrap_or(-1);
        }
    }

    fn fetch_stream_start(&mut self) {
        self.indent = -1;
        self.simple_keys.push(SimpleKey::default());
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        let mark = self.mark();
        self.tokens.push_back(Token::new(
            TokenData::StreamStart {
                encoding: self.reader.encoding(),
            },
            mark.clone(),
            mark,
        ));
    }

    fn fetch_stream_end(&mut self) -> Result<(), ScannerError> {
        // The stream ends on a line of its own.
        let mut mark = self.mark();
        if mark.column != 0 {
            mark.column = 0;
            mark.line += 1;
        }
        self.unroll_indent(-1, &mark);
        for simple_key in &mut self.simple_keys {
            if simple_key.possible && simple_key.required {
                return Err(ScannerError::Problem {
                    context: "while scanning a simple key",
                    context_mark: simple_key.mark.clone(),
                    problem: "could not find expected ':'",
                    problem_mark: mark,
                });
            }
            simple_key.possible = false;
        }
        self.simple_key_allowed = false;
        self.tokens
            .push_back(Token::new(TokenData::StreamEnd, mark.clone(), mark));
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), ScannerError> {
        let mark = self.mark();
        self.unroll_indent(-1, &mark);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<(), ScannerError> {
        let start_mark = self.mark();
        self.unroll_indent(-1, &start_mark);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        self.reader.forward(3);
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(data, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.increase_flow_level()?;
        self.simple_key_allowed = true;
        let start_mark = self.mark();
        self.skip();
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(data, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        let start_mark = self.mark();
        self.skip();
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(data, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.mark();
        self.skip();
        let end_mark = self.mark();
        self.tokens
            .push_back(Token::new(TokenData::FlowEntry, start_mark, end_mark));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return self.error(
                    "",
                    self.mark(),
                    "block sequence entries are not allowed in this context",
                );
            }
            self.roll_indent(
                self.column(),
                None,
                TokenData::BlockSequenceStart,
                self.mark(),
            );
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.mark();
        self.skip();
        let end_mark = self.mark();
        self.tokens
            .push_back(Token::new(TokenData::BlockEntry, start_mark, end_mark));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return self.error(
                    "",
                    self.mark(),
                    "mapping keys are not allowed in this context",
                );
            }
            self.roll_indent(
                self.column(),
                None,
                TokenData::BlockMappingStart,
                self.mark(),
            );
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        let start_mark = self.mark();
        self.skip();
        let end_mark = self.mark();
        self.tokens
            .push_back(Token::new(TokenData::Key, start_mark, end_mark));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScannerError> {
        let pending_key = match self.simple_keys.last_mut() {
            Some(simple_key) if simple_key.possible => {
                simple_key.possible = false;
                Some((simple_key.token_number, simple_key.mark.clone()))
            }
            _ => None,
        };

        if let Some((token_number, mark)) = pending_key {
            // Splice KEY (and maybe BLOCK-MAPPING-START) in front of the
            // tokens already queued for the key.
            self.tokens.insert(
                token_number - self.tokens_parsed,
                Token::new(TokenData::Key, mark.clone(), mark.clone()),
            );
            self.roll_indent(
                mark.column as i64,
                Some(token_number),
                TokenData::BlockMappingStart,
                mark,
            );
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return self.error(
                        "",
                        self.mark(),
                        "mapping values are not allowed in this context",
                    );
                }
                self.roll_indent(
                    self.column(),
                    None,
                    TokenData::BlockMappingStart,
                    self.mark(),
                );
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        let start_mark = self.mark();
        self.skip();
        let end_mark = self.mark();
        self.tokens
            .push_back(Token::new(TokenData::Value, start_mark, end_mark));
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_to_next_token(&mut self) -> Result<(), ScannerError> {
        loop {
            self.cache(1)?;
            if self.reader.column() == 0 && is_bom(self.ch()) {
                self.skip();
            }
            self.cache(1)?;
            while self.check(' ')
                || (self.flow_level != 0 || !self.simple_key_allowed) && self.check('\t')
            {
                self.skip();
                self.cache(1)?;
            }
            if self.check('#') {
                while !is_breakz(self.ch()) {
                    self.skip();
                    self.cache(1)?;
                }
            }
            if !is_break(self.ch()) {
                break;
            }
            self.cache(2)?;
            self.skip_line();
            if self.flow_level == 0 {
                self.simple_key_allowed = true;
            }
        }
        Ok(())
    }

    fn skip_blanks(&mut self) -> Result<(), ScannerError> {
        self.cache(1)?;
        while is_blank(self.ch()) {
            self.skip();
            self.cache(1)?;
        }
        Ok(())
    }

    /// Skip trailing blanks and an optional comment, then require the end of
    /// the line.
    fn scan_line_end(&mut self, context: &'static str, start_mark: &Mark) -> Result<(), ScannerError> {
        self.skip_blanks()?;
        if self.check('#') {
            while !is_breakz(self.ch()) {
                self.skip();
                self.cache(1)?;
            }
        }
        if !is_breakz(self.ch()) {
            return self.error(
                context,
                start_mark.clone(),
                "did not find expected comment or line break",
            );
        }
        if is_break(self.ch()) {
            self.cache(2)?;
            self.skip_line();
        }
        Ok(())
    }

    fn scan_directive(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.mark();
        self.skip();
        let name = self.scan_directive_name(&start_mark)?;
        let data = match name.as_str() {
            "YAML" => {
                let (major, minor) = self.scan_version_directive_value(&start_mark)?;
                TokenData::VersionDirective { major, minor }
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(&start_mark)?;
                TokenData::TagDirective { handle, prefix }
            }
            _ => {
                while !is_breakz(self.ch()) {
                    self.skip();
                    self.cache(1)?;
                }
                TokenData::ReservedDirective { name }
            }
        };
        let end_mark = self.mark();
        self.scan_line_end("while scanning a directive", &start_mark)?;
        Ok(Token::new(data, start_mark, end_mark))
    }

    fn scan_directive_name(&mut self, start_mark: &Mark) -> Result<String, ScannerError> {
        let mut string = String::new();
        self.cache(1)?;
        while is_alpha(self.ch()) {
            self.read(&mut string);
            self.cache(1)?;
        }

        if string.is_empty() {
            self.error(
                "while scanning a directive",
                start_mark.clone(),
                "could not find expected directive name",
            )
        } else if !is_blankz(self.ch()) {
            self.error(
                "while scanning a directive",
                start_mark.clone(),
                "found unexpected non-alphabetical character",
            )
        } else {
            Ok(string)
        }
    }

    fn scan_version_directive_value(
        &mut self,
        start_mark: &Mark,
    ) -> Result<(i32, i32), ScannerError> {
        self.skip_blanks()?;
        let major = self.scan_version_directive_number(start_mark)?;
        if !self.check('.') {
            return self.error(
                "while scanning a %YAML directive",
                start_mark.clone(),
                "did not find expected digit or '.' character",
            );
        }
        self.skip();
        let minor = self.scan_version_directive_number(start_mark)?;
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start_mark: &Mark) -> Result<i32, ScannerError> {
        let mut value: i32 = 0;
        let mut length = 0;
        self.cache(1)?;
        while let Some(ch) = self.ch().filter(|ch| is_digit(*ch)) {
            length += 1;
            if length > MAX_NUMBER_LENGTH {
                return self.error(
                    "while scanning a %YAML directive",
                    start_mark.clone(),
                    "found extremely long version number",
                );
            }
            value = value * 10 + as_digit(ch) as i32;
            self.skip();
            self.cache(1)?;
        }
        if length == 0 {
            return self.error(
                "while scanning a %YAML directive",
                start_mark.clone(),
                "did not find expected version number",
            );
        }
        Ok(value)
    }

    // Returns (handle, prefix)
    fn scan_tag_directive_value(
        &mut self,
        start_mark: &Mark,
    ) -> Result<(String, String), ScannerError> {
        self.skip_blanks()?;
        let handle = self.scan_tag_handle(true, start_mark)?;
        self.cache(1)?;
        if !is_blank(self.ch()) {
            return self.error(
                "while scanning a %TAG directive",
                start_mark.clone(),
                "did not find expected whitespace",
            );
        }
        self.skip_blanks()?;
        let prefix = self.scan_tag_uri(true, true, None, start_mark)?;
        self.cache(1)?;
        if !is_blankz(self.ch()) {
            return self.error(
                "while scanning a %TAG directive",
                start_mark.clone(),
                "did not find expected whitespace or line break",
            );
        }
        Ok((handle, prefix))
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let start_mark = self.mark();
        self.skip();
        self.cache(1)?;
        while is_alpha(self.ch()) {
            self.read(&mut string);
            self.cache(1)?;
        }
        let end_mark = self.mark();
        let terminated =
            is_blankz(self.ch()) || matches!(self.ch(), Some('?' | ':' | ',' | ']' | '}' | '%' | '@' | '`'));
        if string.is_empty() || !terminated {
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
        let data = if alias {
            TokenData::Alias { value: string }
        } else {
            TokenData::Anchor { value: string }
        };
        Ok(Token::new(data, start_mark, end_mark))
    }

    fn scan_tag(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.mark();
        self.cache(2)?;

        let (handle, suffix) = if self.check_at('<', 1) {
            self.reader.forward(2);
            let suffix = self.scan_tag_uri(true, false, None, &start_mark)?;
            if !self.check('>') {
                return self.error(
                    "while scanning a tag",
                    start_mark,
                    "did not find the expected '>'",
                );
            }
            self.skip();
            (String::new(), suffix)
        } else {
            let handle = self.scan_tag_handle(false, &start_mark)?;
            if handle.len() > 1 && handle.starts_with('!') && handle.ends_with('!') {
                let suffix = self.scan_tag_uri(false, false, None, &start_mark)?;
                (handle, suffix)
            } else {
                // The handle was really the start of a local tag such as `!foo`.
                let suffix = self.scan_tag_uri(false, false, Some(&handle), &start_mark)?;
                if suffix.is_empty() {
                    (String::new(), String::from("!"))
                } else {
                    (String::from("!"), suffix)
                }
            }
        };

        self.cache(1)?;
        if !is_blankz(self.ch()) && (self.flow_level == 0 || !self.check(',')) {
            return self.error(
                "while scanning a tag",
                start_mark,
                "did not find expected whitespace or line break",
            );
        }

        let end_mark = self.mark();
        Ok(Token::new(
            TokenData::Tag { handle, suffix },
            start_mark,
            end_mark,
        ))
    }

    fn scan_tag_handle(&mut self, directive: bool, start_mark: &Mark) -> Result<String, ScannerError> {
        let context = if directive {
            "while scanning a %TAG directive"
        } else {
            "while scanning a tag"
        };
        let mut string = String::new();
        self.cache(1)?;
        if !self.check('!') {
            return self.error(context, start_mark.clone(), "did not find expected '!'");
        }

        self.read(&mut string);
        self.cache(1)?;
        while is_alpha(self.ch()) {
            self.read(&mut string);
            self.cache(1)?;
        }
        if self.check('!') {
            self.read(&mut string);
        } else if directive && string != "!" {
            return self.error(context, start_mark.clone(), "did not find expected '!'");
        }
        Ok(string)
    }

    fn scan_tag_uri(
        &mut self,
        uri_char: bool,
        directive: bool,
        head: Option<&str>,
        start_mark: &Mark,
    ) -> Result<String, ScannerError> {
        let head = head.unwrap_or("");
        let mut length = head.len();
        let mut string = String::new();
        if length > 1 {
            string.push_str(&head[1..]);
        }
        self.cache(1)?;

        loop {
            let Some(ch) = self.ch() else { break };
            let allowed = is_alpha(ch)
                || ";/?:@&=+$.%!~*'()".contains(ch)
                || uri_char && ",[]".contains(ch);
            if !allowed {
                break;
            }
            if ch == '%' {
                self.scan_uri_escapes(directive, start_mark, &mut string)?;
            } else {
                self.read(&mut string);
            }
            length += 1;
            self.cache(1)?;
        }

        if length == 0 {
            return self.error(
                if directive {
                    "while scanning a %TAG directive"
                } else {
                    "while scanning a tag"
                },
                start_mark.clone(),
                "did not find expected tag URI",
            );
        }
        Ok(string)
    }

    /// Decode a run of `%XX` escapes forming one UTF-8 character.
    fn scan_uri_escapes(
        &mut self,
        directive: bool,
        start_mark: &Mark,
        string: &mut String,
    ) -> Result<(), ScannerError> {
        let context = if directive {
            "while scanning a %TAG directive"
        } else {
            "while scanning a tag"
        };
        let mut octets = Vec::with_capacity(4);
        let mut width = 0;
        loop {
            self.cache(3)?;
            let (Some(high), Some(low)) = (self.ch_at(1), self.ch_at(2)) else {
                return self.error(context, start_mark.clone(), "did not find URI escaped octet");
            };
            if !(self.check('%') && is_hex(high) && is_hex(low)) {
                return self.error(context, start_mark.clone(), "did not find URI escaped octet");
            }
            let octet = ((as_hex(high) << 4) + as_hex(low)) as u8;
            if width == 0 {
                width = match octet {
                    octet if octet & 0x80 == 0 => 1,
                    octet if octet & 0xE0 == 0xC0 => 2,
                    octet if octet & 0xF0 == 0xE0 => 3,
                    octet if octet & 0xF8 == 0xF0 => 4,
                    _ => {
                        return self.error(
                            context,
                            start_mark.clone(),
                            "found an incorrect leading UTF-8 octet",
                        );
                    }
                };
            } else if octet & 0xC0 != 0x80 {
                return self.error(
                    context,
                    start_mark.clone(),
                    "found an incorrect trailing UTF-8 octet",
                );
            }
            octets.push(octet);
            self.reader.forward(3);
            if octets.len() == width {
                break;
            }
        }
        match core::str::from_utf8(&octets) {
            Ok(decoded) => {
                string.push_str(decoded);
                Ok(())
            }
            Err(_) => self.error(
                context,
                start_mark.clone(),
                "found an invalid UTF-8 sequence",
            ),
        }
    }

    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut chomping = Chomping::Clip;
        let mut increment: i64 = 0;
        let mut indent: i64 = 0;
        let mut leading_blank = false;
        let start_mark = self.mark();
        self.skip();
        self.cache(1)?;

        // The header holds a chomping indicator and an indentation
        // indicator, in either order.
        for _ in 0..2 {
            match self.ch() {
                Some('+') if chomping == Chomping::Clip => {
                    chomping = Chomping::Keep;
                    self.skip();
                }
                Some('-') if chomping == Chomping::Clip => {
                    chomping = Chomping::Strip;
                    self.skip();
                }
                Some('0') if increment == 0 => {
                    return self.error(
                        "while scanning a block scalar",
                        start_mark,
                        "found an indentation indicator equal to 0",
                    );
                }
                Some(ch @ '1'..='9') if increment == 0 => {
                    increment = i64::from(as_digit(ch));
                    self.skip();
                }
                _ => break,
            }
            self.cache(1)?;
        }

        self.scan_line_end("while scanning a block scalar", &start_mark)?;

        let mut end_mark = self.mark();
        if increment != 0 {
            indent = if self.indent >= 0 {
                self.indent + increment
            } else {
                increment
            };
        }
        self.scan_block_scalar_breaks(&mut indent, &mut trailing_breaks, &start_mark, &mut end_mark)?;
        self.cache(1)?;

        while self.column() == indent && self.ch().is_some() {
            let trailing_blank = is_blank(self.ch());
            if !literal && leading_break.starts_with('\n') && !leading_blank && !trailing_blank {
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
                leading_break.clear();
            } else {
                string.push_str(&leading_break);
                leading_break.clear();
            }
            string.push_str(&trailing_breaks);
            trailing_breaks.clear();
            leading_blank = is_blank(self.ch());
            while !is_breakz(self.ch()) {
                self.read(&mut string);
                self.cache(1)?;
            }
            self.cache(2)?;
            self.read_line(&mut leading_break);
            self.scan_block_scalar_breaks(
                &mut indent,
                &mut trailing_breaks,
                &start_mark,
                &mut end_mark,
            )?;
        }

        if chomping != Chomping::Strip {
            string.push_str(&leading_break);
        }
        if chomping == Chomping::Keep {
            string.push_str(&trailing_breaks);
        }

        let style = if literal {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style,
            },
            start_mark,
            end_mark,
        ))
    }

    /// Consume empty lines and indentation. When `indent` is still 0 it is
    /// set from the most indented of those lines.
    fn scan_block_scalar_breaks(
        &mut self,
        indent: &mut i64,
        breaks: &mut String,
        start_mark: &Mark,
        end_mark: &mut Mark,
    ) -> Result<(), ScannerError> {
        let mut max_indent: i64 = 0;
        *end_mark = self.mark();
        loop {
            self.cache(1)?;
            while (*indent == 0 || self.column() < *indent) && is_space(self.ch()) {
                self.skip();
                self.cache(1)?;
            }
            max_indent = max_indent.max(self.column());
            if (*indent == 0 || self.column() < *indent) && is_tab(self.ch()) {
                return self.error(
                    "while scanning a block scalar",
                    start_mark.clone(),
                    "found a tab character where an indentation space is expected",
                );
            }
            if !is_break(self.ch()) {
                break;
            }
            self.cache(2)?;
            self.read_line(breaks);
            *end_mark = self.mark();
        }
        if *indent == 0 {
            *indent = max_indent.max(self.indent + 1).max(1);
        }
        Ok(())
    }

    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let quote = if single { '\'' } else { '"' };

        let start_mark = self.mark();
        self.skip();
        loop {
            self.cache(4)?;
            if self.at_document_indicator() {
                return self.error(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected document indicator",
                );
            }
            if self.ch().is_none() {
                return self.error(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected end of stream",
                );
            }

            self.cache(2)?;
            let mut leading_blanks = false;
            while !is_blankz(self.ch()) {
                if single && self.check('\'') && self.check_at('\'', 1) {
                    string.push('\'');
                    self.reader.forward(2);
                } else if self.check(quote) {
                    break;
                } else if !single && self.check('\\') && is_break(self.ch_at(1)) {
                    // An escaped line break joins the lines without a space.
                    self.cache(3)?;
                    self.skip();
                    self.skip_line();
                    leading_blanks = true;
                    break;
                } else if !single && self.check('\\') {
                    let code_length = match self.ch_at(1) {
                        Some(escape) => match escape {
                            'x' => 2,
                            'u' => 4,
                            'U' => 8,
                            _ => {
                                let Some(unescaped) = unescape(escape) else {
                                    return self.error(
                                        "while scanning a quoted scalar",
                                        start_mark,
                                        "found unknown escape character",
                                    );
                                };
                                string.push(unescaped);
                                0
                            }
                        },
                        None => {
                            return self.error(
                                "while scanning a quoted scalar",
                                start_mark,
                                "found unexpected end of stream",
                            );
                        }
                    };
                    self.reader.forward(2);
                    if code_length != 0 {
                        self.cache(code_length)?;
                        let mut value: u32 = 0;
                        for k in 0..code_length {
                            match self.ch_at(k).filter(|ch| is_hex(*ch)) {
                                Some(digit) => value = (value << 4) + as_hex(digit),
                                None => {
                                    return self.error(
                                        "while scanning a quoted scalar",
                                        start_mark,
                                        "did not find expected hexdecimal number",
                                    );
                                }
                            }
                        }
                        let Some(ch) = char::from_u32(value) else {
                            return self.error(
                                "while scanning a quoted scalar",
                                start_mark,
                                "found invalid Unicode character escape code",
                            );
                        };
                        string.push(ch);
                        self.reader.forward(code_length);
                    }
                } else {
                    self.read(&mut string);
                }
                self.cache(2)?;
            }

            self.cache(1)?;
            if self.check(quote) {
                break;
            }

            self.cache(1)?;
            while is_blank(self.ch()) || is_break(self.ch()) {
                if is_blank(self.ch()) {
                    if leading_blanks {
                        self.skip();
                    } else {
                        self.read(&mut whitespaces);
                    }
                } else {
                    self.cache(2)?;
                    if leading_blanks {
                        self.read_line(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.read_line(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.cache(1)?;
            }

            if leading_blanks {
                fold_breaks(&mut string, &mut leading_break, &mut trailing_breaks);
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        }

        self.skip();
        let end_mark = self.mark();
        let style = if single {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style,
            },
            start_mark,
            end_mark,
        ))
    }

    fn scan_plain_scalar(&mut self) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;
        let indent = self.indent + 1;
        let start_mark = self.mark();
        let mut end_mark = start_mark.clone();

        loop {
            self.cache(4)?;
            if self.at_document_indicator() || self.check('#') {
                break;
            }
            while !is_blankz(self.ch()) {
                if self.flow_level != 0
                    && self.check(':')
                    && !(is_blankz(self.ch_at(1)) || is_flow_indicator(self.ch_at(1)))
                {
                    return self.error(
                        "while scanning a plain scalar",
                        start_mark,
                        "found unexpected ':'",
                    );
                }
                if self.check(':') && is_blankz(self.ch_at(1))
                    || self.flow_level != 0
                        && (is_flow_indicator(self.ch()) || self.check(':') || self.check('?'))
                {
                    break;
                }
                if leading_blanks {
                    fold_breaks(&mut string, &mut leading_break, &mut trailing_breaks);
                    leading_blanks = false;
                } else if !whitespaces.is_empty() {
                    string.push_str(&whitespaces);
                    whitespaces.clear();
                }
                self.read(&mut string);
                end_mark = self.mark();
                self.cache(2)?;
            }
            if !(is_blank(self.ch()) || is_break(self.ch())) {
                break;
            }
            self.cache(1)?;

            while is_blank(self.ch()) || is_break(self.ch()) {
                if is_blank(self.ch()) {
                    if leading_blanks && self.column() < indent && is_tab(self.ch()) {
                        return self.error(
                            "while scanning a plain scalar",
                            start_mark,
                            "found a tab character that violates indentation",
                        );
                    } else if leading_blanks {
                        self.skip();
                    } else {
                        self.read(&mut whitespaces);
                    }
                } else {
                    self.cache(2)?;
                    if leading_blanks {
                        self.read_line(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.read_line(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.cache(1)?;
            }
            if self.flow_level == 0 && self.column() < indent {
                break;
            }
        }

        if leading_blanks {
            self.simple_key_allowed = true;
        }
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        ))
    }
}

/// Join a line break and the empty lines after it into `string`: a single
/// break folds into a space, further breaks are kept.
fn fold_breaks(string: &mut String, leading_break: &mut String, trailing_breaks: &mut String) {
    if leading_break.starts_with('\n') {
        if trailing_breaks.is_empty() {
            string.push(' ');
        } else {
            string.push_str(trailing_breaks);
            trailing_breaks.clear();
        }
        leading_break.clear();
    } else {
        string.push_str(leading_break);
        string.push_str(trailing_breaks);
        leading_break.clear();
        trailing_breaks.clear();
    }
}

/// The character for a single-character escape in a double-quoted scalar.
pub(crate) fn unescape(escape: char) -> Option<char> {
    Some(match escape {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\x0B',
        'f' => '\x0C',
        'r' => '\r',
        'e' => '\x1B',
        ' ' => ' ',
        '"' => '"',
        '/' => '/',
        '\\' => '\\',
        'N' => '\u{0085}',
        '_' => '\u{00A0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

impl<'r> Iterator for Scanner<'r> {
    type Item = Result<Token, ScannerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_token().transpose()
    }
}

impl<'r> core::iter::FusedIterator for Scanner<'r> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(input: &str) -> Result<Vec<Token>, ScannerError> {
        let mut scanner = Scanner::new();
        scanner.set_input_string(input);
        scanner.collect()
    }

    fn kinds(input: &str) -> Vec<&'static str> {
        scan(input)
            .unwrap()
            .iter()
            .map(|token| token.data.kind())
            .collect()
    }

    fn scalars(input: &str) -> Vec<(String, ScalarStyle)> {
        scan(input)
            .unwrap()
            .into_iter()
            .filter_map(|token| match token.data {
                TokenData::Scalar { value, style } => Some((value, style)),
                _ => None,
            })
            .collect()
    }

    fn position(mark: &Mark) -> (u64, u64, u64) {
        (mark.index, mark.line, mark.column)
    }

    #[test]
    fn scanner_marks() {
        let tokens = scan("b:\nc: true").unwrap();
        let actual: Vec<_> = tokens
            .iter()
            .map(|token| {
                (
                    token.data.kind(),
                    position(&token.start_mark),
                    position(&token.end_mark),
                )
            })
            .collect();
        let expected = vec![
            ("STREAM-START", (0, 0, 0), (0, 0, 0)),
            ("BLOCK-MAPPING-START", (0, 0, 0), (0, 0, 0)),
            ("KEY", (0, 0, 0), (0, 0, 0)),
            ("SCALAR", (0, 0, 0), (1, 0, 1)),
            ("VALUE", (1, 0, 1), (2, 0, 2)),
            ("KEY", (3, 1, 0), (3, 1, 0)),
            ("SCALAR", (3, 1, 0), (4, 1, 1)),
            ("VALUE", (4, 1, 1), (5, 1, 2)),
            ("SCALAR", (6, 1, 3), (10, 1, 7)),
            ("BLOCK-END", (10, 2, 0), (10, 2, 0)),
            ("STREAM-END", (10, 2, 0), (10, 2, 0)),
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn flow_mapping_with_nested_sequence() {
        assert_eq!(
            kinds("{a: 1, b: [2, 3]}"),
            vec![
                "STREAM-START",
                "FLOW-MAPPING-START",
                "KEY",
                "SCALAR",
                "VALUE",
                "SCALAR",
                "FLOW-ENTRY",
                "KEY",
                "SCALAR",
                "VALUE",
                "FLOW-SEQUENCE-START",
                "SCALAR",
                "FLOW-ENTRY",
                "SCALAR",
                "FLOW-SEQUENCE-END",
                "FLOW-MAPPING-END",
                "STREAM-END",
            ]
        );
    }

    #[test]
    fn nested_block_sequence_indentation() {
        let input = "   - a\n   -\n     - b\n     - c\n   - d\n";
        let tokens = scan(input).unwrap();
        let starts: Vec<_> = tokens
            .iter()
            .filter(|token| token.data == TokenData::BlockSequenceStart)
            .map(|token| token.start_mark.column)
            .collect();
        assert_eq!(starts, vec![3, 5]);

        // The nested sequence closes exactly once, right before `- d`.
        let d_entry = tokens
            .iter()
            .rposition(|token| token.data == TokenData::BlockEntry)
            .unwrap();
        assert_eq!(tokens[d_entry - 1].data, TokenData::BlockEnd);
        assert_ne!(tokens[d_entry - 2].data, TokenData::BlockEnd);
        assert_eq!(
            tokens
                .iter()
                .filter(|token| token.data == TokenData::BlockEnd)
                .count(),
            2
        );
    }

    #[test]
    fn unterminated_double_quote_reports_opening_quote() {
        let err = scan("\"abc").unwrap_err();
        let ScannerError::Problem {
            context,
            context_mark,
            problem,
            problem_mark,
        } = err
        else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(context, "while scanning a quoted scalar");
        assert_eq!(problem, "found unexpected end of stream");
        assert_eq!(position(&context_mark), (0, 0, 0));
        assert_eq!(position(&problem_mark), (4, 0, 4));
    }

    #[test]
    fn double_quoted_escapes() {
        assert_eq!(
            scalars(r#""tab\there \x41\u00e9\U0001F600 \N\_\L\P\\\"""#),
            vec![(
                String::from("tab\there A\u{e9}\u{1F600} \u{85}\u{a0}\u{2028}\u{2029}\\\""),
                ScalarStyle::DoubleQuoted
            )]
        );
    }

    #[test]
    fn quoted_scalar_folding() {
        assert_eq!(
            scalars("'it''s\n  folded\n\n  twice'"),
            vec![(String::from("it's folded\ntwice"), ScalarStyle::SingleQuoted)]
        );
        assert_eq!(
            scalars("\"joined\\\n   line\""),
            vec![(String::from("joinedline"), ScalarStyle::DoubleQuoted)]
        );
    }

    #[test]
    fn unknown_escape_is_an_error() {
        let err = scan(r#""\q""#).unwrap_err();
        assert!(
            matches!(err, ScannerError::Problem { problem: "found unknown escape character", .. }),
            "{err:?}"
        );
    }

    #[test]
    fn block_scalar_chomping() {
        let input = "- |\n  text\n\n- |-\n  text\n\n- |+\n  text\n\n- >\n  a\n  b\n\n  c\n";
        assert_eq!(
            scalars(input),
            vec![
                (String::from("text\n"), ScalarStyle::Literal),
                (String::from("text"), ScalarStyle::Literal),
                (String::from("text\n\n"), ScalarStyle::Literal),
                (String::from("a b\nc\n"), ScalarStyle::Folded),
            ]
        );
    }

    #[test]
    fn block_scalar_explicit_indentation() {
        assert_eq!(
            scalars("|2-\n   leading space\n  next\n"),
            vec![(String::from(" leading space\nnext"), ScalarStyle::Literal)]
        );
        assert_eq!(
            scalars(">-2\n   indented\n"),
            vec![(String::from(" indented"), ScalarStyle::Folded)]
        );
    }

    #[test]
    fn zero_indentation_indicator_is_rejected() {
        for input in ["|0\n  a\n", ">0\n  a\n", "|-0\n  a\n", ">+0\n  a\n"] {
            let err = scan(input).unwrap_err();
            assert!(
                matches!(
                    err,
                    ScannerError::Problem {
                        problem: "found an indentation indicator equal to 0",
                        ..
                    }
                ),
                "{input:?}: {err:?}"
            );
        }
    }

    #[test]
    fn plain_scalar_folding() {
        assert_eq!(
            scalars("key: first\n  second\n\n  third\n"),
            vec![
                (String::from("key"), ScalarStyle::Plain),
                (String::from("first second\nthird"), ScalarStyle::Plain),
            ]
        );
    }

    #[test]
    fn tags() {
        let tokens = scan("- !!str a\n- !local b\n- !<tag:x,2000:y> c\n- ! d\n- !e!f g\n").unwrap();
        let tags: Vec<_> = tokens
            .into_iter()
            .filter_map(|token| match token.data {
                TokenData::Tag { handle, suffix } => Some((handle, suffix)),
                _ => None,
            })
            .collect();
        let expected = [
            ("!!", "str"),
            ("!", "local"),
            ("", "tag:x,2000:y"),
            ("", "!"),
            ("!e!", "f"),
        ];
        assert_eq!(
            tags,
            expected
                .iter()
                .map(|(h, s)| (String::from(*h), String::from(*s)))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn tag_uri_escapes_decode_utf8() {
        let tokens = scan("!%C3%A9t%C3%A9 x").unwrap();
        assert!(tokens.iter().any(|token| token.data
            == TokenData::Tag {
                handle: String::from("!"),
                suffix: String::from("\u{e9}t\u{e9}"),
            }));
    }

    #[test]
    fn tag_followed_by_comma_in_flow() {
        assert_eq!(
            kinds("[!!str, a]"),
            vec![
                "STREAM-START",
                "FLOW-SEQUENCE-START",
                "TAG",
                "FLOW-ENTRY",
                "SCALAR",
                "FLOW-SEQUENCE-END",
                "STREAM-END",
            ]
        );
    }

    #[test]
    fn directives() {
        let tokens = scan("%YAML 1.1\n%TAG !e! tag:example.com,2000:\n%FOO bar baz\n--- x\n").unwrap();
        let data: Vec<_> = tokens.into_iter().map(|token| token.data).collect();
        assert_eq!(
            &data[1..4],
            &[
                TokenData::VersionDirective { major: 1, minor: 1 },
                TokenData::TagDirective {
                    handle: String::from("!e!"),
                    prefix: String::from("tag:example.com,2000:"),
                },
                TokenData::ReservedDirective {
                    name: String::from("FOO"),
                },
            ]
        );
        assert_eq!(data[4], TokenData::DocumentStart);
    }

    #[test]
    fn overlong_version_number() {
        let err = scan("%YAML 1.1234567890\n---").unwrap_err();
        assert!(matches!(
            err,
            ScannerError::Problem {
                problem: "found extremely long version number",
                ..
            }
        ));
    }

    #[test]
    fn simple_key_limited_to_1024_characters() {
        let short = format!("{}: v", "k".repeat(1000));
        assert!(kinds(&short).contains(&"KEY"));

        let long = format!("[{}: v]", "k".repeat(1100));
        assert!(!kinds(&long).contains(&"KEY"));
    }

    #[test]
    fn multiline_simple_key_is_not_a_key() {
        let err = scan("a\nb: c\n").unwrap_err();
        assert!(matches!(
            err,
            ScannerError::Problem {
                problem: "mapping values are not allowed in this context",
                ..
            }
        ));
        assert!(scan("{a\nb: c}").is_ok());
        let err = scan("a: 1\nb\nc: 2\n").unwrap_err();
        assert!(matches!(
            err,
            ScannerError::Problem {
                problem: "could not find expected ':'",
                ..
            }
        ));
    }

    #[test]
    fn colon_in_flow_plain_scalar() {
        for input in ["[a:b]", "{a:1}"] {
            let err = scan(input).unwrap_err();
            assert!(
                matches!(
                    err,
                    ScannerError::Problem {
                        context: "while scanning a plain scalar",
                        problem: "found unexpected ':'",
                        ..
                    }
                ),
                "{input:?}: {err:?}"
            );
        }

        assert_eq!(
            kinds("{a:, b:}"),
            [
                "STREAM-START",
                "FLOW-MAPPING-START",
                "KEY",
                "SCALAR",
                "VALUE",
                "FLOW-ENTRY",
                "KEY",
                "SCALAR",
                "VALUE",
                "FLOW-MAPPING-END",
                "STREAM-END",
            ]
        );
        assert_eq!(
            kinds("[a?b]"),
            [
                "STREAM-START",
                "FLOW-SEQUENCE-START",
                "SCALAR",
                "KEY",
                "SCALAR",
                "FLOW-SEQUENCE-END",
                "STREAM-END",
            ]
        );
        assert_eq!(kinds("a:b"), ["STREAM-START", "SCALAR", "STREAM-END"]);
    }

    #[test]
    fn anchors_and_aliases() {
        let tokens = scan("- &a x\n- *a\n").unwrap();
        assert!(tokens.iter().any(|token| token.data
            == TokenData::Anchor {
                value: String::from("a")
            }));
        assert!(tokens.iter().any(|token| token.data
            == TokenData::Alias {
                value: String::from("a")
            }));
        assert!(scan("&! x").is_err());
    }

    #[test]
    fn tab_in_block_scalar_indentation() {
        let err = scan("|\n\tfoo\n").unwrap_err();
        assert!(matches!(
            err,
            ScannerError::Problem {
                problem: "found a tab character where an indentation space is expected",
                ..
            }
        ));
    }

    #[test]
    fn peek_and_get_agree() {
        let mut scanner = Scanner::new();
        scanner.set_input_string("a");
        assert!(scanner.check_token().unwrap());
        let peeked = scanner.peek_token().unwrap().cloned().unwrap();
        let got = scanner.get_token().unwrap().unwrap();
        assert_eq!(peeked, got);
        while scanner.get_token().unwrap().is_some() {}
        assert!(!scanner.check_token().unwrap());
        assert!(scanner.peek_token().unwrap().is_none());
    }
}
