use std::io::BufRead;

use tracing::{debug, trace, warn};

use crate::scanner::Scanner;
use crate::{
    Encoding, Event, EventData, ImplicitLevel, MappingStyle, Mark, ParserError, ScalarStyle,
    SequenceStyle, TagDirective, Token, TokenData, VersionDirective,
};

/// The parser structure.
///
/// Turns the token stream of a [`Scanner`] into events following the
/// grammar
///
/// ```text
/// stream   ::= STREAM-START document* STREAM-END
/// document ::= DOCUMENT-START node DOCUMENT-END
/// node     ::= ALIAS | SCALAR | sequence | mapping
/// sequence ::= SEQUENCE-START node* SEQUENCE-END
/// mapping  ::= MAPPING-START (node node)* MAPPING-END
/// ```
#[non_exhaustive]
pub struct Parser<'r> {
    pub(crate) scanner: Scanner<'r>,
    /// The parser states stack.
    states: Vec<ParserState>,
    /// The current parser state.
    state: ParserState,
    /// The stack of marks.
    marks: Vec<Mark>,
    /// The list of TAG directives.
    tag_directives: Vec<TagDirective>,
    /// The event returned by the last `peek_event`.
    current: Option<Event>,
}

impl<'r> Default for Parser<'r> {
    fn default() -> Self {
        Self::new()
    }
}

/// The states of the parser.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
enum ParserState {
    /// Expect STREAM-START.
    #[default]
    StreamStart,
    /// Expect the beginning of an implicit document.
    ImplicitDocumentStart,
    /// Expect DOCUMENT-START.
    DocumentStart,
    /// Expect the content of a document.
    DocumentContent,
    /// Expect DOCUMENT-END.
    DocumentEnd,
    /// Expect a block node.
    BlockNode,
    /// Expect the first entry of a block sequence.
    BlockSequenceFirstEntry,
    /// Expect an entry of a block sequence.
    BlockSequenceEntry,
    /// Expect an entry of an indentless sequence.
    IndentlessSequenceEntry,
    /// Expect the first key of a block mapping.
    BlockMappingFirstKey,
    /// Expect a block mapping key.
    BlockMappingKey,
    /// Expect a block mapping value.
    BlockMappingValue,
    /// Expect the first entry of a flow sequence.
    FlowSequenceFirstEntry,
    /// Expect an entry of a flow sequence.
    FlowSequenceEntry,
    /// Expect a key of a single-pair mapping inside a flow sequence.
    FlowSequenceEntryMappingKey,
    /// Expect a value of a single-pair mapping inside a flow sequence.
    FlowSequenceEntryMappingValue,
    /// Expect the end of a single-pair mapping inside a flow sequence.
    FlowSequenceEntryMappingEnd,
    /// Expect the first key of a flow mapping.
    FlowMappingFirstKey,
    /// Expect a key of a flow mapping.
    FlowMappingKey,
    /// Expect a value of a flow mapping.
    FlowMappingValue,
    /// Expect an empty value of a flow mapping.
    FlowMappingEmptyValue,
    /// Expect nothing.
    End,
}

fn default_tag_directives() -> [TagDirective; 2] {
    [
        TagDirective {
            handle: String::from("!"),
            prefix: String::from("!"),
        },
        TagDirective {
            handle: String::from("!!"),
            prefix: String::from(crate::CORE_SCHEMA_PREFIX),
        },
    ]
}

impl<'r> Parser<'r> {
    /// Create a parser.
    pub fn new() -> Parser<'r> {
        Parser {
            scanner: Scanner::new(),
            states: Vec::with_capacity(16),
            state: ParserState::default(),
            marks: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(16),
            current: None,
        }
    }

    /// Set a string input.
    pub fn set_input_string(&mut self, input: &'r str) {
        self.scanner.set_input_string(input);
    }

    /// Set a generic input handler.
    pub fn set_input(&mut self, input: &'r mut dyn BufRead) {
        self.scanner.set_input(input);
    }

    /// Set the source encoding.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.scanner.set_encoding(encoding);
    }

    /// Set the name reported in marks.
    pub fn set_name(&mut self, name: &str) {
        self.scanner.set_name(name);
    }

    /// Is there another event?
    pub fn check_event(&mut self) -> Result<bool, ParserError> {
        Ok(self.peek_event()?.is_some())
    }

    /// Look at the next event without consuming it.
    pub fn peek_event(&mut self) -> Result<Option<&Event>, ParserError> {
        if self.current.is_none() && self.state != ParserState::End {
            match self.state_machine() {
                Ok(event) => {
                    trace!(
                        "Event {} at {}:{}",
                        event.data.kind(),
                        event.start_mark.line,
                        event.start_mark.column
                    );
                    self.current = Some(event);
                }
                Err(err) => {
                    // Errors are fatal to the stream.
                    self.state = ParserState::End;
                    return Err(err);
                }
            }
        }
        Ok(self.current.as_ref())
    }

    /// Parse the input stream and produce the next parsing event.
    ///
    /// The first event is [`EventData::StreamStart`] and the last one is
    /// [`EventData::StreamEnd`]; after that, `None` is returned.
    pub fn get_event(&mut self) -> Result<Option<Event>, ParserError> {
        if self.current.is_none() {
            self.peek_event()?;
        }
        Ok(self.current.take())
    }

    fn peek_token(&mut self) -> Result<&Token, ParserError> {
        self.scanner.peek_token()?.ok_or(ParserError::UnexpectedEof)
    }

    fn peek_token_mut(&mut self) -> Result<&mut Token, ParserError> {
        self.scanner
            .peek_token_mut()?
            .ok_or(ParserError::UnexpectedEof)
    }

    fn skip_token(&mut self) {
        self.scanner.skip_token();
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap_or(ParserState::End);
    }

    fn error<T>(problem: &'static str, mark: Mark) -> Result<T, ParserError> {
        Err(ParserError::Problem { problem, mark })
    }

    fn error_with_context<T>(
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    ) -> Result<T, ParserError> {
        Err(ParserError::ProblemWithContext {
            context,
            context_mark,
            problem,
            mark,
        })
    }

    fn state_machine(&mut self) -> Result<Event, ParserError> {
        match self.state {
            ParserState::StreamStart => self.parse_stream_start(),
            ParserState::ImplicitDocumentStart => self.parse_document_start(true),
            ParserState::DocumentStart => self.parse_document_start(false),
            ParserState::DocumentContent => self.parse_document_content(),
            ParserState::DocumentEnd => self.parse_document_end(),
            ParserState::BlockNode => self.parse_node(true, false),
            ParserState::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            ParserState::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            ParserState::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            ParserState::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            ParserState::BlockMappingKey => self.parse_block_mapping_key(false),
            ParserState::BlockMappingValue => self.parse_block_mapping_value(),
            ParserState::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            ParserState::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            ParserState::FlowSequenceEntryMappingKey => {
                self.parse_flow_sequence_entry_mapping_key()
            }
            ParserState::FlowSequenceEntryMappingValue => {
                self.parse_flow_sequence_entry_mapping_value()
            }
            ParserState::FlowSequenceEntryMappingEnd => {
                self.parse_flow_sequence_entry_mapping_end()
            }
            ParserState::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            ParserState::FlowMappingKey => self.parse_flow_mapping_key(false),
            ParserState::FlowMappingValue => self.parse_flow_mapping_value(false),
            ParserState::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            ParserState::End => Err(ParserError::UnexpectedEof),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::StreamStart { encoding } = token.data {
            let event = Event::new(
                EventData::StreamStart { encoding },
                token.start_mark.clone(),
                token.end_mark.clone(),
            );
            self.state = ParserState::ImplicitDocumentStart;
            self.skip_token();
            Ok(event)
        } else {
            Self::error(
                "did not find expected <stream-start>",
                token.start_mark.clone(),
            )
        }
    }

    fn parse_document_start(&mut self, implicit: bool) -> Result<Event, ParserError> {
        if !implicit {
            while let TokenData::DocumentEnd = self.peek_token()?.data {
                self.skip_token();
            }
        }

        let token = self.peek_token()?;
        let start_mark = token.start_mark.clone();
        let at_directive_or_marker = matches!(
            token.data,
            TokenData::VersionDirective { .. }
                | TokenData::TagDirective { .. }
                | TokenData::ReservedDirective { .. }
                | TokenData::DocumentStart
                | TokenData::StreamEnd
        );

        if implicit && !at_directive_or_marker {
            self.process_directives()?;
            self.states.push(ParserState::DocumentEnd);
            self.state = ParserState::BlockNode;
            debug!("Implicit document at line {}", start_mark.line + 1);
            return Ok(Event::new(
                EventData::DocumentStart {
                    version_directive: None,
                    tag_directives: Vec::new(),
                    implicit: true,
                },
                start_mark.clone(),
                start_mark,
            ));
        }

        if let TokenData::StreamEnd = token.data {
            let end_mark = token.end_mark.clone();
            self.state = ParserState::End;
            self.skip_token();
            return Ok(Event::new(EventData::StreamEnd, start_mark, end_mark));
        }

        let (version_directive, tag_directives) = self.process_directives()?;
        let token = self.peek_token()?;
        let TokenData::DocumentStart = token.data else {
            return Self::error(
                "did not find expected <document start>",
                token.start_mark.clone(),
            );
        };
        let end_mark = token.end_mark.clone();
        self.states.push(ParserState::DocumentEnd);
        self.state = ParserState::DocumentContent;
        self.skip_token();
        debug!("Explicit document at line {}", start_mark.line + 1);
        Ok(Event::new(
            EventData::DocumentStart {
                version_directive,
                tag_directives,
                implicit: false,
            },
            start_mark,
            end_mark,
        ))
    }

    fn parse_document_content(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::VersionDirective { .. }
        | TokenData::TagDirective { .. }
        | TokenData::ReservedDirective { .. }
        | TokenData::DocumentStart
        | TokenData::DocumentEnd
        | TokenData::StreamEnd = token.data
        {
            let mark = token.start_mark.clone();
            self.pop_state();
            Ok(Self::empty_scalar(mark))
        } else {
            self.parse_node(true, false)
        }
    }

    fn parse_document_end(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let start_mark = token.start_mark.clone();
        let mut end_mark = start_mark.clone();
        let mut implicit = true;
        if let TokenData::DocumentEnd = token.data {
            end_mark = token.end_mark.clone();
            implicit = false;
            self.skip_token();
        }
        self.tag_directives.clear();
        self.state = ParserState::DocumentStart;
        debug!("Document end at line {}", start_mark.line + 1);
        Ok(Event::new(
            EventData::DocumentEnd { implicit },
            start_mark,
            end_mark,
        ))
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event, ParserError> {
        let mut anchor: Option<String> = None;
        let mut tag_parts: Option<(String, String)> = None;
        let mut tag_mark = Mark::default();

        let token = self.peek_token_mut()?;
        if let TokenData::Alias { value } = &mut token.data {
            let event = Event::new(
                EventData::Alias {
                    anchor: core::mem::take(value),
                },
                token.start_mark.clone(),
                token.end_mark.clone(),
            );
            self.pop_state();
            self.skip_token();
            return Ok(event);
        }

        let mut start_mark = token.start_mark.clone();
        let mut end_mark = start_mark.clone();
        if let TokenData::Anchor { value } = &mut token.data {
            anchor = Some(core::mem::take(value));
            end_mark = token.end_mark.clone();
            self.skip_token();
            let token = self.peek_token_mut()?;
            if let TokenData::Tag { handle, suffix } = &mut token.data {
                tag_parts = Some((core::mem::take(handle), core::mem::take(suffix)));
                tag_mark = token.start_mark.clone();
                end_mark = token.end_mark.clone();
                self.skip_token();
            }
        } else if let TokenData::Tag { handle, suffix } = &mut token.data {
            tag_parts = Some((core::mem::take(handle), core::mem::take(suffix)));
            tag_mark = token.start_mark.clone();
            start_mark = tag_mark.clone();
            end_mark = token.end_mark.clone();
            self.skip_token();
            let token = self.peek_token_mut()?;
            if let TokenData::Anchor { value } = &mut token.data {
                anchor = Some(core::mem::take(value));
                end_mark = token.end_mark.clone();
                self.skip_token();
            }
        }

        let tag = match tag_parts {
            None => None,
            Some((handle, suffix)) if handle.is_empty() => Some(suffix),
            Some((handle, suffix)) => {
                let Some(directive) = self
                    .tag_directives
                    .iter()
                    .find(|directive| directive.handle == handle)
                else {
                    return Self::error_with_context(
                        "while parsing a node",
                        start_mark,
                        "found undefined tag handle",
                        tag_mark,
                    );
                };
                Some(format!("{}{}", directive.prefix, suffix))
            }
        };
        let implicit = tag.is_none() || tag.as_deref() == Some("!");

        let token = self.peek_token_mut()?;
        match &mut token.data {
            TokenData::BlockEntry if indentless_sequence => {
                let end_mark = token.end_mark.clone();
                self.state = ParserState::IndentlessSequenceEntry;
                Ok(Event::new(
                    EventData::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: SequenceStyle::Block,
                    },
                    start_mark,
                    end_mark,
                ))
            }
            TokenData::Scalar { value, style } => {
                let level = if *style == ScalarStyle::Plain && tag.is_none()
                    || tag.as_deref() == Some("!")
                {
                    ImplicitLevel::Plain
                } else if tag.is_none() {
                    ImplicitLevel::NonPlain
                } else {
                    ImplicitLevel::None
                };
                let event = Event::new(
                    EventData::Scalar {
                        anchor,
                        tag,
                        value: core::mem::take(value),
                        implicit: level,
                        style: *style,
                    },
                    start_mark,
                    token.end_mark.clone(),
                );
                self.pop_state();
                self.skip_token();
                Ok(event)
            }
            TokenData::FlowSequenceStart => {
                let end_mark = token.end_mark.clone();
                self.state = ParserState::FlowSequenceFirstEntry;
                Ok(Event::new(
                    EventData::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: SequenceStyle::Flow,
                    },
                    start_mark,
                    end_mark,
                ))
            }
            TokenData::FlowMappingStart => {
                let end_mark = token.end_mark.clone();
                self.state = ParserState::FlowMappingFirstKey;
                Ok(Event::new(
                    EventData::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        style: MappingStyle::Flow,
                    },
                    start_mark,
                    end_mark,
                ))
            }
            TokenData::BlockSequenceStart if block => {
                let end_mark = token.end_mark.clone();
                self.state = ParserState::BlockSequenceFirstEntry;
                Ok(Event::new(
                    EventData::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: SequenceStyle::Block,
                    },
                    start_mark,
                    end_mark,
                ))
            }
            TokenData::BlockMappingStart if block => {
                let end_mark = token.end_mark.clone();
                self.state = ParserState::BlockMappingFirstKey;
                Ok(Event::new(
                    EventData::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        style: MappingStyle::Block,
                    },
                    start_mark,
                    end_mark,
                ))
            }
            _ if anchor.is_some() || tag.is_some() => {
                // A node with properties but no content is an empty scalar.
                let level = if tag.is_none() {
                    ImplicitLevel::Plain
                } else {
                    ImplicitLevel::None
                };
                self.pop_state();
                Ok(Event::new(
                    EventData::Scalar {
                        anchor,
                        tag,
                        value: String::new(),
                        implicit: level,
                        style: ScalarStyle::Plain,
                    },
                    start_mark,
                    end_mark,
                ))
            }
            _ => Self::error_with_context(
                if block {
                    "while parsing a block node"
                } else {
                    "while parsing a flow node"
                },
                start_mark,
                "did not find expected node content",
                token.start_mark.clone(),
            ),
        }
    }

    /// Remember where a collection started and drop its opening token.
    fn open_collection(&mut self) -> Result<(), ParserError> {
        let mark = self.peek_token()?.start_mark.clone();
        self.marks.push(mark);
        self.skip_token();
        Ok(())
    }

    /// Produce a collection end event from the current token.
    fn close_collection(&mut self, data: EventData, skip: bool) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let event = Event::new(data, token.start_mark.clone(), token.end_mark.clone());
        self.pop_state();
        let _ = self.marks.pop();
        if skip {
            self.skip_token();
        }
        Ok(event)
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            self.open_collection()?;
        }

        let token = self.peek_token()?;
        match token.data {
            TokenData::BlockEntry => {
                let mark = token.end_mark.clone();
                self.skip_token();
                if let TokenData::BlockEntry | TokenData::BlockEnd = self.peek_token()?.data {
                    self.state = ParserState::BlockSequenceEntry;
                    Ok(Self::empty_scalar(mark))
                } else {
                    self.states.push(ParserState::BlockSequenceEntry);
                    self.parse_node(true, false)
                }
            }
            TokenData::BlockEnd => self.close_collection(EventData::SequenceEnd, true),
            _ => {
                let token_mark = token.start_mark.clone();
                let mark = self.marks.pop().unwrap_or_default();
                Self::error_with_context(
                    "while parsing a block collection",
                    mark,
                    "did not find expected '-' indicator",
                    token_mark,
                )
            }
        }
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::BlockEntry = token.data {
            let mark = token.end_mark.clone();
            self.skip_token();
            if let TokenData::BlockEntry
            | TokenData::Key
            | TokenData::Value
            | TokenData::BlockEnd = self.peek_token()?.data
            {
                self.state = ParserState::IndentlessSequenceEntry;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        } else {
            // The sequence ends where the enclosing mapping continues, so the
            // token stays in place.
            let mark = token.start_mark.clone();
            self.pop_state();
            Ok(Event::new(EventData::SequenceEnd, mark.clone(), mark))
        }
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            self.open_collection()?;
        }

        let token = self.peek_token()?;
        match token.data {
            TokenData::Key => {
                let mark = token.end_mark.clone();
                self.skip_token();
                if let TokenData::Key | TokenData::Value | TokenData::BlockEnd =
                    self.peek_token()?.data
                {
                    self.state = ParserState::BlockMappingValue;
                    Ok(Self::empty_scalar(mark))
                } else {
                    self.states.push(ParserState::BlockMappingValue);
                    self.parse_node(true, true)
                }
            }
            TokenData::BlockEnd => self.close_collection(EventData::MappingEnd, true),
            _ => {
                let token_mark = token.start_mark.clone();
                let mark = self.marks.pop().unwrap_or_default();
                Self::error_with_context(
                    "while parsing a block mapping",
                    mark,
                    "did not find expected key",
                    token_mark,
                )
            }
        }
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::Value = token.data {
            let mark = token.end_mark.clone();
            self.skip_token();
            if let TokenData::Key | TokenData::Value | TokenData::BlockEnd =
                self.peek_token()?.data
            {
                self.state = ParserState::BlockMappingKey;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::BlockMappingKey);
                self.parse_node(true, true)
            }
        } else {
            let mark = token.start_mark.clone();
            self.state = ParserState::BlockMappingKey;
            Ok(Self::empty_scalar(mark))
        }
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            self.open_collection()?;
        }

        if !matches!(self.peek_token()?.data, TokenData::FlowSequenceEnd) {
            if !first {
                let token = self.peek_token()?;
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                } else {
                    let token_mark = token.start_mark.clone();
                    let mark = self.marks.pop().unwrap_or_default();
                    return Self::error_with_context(
                        "while parsing a flow sequence",
                        mark,
                        "did not find expected ',' or ']'",
                        token_mark,
                    );
                }
            }
            let token = self.peek_token()?;
            match token.data {
                TokenData::Key => {
                    // `[a: b]` holds a single-pair mapping. The KEY token is
                    // consumed by the next state.
                    let event = Event::new(
                        EventData::MappingStart {
                            anchor: None,
                            tag: None,
                            implicit: true,
                            style: MappingStyle::Flow,
                        },
                        token.start_mark.clone(),
                        token.end_mark.clone(),
                    );
                    self.state = ParserState::FlowSequenceEntryMappingKey;
                    return Ok(event);
                }
                TokenData::FlowSequenceEnd => {}
                _ => {
                    self.states.push(ParserState::FlowSequenceEntry);
                    return self.parse_node(false, false);
                }
            }
        }
        self.close_collection(EventData::SequenceEnd, true)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, ParserError> {
        let mark = self.peek_token()?.end_mark.clone();
        self.skip_token();
        if let TokenData::Value | TokenData::FlowEntry | TokenData::FlowSequenceEnd =
            self.peek_token()?.data
        {
            self.state = ParserState::FlowSequenceEntryMappingValue;
            Ok(Self::empty_scalar(mark))
        } else {
            self.states.push(ParserState::FlowSequenceEntryMappingValue);
            self.parse_node(false, false)
        }
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::Value = token.data {
            let mark = token.end_mark.clone();
            self.skip_token();
            if let TokenData::FlowEntry | TokenData::FlowSequenceEnd = self.peek_token()?.data {
                self.state = ParserState::FlowSequenceEntryMappingEnd;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::FlowSequenceEntryMappingEnd);
                self.parse_node(false, false)
            }
        } else {
            let mark = token.start_mark.clone();
            self.state = ParserState::FlowSequenceEntryMappingEnd;
            Ok(Self::empty_scalar(mark))
        }
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, ParserError> {
        let mark = self.peek_token()?.start_mark.clone();
        self.state = ParserState::FlowSequenceEntry;
        Ok(Event::new(EventData::MappingEnd, mark.clone(), mark))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            self.open_collection()?;
        }

        if !matches!(self.peek_token()?.data, TokenData::FlowMappingEnd) {
            if !first {
                let token = self.peek_token()?;
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                } else {
                    let token_mark = token.start_mark.clone();
                    let mark = self.marks.pop().unwrap_or_default();
                    return Self::error_with_context(
                        "while parsing a flow mapping",
                        mark,
                        "did not find expected ',' or '}'",
                        token_mark,
                    );
                }
            }
            match self.peek_token()?.data {
                TokenData::Key => {
                    self.skip_token();
                    let token = self.peek_token()?;
                    if let TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd =
                        token.data
                    {
                        let mark = token.start_mark.clone();
                        self.state = ParserState::FlowMappingValue;
                        return Ok(Self::empty_scalar(mark));
                    }
                    self.states.push(ParserState::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                TokenData::FlowMappingEnd => {}
                _ => {
                    self.states.push(ParserState::FlowMappingEmptyValue);
                    return self.parse_node(false, false);
                }
            }
        }
        self.close_collection(EventData::MappingEnd, true)
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if empty {
            let mark = token.start_mark.clone();
            self.state = ParserState::FlowMappingKey;
            return Ok(Self::empty_scalar(mark));
        }
        if let TokenData::Value = token.data {
            self.skip_token();
            let token = self.peek_token()?;
            if !matches!(token.data, TokenData::FlowEntry | TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingKey);
                return self.parse_node(false, false);
            }
            let mark = token.start_mark.clone();
            self.state = ParserState::FlowMappingKey;
            return Ok(Self::empty_scalar(mark));
        }
        let mark = token.start_mark.clone();
        self.state = ParserState::FlowMappingKey;
        Ok(Self::empty_scalar(mark))
    }

    /// The empty plain scalar standing in for an omitted node.
    fn empty_scalar(mark: Mark) -> Event {
        Event::new(
            EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                implicit: ImplicitLevel::Plain,
                style: ScalarStyle::Plain,
            },
            mark.clone(),
            mark,
        )
    }

    /// Consume the directives in front of a document and install its tag
    /// handles, returning the ones written explicitly.
    fn process_directives(
        &mut self,
    ) -> Result<(Option<VersionDirective>, Vec<TagDirective>), ParserError> {
        let mut version_directive: Option<VersionDirective> = None;
        let mut tag_directives = Vec::new();

        loop {
            let token = self.peek_token_mut()?;
            let mark = token.start_mark.clone();
            match &mut token.data {
                TokenData::VersionDirective { major, minor } => {
                    if version_directive.is_some() {
                        return Self::error("found duplicate %YAML directive", mark);
                    }
                    if *major != 1 {
                        return Self::error("found incompatible YAML document", mark);
                    }
                    version_directive = Some(VersionDirective {
                        major: *major,
                        minor: *minor,
                    });
                }
                TokenData::TagDirective { handle, prefix } => {
                    let value = TagDirective {
                        handle: core::mem::take(handle),
                        prefix: core::mem::take(prefix),
                    };
                    self.append_tag_directive(value.clone(), false, mark)?;
                    tag_directives.push(value);
                }
                TokenData::ReservedDirective { name } => {
                    warn!("Ignoring reserved directive %{} at line {}", name, mark.line + 1);
                }
                _ => break,
            }
            self.skip_token();
        }

        let mark = self.peek_token()?.start_mark.clone();
        for directive in default_tag_directives() {
            self.append_tag_directive(directive, true, mark.clone())?;
        }
        Ok((version_directive, tag_directives))
    }

    fn append_tag_directive(
        &mut self,
        value: TagDirective,
        allow_duplicates: bool,
        mark: Mark,
    ) -> Result<(), ParserError> {
        if self
            .tag_directives
            .iter()
            .any(|directive| directive.handle == value.handle)
        {
            if allow_duplicates {
                return Ok(());
            }
            return Self::error("found duplicate %TAG directive", mark);
        }
        self.tag_directives.push(value);
        Ok(())
    }
}

impl<'r> Iterator for Parser<'r> {
    type Item = Result<Event, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_event().transpose()
    }
}

impl<'r> core::iter::FusedIterator for Parser<'r> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Result<Vec<Event>, ParserError> {
        let mut parser = Parser::new();
        parser.set_input_string(input);
        parser.collect()
    }

    /// Render events in the yaml-test-suite notation.
    fn render(input: &str) -> Vec<String> {
        parse(input)
            .unwrap()
            .iter()
            .map(|event| {
                let mut line = String::new();
                let props = |line: &mut String, anchor: Option<&str>, tag: Option<&str>| {
                    if let Some(anchor) = anchor {
                        line.push_str(&format!(" &{anchor}"));
                    }
                    if let Some(tag) = tag {
                        line.push_str(&format!(" <{tag}>"));
                    }
                };
                match &event.data {
                    EventData::StreamStart { .. } => line.push_str("+STR"),
                    EventData::StreamEnd => line.push_str("-STR"),
                    EventData::DocumentStart { implicit, .. } => {
                        line.push_str(if *implicit { "+DOC" } else { "+DOC ---" });
                    }
                    EventData::DocumentEnd { implicit } => {
                        line.push_str(if *implicit { "-DOC" } else { "-DOC ..." });
                    }
                    EventData::MappingStart {
                        anchor, tag, style, ..
                    } => {
                        line.push_str("+MAP");
                        if *style == MappingStyle::Flow {
                            line.push_str(" {}");
                        }
                        props(&mut line, anchor.as_deref(), tag.as_deref());
                    }
                    EventData::MappingEnd => line.push_str("-MAP"),
                    EventData::SequenceStart {
                        anchor, tag, style, ..
                    } => {
                        line.push_str("+SEQ");
                        if *style == SequenceStyle::Flow {
                            line.push_str(" []");
                        }
                        props(&mut line, anchor.as_deref(), tag.as_deref());
                    }
                    EventData::SequenceEnd => line.push_str("-SEQ"),
                    EventData::Scalar {
                        anchor,
                        tag,
                        value,
                        style,
                        ..
                    } => {
                        line.push_str("=VAL");
                        props(&mut line, anchor.as_deref(), tag.as_deref());
                        let indicator = match style {
                            ScalarStyle::SingleQuoted => '\'',
                            ScalarStyle::DoubleQuoted => '"',
                            ScalarStyle::Literal => '|',
                            ScalarStyle::Folded => '>',
                            _ => ':',
                        };
                        line.push_str(&format!(" {indicator}{}", value.replace('\n', "\\n")));
                    }
                    EventData::Alias { anchor } => line.push_str(&format!("=ALI *{anchor}")),
                }
                line
            })
            .collect()
    }

    #[test]
    fn flow_mapping_with_nested_sequence() {
        assert_eq!(
            render("{a: 1, b: [2, 3]}"),
            vec![
                "+STR", "+DOC", "+MAP {}", "=VAL :a", "=VAL :1", "=VAL :b", "+SEQ []",
                "=VAL :2", "=VAL :3", "-SEQ", "-MAP", "-DOC", "-STR",
            ]
        );
    }

    #[test]
    fn block_mapping_with_indentless_sequence() {
        assert_eq!(
            render("key:\n- a\n- b\nother: 'c'\n"),
            vec![
                "+STR", "+DOC", "+MAP", "=VAL :key", "+SEQ", "=VAL :a", "=VAL :b", "-SEQ",
                "=VAL :other", "=VAL 'c", "-MAP", "-DOC", "-STR",
            ]
        );
    }

    #[test]
    fn empty_values_are_empty_plain_scalars() {
        assert_eq!(
            render("? a\nb:\n- \n"),
            vec![
                "+STR", "+DOC", "+MAP", "=VAL :a", "=VAL :", "=VAL :b", "+SEQ", "=VAL :",
                "-SEQ", "-MAP", "-DOC", "-STR",
            ]
        );
        assert_eq!(
            render("{a, ? b, c: }"),
            vec![
                "+STR", "+DOC", "+MAP {}", "=VAL :a", "=VAL :", "=VAL :b", "=VAL :",
                "=VAL :c", "=VAL :", "-MAP", "-DOC", "-STR",
            ]
        );
    }

    #[test]
    fn single_pair_mappings_in_flow_sequence() {
        assert_eq!(
            render("[a: 1, ? b, c]"),
            vec![
                "+STR", "+DOC", "+SEQ []", "+MAP {}", "=VAL :a", "=VAL :1", "-MAP",
                "+MAP {}", "=VAL :b", "=VAL :", "-MAP", "=VAL :c", "-SEQ", "-DOC", "-STR",
            ]
        );
    }

    #[test]
    fn anchors_aliases_and_tags() {
        assert_eq!(
            render("%TAG !e! tag:example.com,2000:\n--- !!map\n&a !e!x k: *a\n! v: !local |\n  text\n"),
            vec![
                "+STR",
                "+DOC ---",
                "+MAP <tag:yaml.org,2002:map>",
                "=VAL &a <tag:example.com,2000:x> :k",
                "=ALI *a",
                "=VAL <!> :v",
                "=VAL <!local> |text\\n",
                "-MAP",
                "-DOC",
                "-STR",
            ]
        );
    }

    #[test]
    fn multiple_documents() {
        assert_eq!(
            render("a\n...\n--- b\n---\n"),
            vec![
                "+STR", "+DOC", "=VAL :a", "-DOC ...", "+DOC ---", "=VAL :b", "-DOC",
                "+DOC ---", "=VAL :", "-DOC", "-STR",
            ]
        );
        assert_eq!(render(""), vec!["+STR", "-STR"]);
    }

    #[test]
    fn scalar_implicit_levels() {
        let levels: Vec<_> = parse("- plain\n- 'quoted'\n- !!str tagged\n- ! bang\n- &a\n- !!null\n")
            .unwrap()
            .into_iter()
            .filter_map(|event| match event.data {
                EventData::Scalar { implicit, .. } => Some(implicit),
                _ => None,
            })
            .collect();
        assert_eq!(
            levels,
            vec![
                ImplicitLevel::Plain,
                ImplicitLevel::NonPlain,
                ImplicitLevel::None,
                ImplicitLevel::Plain,
                ImplicitLevel::Plain,
                ImplicitLevel::None,
            ]
        );
    }

    #[test]
    fn version_directive() {
        let events = parse("%YAML 1.1\n--- x\n").unwrap();
        assert_eq!(
            events[1].data,
            EventData::DocumentStart {
                version_directive: Some(VersionDirective { major: 1, minor: 1 }),
                tag_directives: Vec::new(),
                implicit: false,
            }
        );
        assert!(parse("%YAML 1.3\n--- x\n").is_ok());

        let err = parse("%YAML 2.0\n--- x\n").unwrap_err();
        assert!(matches!(
            err,
            ParserError::Problem {
                problem: "found incompatible YAML document",
                ..
            }
        ));
        let err = parse("%YAML 1.1\n%YAML 1.1\n--- x\n").unwrap_err();
        assert!(matches!(
            err,
            ParserError::Problem {
                problem: "found duplicate %YAML directive",
                ..
            }
        ));
    }

    #[test]
    fn duplicate_and_undefined_tag_handles() {
        let err = parse("%TAG !e! a:\n%TAG !e! b:\n--- x\n").unwrap_err();
        assert!(matches!(
            err,
            ParserError::Problem {
                problem: "found duplicate %TAG directive",
                ..
            }
        ));
        let err = parse("!u!x y").unwrap_err();
        let ParserError::ProblemWithContext { problem, mark, .. } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(problem, "found undefined tag handle");
        assert_eq!((mark.line, mark.column), (0, 0));
    }

    #[test]
    fn tag_handles_reset_per_document() {
        let err = parse("%TAG !e! a:\n--- !e!x 1\n--- !e!x 2\n").unwrap_err();
        assert!(matches!(
            err,
            ParserError::ProblemWithContext {
                problem: "found undefined tag handle",
                ..
            }
        ));
    }

    #[test]
    fn reserved_directives_are_ignored() {
        assert_eq!(
            render("%FOO bar\n--- x\n"),
            vec!["+STR", "+DOC ---", "=VAL :x", "-DOC", "-STR"]
        );
    }

    #[test]
    fn grammar_errors_carry_context() {
        let err = parse("[a, b").unwrap_err();
        assert!(
            matches!(
                err,
                ParserError::ProblemWithContext {
                    context: "while parsing a flow sequence",
                    problem: "did not find expected ',' or ']'",
                    ..
                }
            ),
            "{err:?}"
        );

        let err = parse("- a\nb: c\n").unwrap_err();
        assert!(
            matches!(
                err,
                ParserError::ProblemWithContext {
                    context: "while parsing a block collection",
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn value_without_key_in_flow() {
        for input in ["{: d}", "[: d]", "{a: 1, : d}"] {
            let err = parse(input).unwrap_err();
            assert!(
                matches!(
                    err,
                    ParserError::ProblemWithContext {
                        context: "while parsing a flow node",
                        problem: "did not find expected node content",
                        ..
                    }
                ),
                "{input:?}: {err:?}"
            );
        }

        let events = parse("{? : d}").unwrap();
        assert!(matches!(
            &events[3].data,
            EventData::Scalar { value, .. } if value.is_empty()
        ));
    }

    #[test]
    fn iteration_stops_after_error() {
        let mut parser = Parser::new();
        parser.set_input_string("[a");
        let results: Vec<_> = parser.by_ref().collect();
        assert!(results.last().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut parser = Parser::new();
        parser.set_input_string("a");
        assert!(parser.check_event().unwrap());
        let peeked = parser.peek_event().unwrap().cloned().unwrap();
        assert_eq!(peeked, parser.get_event().unwrap().unwrap());
        let count = parser.by_ref().count();
        assert_eq!(count, 4);
        assert!(!parser.check_event().unwrap());
    }
}
