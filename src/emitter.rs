use alloc::collections::VecDeque;
use std::io::Write;

use tracing::{debug, trace};

use crate::chars::{
    is_alpha, is_ascii, is_blank, is_blankz, is_bom, is_break, is_breakz, is_printable, is_space,
};
use crate::{
    Break, EmitOptions, EmitterError, Encoding, Event, EventData, ImplicitLevel, MappingStyle,
    ScalarStyle, SequenceStyle, TagDirective, VersionDirective, WriterError,
};

pub(crate) const OUTPUT_BUFFER_SIZE: usize = 16384;

/// Keys written without the `?` indicator can be at most this long.
const MAX_SIMPLE_KEY_LENGTH: usize = 128;

/// The emitter states.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
#[non_exhaustive]
enum EmitterState {
    /// Expect STREAM-START.
    #[default]
    StreamStart,
    /// Expect the first DOCUMENT-START or STREAM-END.
    FirstDocumentStart,
    /// Expect DOCUMENT-START or STREAM-END.
    DocumentStart,
    /// Expect the content of a document.
    DocumentContent,
    /// Expect DOCUMENT-END.
    DocumentEnd,
    /// Expect the first item of a flow sequence.
    FlowSequenceFirstItem,
    /// Expect an item of a flow sequence.
    FlowSequenceItem,
    /// Expect the first key of a flow mapping.
    FlowMappingFirstKey,
    /// Expect a key of a flow mapping.
    FlowMappingKey,
    /// Expect a value for a simple key of a flow mapping.
    FlowMappingSimpleValue,
    /// Expect a value of a flow mapping.
    FlowMappingValue,
    /// Expect the first item of a block sequence.
    BlockSequenceFirstItem,
    /// Expect an item of a block sequence.
    BlockSequenceItem,
    /// Expect the first key of a block mapping.
    BlockMappingFirstKey,
    /// Expect the key of a block mapping.
    BlockMappingKey,
    /// Expect a value for a simple key of a block mapping.
    BlockMappingSimpleValue,
    /// Expect a value of a block mapping.
    BlockMappingValue,
    /// Expect nothing.
    End,
}

/// Turns a stream of events into YAML text.
///
/// Events are queued until enough lookahead is available to decide on a
/// layout (whether a collection is empty, whether a key fits on one line),
/// then written to an internal buffer that is flushed to the output whenever
/// it fills up and at the end of every document.
///
/// Configuration set before STREAM-START is applied when the stream starts;
/// changing it afterwards affects only the next stream.
#[non_exhaustive]
pub struct Emitter<'w> {
    pub(crate) write_handler: Option<&'w mut dyn Write>,
    /// Characters not yet flushed to the output.
    pub(crate) buffer: String,
    /// Encoded bytes not yet flushed to the output.
    pub(crate) raw_buffer: Vec<u8>,
    /// The encoding in effect for the current stream.
    pub(crate) encoding: Encoding,
    requested_encoding: Encoding,
    options: EmitOptions,
    canonical: bool,
    best_indent: i32,
    best_width: i32,
    unicode: bool,
    line_break: Break,
    states: Vec<EmitterState>,
    state: EmitterState,
    events: VecDeque<Event>,
    indents: Vec<i32>,
    tag_directives: Vec<TagDirective>,
    indent: i32,
    flow_level: i32,
    mapping_context: bool,
    simple_key_context: bool,
    line: u64,
    column: i32,
    whitespace: bool,
    indention: bool,
    /// 0: the last document was closed. 1: the last document may be left
    /// open. 2: the last document must be closed with `...`.
    open_ended: i32,
}

impl<'w> Default for Emitter<'w> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Analysis<'a> {
    anchor: Option<AnchorAnalysis<'a>>,
    tag: Option<TagAnalysis>,
    scalar: Option<ScalarAnalysis<'a>>,
}

struct AnchorAnalysis<'a> {
    anchor: &'a str,
    alias: bool,
}

/// A tag split into a handle known to the current document and the rest.
/// An empty handle means the tag is written verbatim.
struct TagAnalysis {
    handle: String,
    suffix: String,
}

struct ScalarAnalysis<'a> {
    value: &'a str,
    multiline: bool,
    flow_plain_allowed: bool,
    block_plain_allowed: bool,
    single_quoted_allowed: bool,
    block_allowed: bool,
    style: ScalarStyle,
}

impl<'w> Emitter<'w> {
    /// Create an emitter with the default configuration and no output.
    pub fn new() -> Emitter<'w> {
        Emitter {
            write_handler: None,
            buffer: String::with_capacity(OUTPUT_BUFFER_SIZE),
            raw_buffer: Vec::with_capacity(OUTPUT_BUFFER_SIZE),
            encoding: Encoding::Any,
            requested_encoding: Encoding::Any,
            options: EmitOptions::default(),
            canonical: false,
            best_indent: 2,
            best_width: 80,
            unicode: false,
            line_break: Break::Ln,
            states: Vec::with_capacity(16),
            state: EmitterState::default(),
            events: VecDeque::with_capacity(16),
            indents: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(16),
            indent: -1,
            flow_level: 0,
            mapping_context: false,
            simple_key_context: false,
            line: 0,
            column: 0,
            whitespace: false,
            indention: false,
            open_ended: 0,
        }
    }

    /// Write UTF-8 output into `output`.
    pub fn set_output_string(&mut self, output: &'w mut Vec<u8>) {
        self.requested_encoding = Encoding::Utf8;
        output.clear();
        self.write_handler = Some(output);
    }

    /// Write output to a generic writer.
    pub fn set_output(&mut self, handler: &'w mut dyn Write) {
        self.write_handler = Some(handler);
    }

    /// Set the output encoding. [`Encoding::Any`] follows the STREAM-START
    /// event, falling back to UTF-8.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.requested_encoding = encoding;
    }

    /// Set if the output should be in the "canonical" format described by the
    /// YAML specification.
    pub fn set_canonical(&mut self, canonical: bool) {
        self.options.canonical = canonical;
    }

    /// Set the indentation increment. Values outside `2..=9` fall back to 2.
    pub fn set_indent(&mut self, indent: i32) {
        self.options.indent = indent;
    }

    /// Set the preferred line width. Negative means unlimited; values not
    /// wider than twice the indentation fall back to 80.
    pub fn set_width(&mut self, width: i32) {
        self.options.width = width;
    }

    /// Set if unescaped non-ASCII characters are allowed.
    pub fn set_unicode(&mut self, unicode: bool) {
        self.options.unicode = unicode;
    }

    /// Set the preferred line break.
    pub fn set_break(&mut self, line_break: Break) {
        self.options.line_break = line_break;
    }

    /// Emit an event.
    ///
    /// The event may be held back until enough following events have arrived
    /// to decide how it is laid out.
    pub fn emit(&mut self, event: Event) -> Result<(), EmitterError> {
        self.events.push_back(event);
        while let Some(event) = self.next_ready_event() {
            let mut analysis = self.analyze_event(&event)?;
            self.state_machine(&event, &mut analysis)?;
        }
        Ok(())
    }

    /// Write everything buffered so far to the output.
    pub fn flush(&mut self) -> Result<(), EmitterError> {
        self.flush_buffer()?;
        Ok(())
    }

    fn next_ready_event(&mut self) -> Option<Event> {
        let first = self.events.front()?;

        let accumulate = match &first.data {
            EventData::DocumentStart { .. } => 1,
            EventData::SequenceStart { .. } => 2,
            EventData::MappingStart { .. } => 3,
            _ => return self.events.pop_front(),
        };

        if self.events.len() > accumulate {
            return self.events.pop_front();
        }

        let mut level = 0;
        for event in &self.events {
            match event.data {
                EventData::StreamStart { .. }
                | EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => level += 1,
                EventData::StreamEnd
                | EventData::DocumentEnd { .. }
                | EventData::SequenceEnd
                | EventData::MappingEnd => level -= 1,
                _ => {}
            }
            if level == 0 {
                return self.events.pop_front();
            }
        }

        None
    }

    fn append_tag_directive(
        &mut self,
        value: &TagDirective,
        allow_duplicates: bool,
    ) -> Result<(), EmitterError> {
        if self
            .tag_directives
            .iter()
            .any(|directive| directive.handle == value.handle)
        {
            if allow_duplicates {
                return Ok(());
            }
            return Err(EmitterError::Problem("duplicate %TAG directive"));
        }
        self.tag_directives.push(value.clone());
        Ok(())
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        if self.indent < 0 {
            self.indent = if flow { self.best_indent } else { 0 };
        } else if !indentless {
            self.indent += self.best_indent;
        }
    }

    fn pop_indent(&mut self) {
        self.indent = self.indents.pop().unwrap_or(-1);
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap_or(EmitterState::End);
    }

    fn state_machine<'a>(
        &mut self,
        event: &'a Event,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        trace!("emitter state {:?} on {}", self.state, event.data.kind());
        match self.state {
            EmitterState::StreamStart => self.emit_stream_start(event),
            EmitterState::FirstDocumentStart => self.emit_document_start(event, true),
            EmitterState::DocumentStart => self.emit_document_start(event, false),
            EmitterState::DocumentContent => self.emit_document_content(event, analysis),
            EmitterState::DocumentEnd => self.emit_document_end(event),
            EmitterState::FlowSequenceFirstItem => {
                self.emit_flow_sequence_item(event, true, analysis)
            }
            EmitterState::FlowSequenceItem => self.emit_flow_sequence_item(event, false, analysis),
            EmitterState::FlowMappingFirstKey => self.emit_flow_mapping_key(event, true, analysis),
            EmitterState::FlowMappingKey => self.emit_flow_mapping_key(event, false, analysis),
            EmitterState::FlowMappingSimpleValue => {
                self.emit_flow_mapping_value(event, true, analysis)
            }
            EmitterState::FlowMappingValue => self.emit_flow_mapping_value(event, false, analysis),
            EmitterState::BlockSequenceFirstItem => {
                self.emit_block_sequence_item(event, true, analysis)
            }
            EmitterState::BlockSequenceItem => {
                self.emit_block_sequence_item(event, false, analysis)
            }
            EmitterState::BlockMappingFirstKey => {
                self.emit_block_mapping_key(event, true, analysis)
            }
            EmitterState::BlockMappingKey => self.emit_block_mapping_key(event, false, analysis),
            EmitterState::BlockMappingSimpleValue => {
                self.emit_block_mapping_value(event, true, analysis)
            }
            EmitterState::BlockMappingValue => {
                self.emit_block_mapping_value(event, false, analysis)
            }
            EmitterState::End => Err(unexpected("nothing", event)),
        }
    }

    fn emit_stream_start(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::StreamStart { encoding } = event.data else {
            return Err(unexpected("STREAM-START", event));
        };

        self.encoding = match (self.requested_encoding, encoding) {
            (Encoding::Any, Encoding::Any) => Encoding::Utf8,
            (Encoding::Any, encoding) | (encoding, _) => encoding,
        };
        self.canonical = self.options.canonical;
        self.unicode = self.options.unicode;
        self.best_indent = if (2..=9).contains(&self.options.indent) {
            self.options.indent
        } else {
            2
        };
        self.best_width = if self.options.width < 0 {
            i32::MAX
        } else if self.options.width <= self.best_indent * 2 {
            80
        } else {
            self.options.width
        };
        self.line_break = match self.options.line_break {
            Break::Any => Break::Ln,
            line_break => line_break,
        };
        debug!(
            encoding = ?self.encoding,
            canonical = self.canonical,
            indent = self.best_indent,
            width = self.best_width,
            unicode = self.unicode,
            "starting stream"
        );

        self.indent = -1;
        self.line = 0;
        self.column = 0;
        self.whitespace = true;
        self.indention = true;
        self.open_ended = 0;
        if self.encoding != Encoding::Utf8 {
            self.write_bom()?;
        }
        self.state = EmitterState::FirstDocumentStart;
        Ok(())
    }

    fn emit_document_start(&mut self, event: &Event, first: bool) -> Result<(), EmitterError> {
        match &event.data {
            EventData::DocumentStart {
                version_directive,
                tag_directives,
                implicit,
            } => {
                let default_tag_directives = [
                    TagDirective {
                        handle: String::from("!"),
                        prefix: String::from("!"),
                    },
                    TagDirective {
                        handle: String::from("!!"),
                        prefix: String::from(crate::CORE_SCHEMA_PREFIX),
                    },
                ];
                if let Some(version_directive) = version_directive {
                    analyze_version_directive(*version_directive)?;
                }
                self.tag_directives.clear();
                for tag_directive in tag_directives {
                    analyze_tag_directive(tag_directive)?;
                    self.append_tag_directive(tag_directive, false)?;
                }
                for tag_directive in &default_tag_directives {
                    self.append_tag_directive(tag_directive, true)?;
                }

                let mut implicit = *implicit;
                if !first || self.canonical || self.check_empty_document() {
                    implicit = false;
                }
                if (version_directive.is_some() || !tag_directives.is_empty())
                    && self.open_ended != 0
                {
                    self.write_indicator("...", true, false, false)?;
                    self.write_indent()?;
                }
                self.open_ended = 0;
                if let Some(version_directive) = version_directive {
                    implicit = false;
                    self.write_indicator("%YAML", true, false, false)?;
                    let version = format!("{}.{}", version_directive.major, version_directive.minor);
                    self.write_indicator(&version, true, false, false)?;
                    self.write_indent()?;
                }
                if !tag_directives.is_empty() {
                    implicit = false;
                    for tag_directive in tag_directives {
                        self.write_indicator("%TAG", true, false, false)?;
                        self.write_tag_handle(&tag_directive.handle)?;
                        self.write_tag_content(&tag_directive.prefix, true, true)?;
                        self.write_indent()?;
                    }
                }
                if !implicit {
                    self.write_indent()?;
                    self.write_indicator("---", true, false, false)?;
                    if self.canonical {
                        self.write_indent()?;
                    }
                }
                debug!(implicit, "document start");
                self.state = EmitterState::DocumentContent;
                self.open_ended = 0;
                Ok(())
            }
            EventData::StreamEnd => {
                if self.open_ended == 2 {
                    self.write_indicator("...", true, false, false)?;
                    self.open_ended = 0;
                    self.write_indent()?;
                }
                self.flush_buffer()?;
                debug!(lines = self.line, "stream end");
                self.state = EmitterState::End;
                Ok(())
            }
            _ => Err(unexpected("DOCUMENT-START or STREAM-END", event)),
        }
    }

    fn emit_document_content<'a>(
        &mut self,
        event: &'a Event,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        self.states.push(EmitterState::DocumentEnd);
        self.emit_node(event, false, false, analysis)
    }

    fn emit_document_end(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::DocumentEnd { implicit } = &event.data else {
            return Err(unexpected("DOCUMENT-END", event));
        };
        self.write_indent()?;
        if *implicit {
            if self.open_ended == 0 {
                self.open_ended = 1;
            }
        } else {
            self.write_indicator("...", true, false, false)?;
            self.open_ended = 0;
            self.write_indent()?;
        }
        debug!(implicit = *implicit, "document end");
        self.flush_buffer()?;
        self.state = EmitterState::DocumentStart;
        self.tag_directives.clear();
        Ok(())
    }

    fn emit_flow_sequence_item<'a>(
        &mut self,
        event: &'a Event,
        first: bool,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("[", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::SequenceEnd = &event.data {
            self.flow_level -= 1;
            self.pop_indent();
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("]", false, false, false)?;
            self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        self.states.push(EmitterState::FlowSequenceItem);
        self.emit_node(event, false, false, analysis)
    }

    fn emit_flow_mapping_key<'a>(
        &mut self,
        event: &'a Event,
        first: bool,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("{", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::MappingEnd = &event.data {
            self.flow_level -= 1;
            self.pop_indent();
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("}", false, false, false)?;
            self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        if !self.canonical && self.check_simple_key(event, analysis) {
            self.states.push(EmitterState::FlowMappingSimpleValue);
            self.emit_node(event, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(EmitterState::FlowMappingValue);
            self.emit_node(event, true, false, analysis)
        }
    }

    fn emit_flow_mapping_value<'a>(
        &mut self,
        event: &'a Event,
        simple: bool,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            if self.canonical || self.column > self.best_width {
                self.write_indent()?;
            }
            self.write_indicator(":", true, false, false)?;
        }
        self.states.push(EmitterState::FlowMappingKey);
        self.emit_node(event, true, false, analysis)
    }

    fn emit_block_sequence_item<'a>(
        &mut self,
        event: &'a Event,
        first: bool,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        if first {
            let indentless = self.mapping_context && !self.indention;
            self.increase_indent(false, indentless);
        }
        if let EventData::SequenceEnd = &event.data {
            self.pop_indent();
            self.pop_state();
            return Ok(());
        }
        self.write_indent()?;
        self.write_indicator("-", true, false, true)?;
        self.states.push(EmitterState::BlockSequenceItem);
        self.emit_node(event, false, false, analysis)
    }

    fn emit_block_mapping_key<'a>(
        &mut self,
        event: &'a Event,
        first: bool,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        if first {
            self.increase_indent(false, false);
        }
        if let EventData::MappingEnd = &event.data {
            self.pop_indent();
            self.pop_state();
            return Ok(());
        }
        self.write_indent()?;
        if self.check_simple_key(event, analysis) {
            self.states.push(EmitterState::BlockMappingSimpleValue);
            self.emit_node(event, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(EmitterState::BlockMappingValue);
            self.emit_node(event, true, false, analysis)
        }
    }

    fn emit_block_mapping_value<'a>(
        &mut self,
        event: &'a Event,
        simple: bool,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        self.states.push(EmitterState::BlockMappingKey);
        self.emit_node(event, true, false, analysis)
    }

    fn emit_node<'a>(
        &mut self,
        event: &'a Event,
        mapping: bool,
        simple_key: bool,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;

        match event.data {
            EventData::Alias { .. } => self.emit_alias(analysis),
            EventData::Scalar { .. } => self.emit_scalar(event, analysis),
            EventData::SequenceStart { .. } => self.emit_sequence_start(event, analysis),
            EventData::MappingStart { .. } => self.emit_mapping_start(event, analysis),
            _ => Err(unexpected(
                "SCALAR, SEQUENCE-START, MAPPING-START, or ALIAS",
                event,
            )),
        }
    }

    fn emit_alias(&mut self, analysis: &Analysis) -> Result<(), EmitterError> {
        self.process_anchor(analysis.anchor.as_ref())?;
        if self.simple_key_context {
            self.put(' ')?;
        }
        self.pop_state();
        Ok(())
    }

    fn emit_scalar<'a>(
        &mut self,
        event: &'a Event,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        let EventData::Scalar { value, .. } = &event.data else {
            return Err(unexpected("SCALAR", event));
        };
        let mut scalar = analysis
            .scalar
            .take()
            .unwrap_or_else(|| self.analyze_scalar(value));
        self.select_scalar_style(event, &mut scalar, &mut analysis.tag)?;
        self.process_anchor(analysis.anchor.as_ref())?;
        self.process_tag(analysis.tag.as_ref())?;
        self.increase_indent(true, false);
        self.process_scalar(&scalar)?;
        self.pop_indent();
        self.pop_state();
        Ok(())
    }

    fn emit_sequence_start(&mut self, event: &Event, analysis: &Analysis) -> Result<(), EmitterError> {
        let EventData::SequenceStart { style, .. } = &event.data else {
            return Err(unexpected("SEQUENCE-START", event));
        };
        self.process_anchor(analysis.anchor.as_ref())?;
        self.process_tag(analysis.tag.as_ref())?;

        self.state = if self.flow_level != 0
            || self.canonical
            || *style == SequenceStyle::Flow
            || self.check_empty_sequence()
        {
            EmitterState::FlowSequenceFirstItem
        } else {
            EmitterState::BlockSequenceFirstItem
        };
        Ok(())
    }

    fn emit_mapping_start(&mut self, event: &Event, analysis: &Analysis) -> Result<(), EmitterError> {
        let EventData::MappingStart { style, .. } = &event.data else {
            return Err(unexpected("MAPPING-START", event));
        };
        self.process_anchor(analysis.anchor.as_ref())?;
        self.process_tag(analysis.tag.as_ref())?;

        self.state = if self.flow_level != 0
            || self.canonical
            || *style == MappingStyle::Flow
            || self.check_empty_mapping()
        {
            EmitterState::FlowMappingFirstKey
        } else {
            EmitterState::BlockMappingFirstKey
        };
        Ok(())
    }

    fn check_empty_document(&self) -> bool {
        matches!(
            self.events.front().map(|event| &event.data),
            Some(EventData::Scalar {
                anchor: None,
                tag: None,
                value,
                implicit: ImplicitLevel::Plain,
                ..
            }) if value.is_empty()
        )
    }

    fn check_empty_sequence(&self) -> bool {
        matches!(
            self.events.front().map(|event| &event.data),
            Some(EventData::SequenceEnd)
        )
    }

    fn check_empty_mapping(&self) -> bool {
        matches!(
            self.events.front().map(|event| &event.data),
            Some(EventData::MappingEnd)
        )
    }

    fn check_simple_key(&self, event: &Event, analysis: &Analysis) -> bool {
        let mut length = analysis
            .anchor
            .as_ref()
            .map_or(0, |anchor| anchor.anchor.chars().count());
        length += event.data.tag().map_or(0, |tag| tag.chars().count());

        let fits = match event.data {
            EventData::Alias { .. } => true,
            EventData::Scalar { .. } => match &analysis.scalar {
                Some(scalar) if !scalar.multiline && !scalar.value.is_empty() => {
                    length += scalar.value.chars().count();
                    true
                }
                _ => false,
            },
            EventData::SequenceStart { .. } => self.check_empty_sequence(),
            EventData::MappingStart { .. } => self.check_empty_mapping(),
            _ => false,
        };
        fits && length <= MAX_SIMPLE_KEY_LENGTH
    }

    fn select_scalar_style(
        &self,
        event: &Event,
        scalar: &mut ScalarAnalysis,
        tag_analysis: &mut Option<TagAnalysis>,
    ) -> Result<(), EmitterError> {
        let EventData::Scalar {
            tag,
            implicit,
            style,
            ..
        } = &event.data
        else {
            return Ok(());
        };

        scalar.style = self.choose_scalar_style(*style, *implicit, tag.is_some(), scalar);

        let implied = if scalar.style == ScalarStyle::Plain {
            *implicit == ImplicitLevel::Plain
        } else {
            *implicit == ImplicitLevel::NonPlain
        };
        if (!self.canonical || tag.is_none()) && implied {
            *tag_analysis = None;
            return Ok(());
        }
        let tag = match tag.as_deref() {
            Some(tag) => tag,
            None if *implicit == ImplicitLevel::Plain => "!",
            None => {
                return Err(EmitterError::Problem(
                    "neither tag nor implicit flags are specified",
                ))
            }
        };
        *tag_analysis = Some(self.analyze_tag(tag)?);
        Ok(())
    }

    fn choose_scalar_style(
        &self,
        requested: ScalarStyle,
        implicit: ImplicitLevel,
        tagged: bool,
        scalar: &ScalarAnalysis,
    ) -> ScalarStyle {
        if requested == ScalarStyle::DoubleQuoted || self.canonical {
            return ScalarStyle::DoubleQuoted;
        }

        let simple_key_hazard =
            self.simple_key_context && (scalar.value.is_empty() || scalar.multiline);
        let plain_allowed = if self.flow_level != 0 {
            scalar.flow_plain_allowed
        } else {
            scalar.block_plain_allowed
        };
        if matches!(requested, ScalarStyle::Any | ScalarStyle::Plain)
            && (implicit == ImplicitLevel::Plain || tagged)
            && !simple_key_hazard
            && plain_allowed
        {
            return ScalarStyle::Plain;
        }

        if matches!(requested, ScalarStyle::Literal | ScalarStyle::Folded) {
            if self.flow_level == 0 && !self.simple_key_context && scalar.block_allowed {
                return requested;
            }
            return ScalarStyle::DoubleQuoted;
        }

        if scalar.single_quoted_allowed && !(self.simple_key_context && scalar.multiline) {
            return ScalarStyle::SingleQuoted;
        }
        ScalarStyle::DoubleQuoted
    }

    fn process_anchor(&mut self, analysis: Option<&AnchorAnalysis>) -> Result<(), EmitterError> {
        let Some(analysis) = analysis else {
            return Ok(());
        };
        self.write_indicator(
            if analysis.alias { "*" } else { "&" },
            true,
            false,
            false,
        )?;
        self.write_anchor(analysis.anchor)
    }

    fn process_tag(&mut self, analysis: Option<&TagAnalysis>) -> Result<(), EmitterError> {
        let Some(analysis) = analysis else {
            return Ok(());
        };

        if analysis.handle.is_empty() && analysis.suffix.is_empty() {
            return Ok(());
        }
        if analysis.handle.is_empty() {
            self.write_indicator("!<", true, false, false)?;
            self.write_tag_content(&analysis.suffix, false, true)?;
            self.write_indicator(">", false, false, false)?;
        } else {
            self.write_tag_handle(&analysis.handle)?;
            if !analysis.suffix.is_empty() {
                self.write_tag_content(&analysis.suffix, false, false)?;
            }
        }
        Ok(())
    }

    fn process_scalar(&mut self, analysis: &ScalarAnalysis) -> Result<(), EmitterError> {
        match analysis.style {
            ScalarStyle::Plain => self.write_plain_scalar(analysis.value, !self.simple_key_context),
            ScalarStyle::SingleQuoted => {
                self.write_single_quoted_scalar(analysis.value, !self.simple_key_context)
            }
            ScalarStyle::DoubleQuoted => {
                self.write_double_quoted_scalar(analysis.value, !self.simple_key_context)
            }
            ScalarStyle::Literal => self.write_literal_scalar(analysis.value),
            ScalarStyle::Folded => self.write_folded_scalar(analysis.value),
            ScalarStyle::Any => Err(EmitterError::Problem("no scalar style was selected")),
        }
    }

    fn analyze_anchor<'a>(
        &self,
        anchor: &'a str,
        alias: bool,
    ) -> Result<AnchorAnalysis<'a>, EmitterError> {
        if anchor.is_empty() {
            return Err(EmitterError::Problem(if alias {
                "alias value must not be empty"
            } else {
                "anchor value must not be empty"
            }));
        }
        if !anchor.chars().all(is_alpha) {
            return Err(EmitterError::Problem(if alias {
                "alias value must contain alphanumerical characters only"
            } else {
                "anchor value must contain alphanumerical characters only"
            }));
        }
        Ok(AnchorAnalysis { anchor, alias })
    }

    fn analyze_tag(&self, tag: &str) -> Result<TagAnalysis, EmitterError> {
        if tag.is_empty() {
            return Err(EmitterError::Problem("tag value must not be empty"));
        }
        if tag == "!" {
            return Ok(TagAnalysis {
                handle: String::from("!"),
                suffix: String::new(),
            });
        }

        for directive in &self.tag_directives {
            if directive.prefix.len() < tag.len() && tag.starts_with(&directive.prefix) {
                return Ok(TagAnalysis {
                    handle: directive.handle.clone(),
                    suffix: String::from(&tag[directive.prefix.len()..]),
                });
            }
        }

        Ok(TagAnalysis {
            handle: String::new(),
            suffix: String::from(tag),
        })
    }

    fn analyze_scalar<'a>(&self, value: &'a str) -> ScalarAnalysis<'a> {
        let mut block_indicators = false;
        let mut flow_indicators = false;
        let mut line_breaks = false;
        let mut special_characters = false;
        let mut leading_space = false;
        let mut leading_break = false;
        let mut trailing_space = false;
        let mut trailing_break = false;
        let mut break_space = false;
        let mut space_break = false;
        let mut preceded_by_whitespace;
        let mut previous_space = false;
        let mut previous_break = false;

        if value.is_empty() {
            return ScalarAnalysis {
                value: "",
                multiline: false,
                flow_plain_allowed: false,
                block_plain_allowed: true,
                single_quoted_allowed: true,
                block_allowed: false,
                style: ScalarStyle::Any,
            };
        }

        if value.starts_with("---") || value.starts_with("...") {
            block_indicators = true;
            flow_indicators = true;
        }
        preceded_by_whitespace = true;

        let mut chars = value.chars();
        let mut first = true;

        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            let followed_by_whitespace = is_blankz(next);
            if first {
                match ch {
                    '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\''
                    | '"' | '%' | '@' | '`' => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    '?' | ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '-' if followed_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            } else {
                match ch {
                    ',' | '?' | '[' | ']' | '{' | '}' => {
                        flow_indicators = true;
                    }
                    ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '#' if preceded_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            }

            if !is_printable(ch) || !is_ascii(ch) && !self.unicode {
                special_characters = true;
            }
            if is_break(ch) {
                line_breaks = true;
            }

            if is_space(ch) {
                if first {
                    leading_space = true;
                }
                if next.is_none() {
                    trailing_space = true;
                }
                if previous_break {
                    break_space = true;
                }
                previous_space = true;
                previous_break = false;
            } else if is_break(ch) {
                if first {
                    leading_break = true;
                }
                if next.is_none() {
                    trailing_break = true;
                }
                if previous_space {
                    space_break = true;
                }
                previous_space = false;
                previous_break = true;
            } else {
                previous_space = false;
                previous_break = false;
            }

            preceded_by_whitespace = is_blankz(ch);
            first = false;
        }

        let mut analysis = ScalarAnalysis {
            value,
            multiline: line_breaks,
            flow_plain_allowed: true,
            block_plain_allowed: true,
            single_quoted_allowed: true,
            block_allowed: true,
            style: ScalarStyle::Any,
        };

        if leading_space || leading_break || trailing_space || trailing_break {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if trailing_space {
            analysis.block_allowed = false;
        }
        if break_space {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
        }
        if space_break || special_characters {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
            analysis.block_allowed = false;
        }
        if line_breaks {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if flow_indicators {
            analysis.flow_plain_allowed = false;
        }
        if block_indicators {
            analysis.block_plain_allowed = false;
        }
        analysis
    }

    fn analyze_event<'a>(&self, event: &'a Event) -> Result<Analysis<'a>, EmitterError> {
        let mut analysis = Analysis::default();

        match &event.data {
            EventData::Alias { anchor } => {
                analysis.anchor = Some(self.analyze_anchor(anchor, true)?);
            }
            EventData::Scalar { anchor, value, .. } => {
                if let Some(anchor) = anchor {
                    analysis.anchor = Some(self.analyze_anchor(anchor, false)?);
                }
                // The tag depends on the chosen style and is settled when the
                // scalar is written.
                analysis.scalar = Some(self.analyze_scalar(value));
            }
            EventData::SequenceStart {
                anchor,
                tag,
                implicit,
                ..
            }
            | EventData::MappingStart {
                anchor,
                tag,
                implicit,
                ..
            } => {
                if let Some(anchor) = anchor {
                    analysis.anchor = Some(self.analyze_anchor(anchor, false)?);
                }
                match tag {
                    Some(tag) if self.canonical || !*implicit => {
                        analysis.tag = Some(self.analyze_tag(tag)?);
                    }
                    None if !*implicit => {
                        return Err(EmitterError::Problem(
                            "tag is not specified for an explicit collection",
                        ));
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        Ok(analysis)
    }

    fn flush_if_needed(&mut self) -> Result<(), WriterError> {
        if self.buffer.len() < OUTPUT_BUFFER_SIZE - 5 {
            Ok(())
        } else {
            self.flush_buffer()
        }
    }

    fn put(&mut self, value: char) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        self.buffer.push(value);
        self.column += 1;
        Ok(())
    }

    fn put_break(&mut self) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        match self.line_break {
            Break::Cr => self.buffer.push('\r'),
            Break::CrLn => self.buffer.push_str("\r\n"),
            Break::Any | Break::Ln => self.buffer.push('\n'),
        }
        self.column = 0;
        self.line += 1;
        Ok(())
    }

    fn write_str(&mut self, string: &str) -> Result<(), WriterError> {
        for ch in string.chars() {
            self.write_char(ch)?;
        }
        Ok(())
    }

    fn write_char(&mut self, ch: char) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        self.buffer.push(ch);
        self.column += 1;
        Ok(())
    }

    fn write_break_char(&mut self, ch: char) -> Result<(), WriterError> {
        if ch == '\n' {
            self.put_break()
        } else {
            self.write_char(ch)?;
            self.column = 0;
            self.line += 1;
            Ok(())
        }
    }

    fn write_bom(&mut self) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        self.buffer.push('\u{feff}');
        Ok(())
    }

    fn write_indent(&mut self) -> Result<(), WriterError> {
        let indent = if self.indent >= 0 { self.indent } else { 0 };
        if !self.indention || self.column > indent || self.column == indent && !self.whitespace {
            self.put_break()?;
        }
        while self.column < indent {
            self.put(' ')?;
        }
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        is_whitespace: bool,
        is_indention: bool,
    ) -> Result<(), WriterError> {
        if need_whitespace && !self.whitespace {
            self.put(' ')?;
        }
        self.write_str(indicator)?;
        self.whitespace = is_whitespace;
        self.indention = self.indention && is_indention;
        self.open_ended = 0;
        Ok(())
    }

    fn write_anchor(&mut self, value: &str) -> Result<(), EmitterError> {
        self.write_str(value)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_handle(&mut self, value: &str) -> Result<(), EmitterError> {
        if !self.whitespace {
            self.put(' ')?;
        }
        self.write_str(value)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    /// Writes a tag suffix or prefix, `%`-escaping every byte of a character
    /// the scanner would not read back as part of the tag. Flow indicators
    /// and `!` are only safe inside `!<...>` and `%TAG` prefixes.
    fn write_tag_content(
        &mut self,
        value: &str,
        need_whitespace: bool,
        verbatim: bool,
    ) -> Result<(), EmitterError> {
        if need_whitespace && !self.whitespace {
            self.put(' ')?;
        }

        for ch in value.chars() {
            let safe = is_alpha(ch)
                || ";/?:@&=+$.~*'()".contains(ch)
                || verbatim && ",[]!".contains(ch);
            if safe {
                self.write_char(ch)?;
                continue;
            }

            let mut encode_buffer = [0u8; 4];
            for byte in ch.encode_utf8(&mut encode_buffer).bytes() {
                let upper = char::from_digit(u32::from(byte >> 4), 16);
                let lower = char::from_digit(u32::from(byte & 0x0F), 16);
                self.put('%')?;
                for digit in [upper, lower].into_iter().flatten() {
                    self.put(digit.to_ascii_uppercase())?;
                }
            }
        }

        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_plain_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<(), EmitterError> {
        let mut spaces = false;
        let mut breaks = false;
        if !self.whitespace && (!value.is_empty() || self.flow_level != 0) {
            self.put(' ')?;
        }

        let mut chars = value.chars();

        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            if is_space(ch) {
                if allow_breaks && !spaces && self.column > self.best_width && !is_space(next) {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
        }

        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_single_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), EmitterError> {
        let mut spaces = false;
        let mut breaks = false;
        self.write_indicator("'", true, false, false)?;
        let mut chars = value.chars();
        let mut is_first = true;
        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            let is_last = next.is_none();

            if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && !is_first
                    && !is_last
                    && !is_space(next)
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                if ch == '\'' {
                    self.put('\'')?;
                }
                self.indention = false;
                spaces = false;
                breaks = false;
            }

            is_first = false;
        }

        if breaks {
            self.write_indent()?;
        }

        self.write_indicator("'", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_double_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), EmitterError> {
        let mut spaces = false;
        self.write_indicator("\"", true, false, false)?;
        let mut chars = value.chars();
        let mut first = true;
        while let Some(ch) = chars.next() {
            if !is_printable(ch)
                || !self.unicode && !is_ascii(ch)
                || is_bom(ch)
                || is_break(ch)
                || ch == '"'
                || ch == '\\'
            {
                self.put('\\')?;
                match escape_letter(ch) {
                    Some(letter) => self.put(letter)?,
                    None => {
                        let (prefix, width) = if ch <= '\u{ff}' {
                            ('x', 2)
                        } else if ch <= '\u{ffff}' {
                            ('u', 4)
                        } else {
                            ('U', 8)
                        };
                        self.put(prefix)?;
                        let code = u32::from(ch);
                        for shift in (0..width).rev() {
                            let digit = (code >> (shift * 4)) & 0x0F;
                            if let Some(digit) = char::from_digit(digit, 16) {
                                self.put(digit.to_ascii_uppercase())?;
                            }
                        }
                    }
                }
                spaces = false;
            } else if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && !first
                    && chars.clone().next().is_some()
                {
                    self.write_indent()?;
                    if is_space(chars.clone().next()) {
                        self.put('\\')?;
                    }
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else {
                self.write_char(ch)?;
                spaces = false;
            }

            first = false;
        }
        self.write_indicator("\"", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_block_scalar_hints(&mut self, string: &str) -> Result<(), EmitterError> {
        let mut chomp_hint: Option<&str> = None;

        let first = string.chars().next();
        if is_space(first) || is_break(first) {
            // 2..=9 after normalization at stream start.
            let hint = char::from(b'0' + self.best_indent as u8);
            let mut buffer = [0u8; 4];
            self.write_indicator(hint.encode_utf8(&mut buffer), false, false, false)?;
        }
        self.open_ended = 0;

        let mut chars_rev = string.chars().rev();
        let last = chars_rev.next();
        let next_to_last = chars_rev.next();

        if !is_break(last) {
            chomp_hint = Some("-");
        } else if is_breakz(next_to_last) {
            chomp_hint = Some("+");
            self.open_ended = 2;
        }

        if let Some(chomp_hint) = chomp_hint {
            self.write_indicator(chomp_hint, false, false, false)?;
        }
        Ok(())
    }

    fn write_literal_scalar(&mut self, value: &str) -> Result<(), EmitterError> {
        let mut breaks = true;
        self.write_indicator("|", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;

        for ch in value.chars() {
            if is_break(ch) {
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                breaks = false;
            }
        }

        Ok(())
    }

    fn write_folded_scalar(&mut self, value: &str) -> Result<(), EmitterError> {
        let mut breaks = true;
        let mut leading_spaces = true;

        self.write_indicator(">", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;

        let mut chars = value.chars();

        while let Some(ch) = chars.next() {
            if is_break(ch) {
                if !breaks && !leading_spaces && ch == '\n' {
                    // A lone line break between two content lines would be
                    // folded into a space when read back, so double it.
                    let mut rest = chars.clone().skip_while(|ch| is_break(*ch));
                    if !is_blankz(rest.next()) {
                        self.put_break()?;
                    }
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    leading_spaces = is_blank(ch);
                }
                if !breaks
                    && is_space(ch)
                    && !is_space(chars.clone().next())
                    && self.column > self.best_width
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }
}

fn unexpected(expected: &'static str, event: &Event) -> EmitterError {
    EmitterError::UnexpectedEvent {
        expected,
        found: event.data.kind(),
    }
}

fn analyze_version_directive(version_directive: VersionDirective) -> Result<(), EmitterError> {
    if version_directive.major != 1 {
        return Err(EmitterError::Problem("incompatible %YAML directive"));
    }
    Ok(())
}

fn analyze_tag_directive(tag_directive: &TagDirective) -> Result<(), EmitterError> {
    let handle = tag_directive.handle.as_str();
    let prefix = tag_directive.prefix.as_str();

    if handle.is_empty() {
        return Err(EmitterError::Problem("tag handle must not be empty"));
    }
    if !handle.starts_with('!') {
        return Err(EmitterError::Problem("tag handle must start with '!'"));
    }
    if !handle.ends_with('!') {
        return Err(EmitterError::Problem("tag handle must end with '!'"));
    }
    if handle.len() > 2 && !handle[1..handle.len() - 1].chars().all(is_alpha) {
        return Err(EmitterError::Problem(
            "tag handle must contain alphanumerical characters only",
        ));
    }
    if prefix.is_empty() {
        return Err(EmitterError::Problem("tag prefix must not be empty"));
    }
    Ok(())
}

/// The short escape for a character in a double-quoted scalar, if it has one.
fn escape_letter(ch: char) -> Option<char> {
    Some(match ch {
        '\0' => '0',
        '\x07' => 'a',
        '\x08' => 'b',
        '\x09' => 't',
        '\x0A' => 'n',
        '\x0B' => 'v',
        '\x0C' => 'f',
        '\x0D' => 'r',
        '\x1B' => 'e',
        '\x22' => '"',
        '\x5C' => '\\',
        '\u{0085}' => 'N',
        '\u{00A0}' => '_',
        '\u{2028}' => 'L',
        '\u{2029}' => 'P',
        _ => return None,
    })
}
