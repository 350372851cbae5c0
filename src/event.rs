use crate::{
    Encoding, MappingStyle, Mark, ScalarStyle, SequenceStyle, TagDirective, VersionDirective,
};

/// The event structure.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Event {
    /// The event data.
    pub data: EventData,
    /// The beginning of the event.
    pub start_mark: Mark,
    /// The end of the event.
    pub end_mark: Mark,
}

/// Whether the tag of a scalar can be left out when it is written.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImplicitLevel {
    /// The tag is implied when the scalar is written in the plain style.
    Plain,
    /// The tag is implied when the scalar is written in any non-plain style.
    NonPlain,
    /// The tag must always be written.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// The stream parameters (for STREAM-START).
    StreamStart {
        /// The document encoding.
        encoding: Encoding,
    },
    StreamEnd,
    /// The document parameters (for DOCUMENT-START).
    DocumentStart {
        /// The version directive.
        version_directive: Option<VersionDirective>,
        /// The tag directives list.
        tag_directives: Vec<TagDirective>,
        /// Is the document indicator implicit?
        implicit: bool,
    },
    /// The document end parameters (for DOCUMENT-END).
    DocumentEnd { implicit: bool },
    /// The alias parameters (for ALIAS).
    Alias {
        /// The anchor.
        anchor: String,
    },
    /// The scalar parameters (for SCALAR).
    Scalar {
        /// The anchor.
        anchor: Option<String>,
        /// The tag.
        tag: Option<String>,
        /// The scalar value.
        value: String,
        /// When the tag may be omitted.
        implicit: ImplicitLevel,
        /// The scalar style.
        style: ScalarStyle,
    },
    /// The sequence parameters (for SEQUENCE-START).
    SequenceStart {
        /// The anchor.
        anchor: Option<String>,
        /// The tag.
        tag: Option<String>,
        /// Is the tag optional?
        implicit: bool,
        /// The sequence style.
        style: SequenceStyle,
    },
    SequenceEnd,
    /// The mapping parameters (for MAPPING-START).
    MappingStart {
        /// The anchor.
        anchor: Option<String>,
        /// The tag.
        tag: Option<String>,
        /// Is the tag optional?
        implicit: bool,
        /// The mapping style.
        style: MappingStyle,
    },
    MappingEnd,
}

impl EventData {
    /// The event name as written in diagnostics, such as `"SCALAR"`.
    pub fn kind(&self) -> &'static str {
        match self {
            EventData::StreamStart { .. } => "STREAM-START",
            EventData::StreamEnd => "STREAM-END",
            EventData::DocumentStart { .. } => "DOCUMENT-START",
            EventData::DocumentEnd { .. } => "DOCUMENT-END",
            EventData::Alias { .. } => "ALIAS",
            EventData::Scalar { .. } => "SCALAR",
            EventData::SequenceStart { .. } => "SEQUENCE-START",
            EventData::SequenceEnd => "SEQUENCE-END",
            EventData::MappingStart { .. } => "MAPPING-START",
            EventData::MappingEnd => "MAPPING-END",
        }
    }

    /// The anchor of a node event, or the anchor an alias refers to.
    pub fn anchor(&self) -> Option<&str> {
        match self {
            EventData::Alias { anchor } => Some(anchor),
            EventData::Scalar { anchor, .. }
            | EventData::SequenceStart { anchor, .. }
            | EventData::MappingStart { anchor, .. } => anchor.as_deref(),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            EventData::Scalar { tag, .. }
            | EventData::SequenceStart { tag, .. }
            | EventData::MappingStart { tag, .. } => tag.as_deref(),
            _ => None,
        }
    }
}

impl Event {
    pub(crate) fn new(data: EventData, start_mark: Mark, end_mark: Mark) -> Event {
        Event {
            data,
            start_mark,
            end_mark,
        }
    }

    fn unmarked(data: EventData) -> Event {
        Event::new(data, Mark::default(), Mark::default())
    }

    /// Create the STREAM-START event.
    pub fn stream_start(encoding: Encoding) -> Self {
        Self::unmarked(EventData::StreamStart { encoding })
    }

    /// Create the STREAM-END event.
    pub fn stream_end() -> Self {
        Self::unmarked(EventData::StreamEnd)
    }

    /// Create the DOCUMENT-START event.
    ///
    /// The `implicit` argument is considered as a stylistic parameter and may be
    /// ignored by the emitter.
    pub fn document_start(
        version_directive: Option<VersionDirective>,
        tag_directives: &[TagDirective],
        implicit: bool,
    ) -> Self {
        Self::unmarked(EventData::DocumentStart {
            version_directive,
            tag_directives: tag_directives.to_vec(),
            implicit,
        })
    }

    /// Create the DOCUMENT-END event.
    ///
    /// The `implicit` argument is considered as a stylistic parameter and may be
    /// ignored by the emitter.
    pub fn document_end(implicit: bool) -> Self {
        Self::unmarked(EventData::DocumentEnd { implicit })
    }

    /// Create an ALIAS event.
    pub fn alias(anchor: &str) -> Self {
        Self::unmarked(EventData::Alias {
            anchor: String::from(anchor),
        })
    }

    /// Create a SCALAR event.
    ///
    /// The `style` argument may be ignored by the emitter. Either the `tag`
    /// must be set or `implicit` must be other than [`ImplicitLevel::None`].
    pub fn scalar(
        anchor: Option<&str>,
        tag: Option<&str>,
        value: &str,
        implicit: ImplicitLevel,
        style: ScalarStyle,
    ) -> Self {
        Self::unmarked(EventData::Scalar {
            anchor: anchor.map(String::from),
            tag: tag.map(String::from),
            value: String::from(value),
            implicit,
            style,
        })
    }

    /// Create a SEQUENCE-START event.
    ///
    /// The `style` argument may be ignored by the emitter.
    ///
    /// Either the `tag` attribute or the `implicit` flag must be set.
    pub fn sequence_start(
        anchor: Option<&str>,
        tag: Option<&str>,
        implicit: bool,
        style: SequenceStyle,
    ) -> Self {
        Self::unmarked(EventData::SequenceStart {
            anchor: anchor.map(String::from),
            tag: tag.map(String::from),
            implicit,
            style,
        })
    }

    /// Create a SEQUENCE-END event.
    pub fn sequence_end() -> Self {
        Self::unmarked(EventData::SequenceEnd)
    }

    /// Create a MAPPING-START event.
    ///
    /// The `style` argument may be ignored by the emitter.
    ///
    /// Either the `tag` attribute or the `implicit` flag must be set.
    pub fn mapping_start(
        anchor: Option<&str>,
        tag: Option<&str>,
        implicit: bool,
        style: MappingStyle,
    ) -> Self {
        Self::unmarked(EventData::MappingStart {
            anchor: anchor.map(String::from),
            tag: tag.map(String::from),
            implicit,
            style,
        })
    }

    /// Create a MAPPING-END event.
    pub fn mapping_end() -> Self {
        Self::unmarked(EventData::MappingEnd)
    }
}
