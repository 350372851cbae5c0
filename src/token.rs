use crate::{Encoding, Mark, ScalarStyle};

/// The token structure.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Token {
    /// The token type.
    pub data: TokenData,
    /// The beginning of the token.
    pub start_mark: Mark,
    /// The end of the token.
    pub end_mark: Mark,
}

impl Token {
    pub(crate) fn new(data: TokenData, start_mark: Mark, end_mark: Mark) -> Token {
        Token {
            data,
            start_mark,
            end_mark,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenData {
    /// A STREAM-START token.
    StreamStart {
        /// The stream encoding.
        encoding: Encoding,
    },
    /// A STREAM-END token.
    StreamEnd,
    /// A VERSION-DIRECTIVE token.
    VersionDirective {
        /// The major version number.
        major: i32,
        /// The minor version number.
        minor: i32,
    },
    /// A TAG-DIRECTIVE token.
    TagDirective {
        /// The tag handle.
        handle: String,
        /// The tag prefix.
        prefix: String,
    },
    /// A directive with a name other than `YAML` or `TAG`. Its parameters
    /// are skipped.
    ReservedDirective {
        /// The directive name.
        name: String,
    },
    /// A DOCUMENT-START token.
    DocumentStart,
    /// A DOCUMENT-END token.
    DocumentEnd,
    /// A BLOCK-SEQUENCE-START token.
    BlockSequenceStart,
    /// A BLOCK-MAPPING-START token.
    BlockMappingStart,
    /// A BLOCK-END token.
    BlockEnd,
    /// A FLOW-SEQUENCE-START token.
    FlowSequenceStart,
    /// A FLOW-SEQUENCE-END token.
    FlowSequenceEnd,
    /// A FLOW-MAPPING-START token.
    FlowMappingStart,
    /// A FLOW-MAPPING-END token.
    FlowMappingEnd,
    /// A BLOCK-ENTRY token.
    BlockEntry,
    /// A FLOW-ENTRY token.
    FlowEntry,
    /// A KEY token.
    Key,
    /// A VALUE token.
    Value,
    /// An ALIAS token.
    Alias {
        /// The alias value.
        value: String,
    },
    /// An ANCHOR token.
    Anchor {
        /// The anchor value.
        value: String,
    },
    /// A TAG token.
    ///
    /// A verbatim tag (`!<...>`) has an empty handle and the whole tag as its
    /// suffix.
    Tag {
        /// The tag handle.
        handle: String,
        /// The tag suffix.
        suffix: String,
    },
    /// A SCALAR token.
    Scalar {
        /// The scalar value.
        value: String,
        /// The scalar style.
        style: ScalarStyle,
    },
}

impl TokenData {
    /// Whether this is a scalar written without quotes or block indicators.
    pub fn is_plain_scalar(&self) -> bool {
        matches!(
            self,
            TokenData::Scalar {
                style: ScalarStyle::Plain,
                ..
            }
        )
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            TokenData::StreamStart { .. } => "STREAM-START",
            TokenData::StreamEnd => "STREAM-END",
            TokenData::VersionDirective { .. } => "VERSION-DIRECTIVE",
            TokenData::TagDirective { .. } => "TAG-DIRECTIVE",
            TokenData::ReservedDirective { .. } => "RESERVED-DIRECTIVE",
            TokenData::DocumentStart => "DOCUMENT-START",
            TokenData::DocumentEnd => "DOCUMENT-END",
            TokenData::BlockSequenceStart => "BLOCK-SEQUENCE-START",
            TokenData::BlockMappingStart => "BLOCK-MAPPING-START",
            TokenData::BlockEnd => "BLOCK-END",
            TokenData::FlowSequenceStart => "FLOW-SEQUENCE-START",
            TokenData::FlowSequenceEnd => "FLOW-SEQUENCE-END",
            TokenData::FlowMappingStart => "FLOW-MAPPING-START",
            TokenData::FlowMappingEnd => "FLOW-MAPPING-END",
            TokenData::BlockEntry => "BLOCK-ENTRY",
            TokenData::FlowEntry => "FLOW-ENTRY",
            TokenData::Key => "KEY",
            TokenData::Value => "VALUE",
            TokenData::Alias { .. } => "ALIAS",
            TokenData::Anchor { .. } => "ANCHOR",
            TokenData::Tag { .. } => "TAG",
            TokenData::Scalar { .. } => "SCALAR",
        }
    }
}
