#![doc = include_str!("../README.md")]
#![doc(html_root_url = "https://docs.rs/yaml-syntax/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::fn_params_excessive_bools,
    clippy::manual_range_contains,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::unnecessary_wraps,
    clippy::match_wildcard_for_single_variants
)]
#![deny(unsafe_code)]

extern crate alloc;

mod canonical;
mod chars;
mod emitter;
mod error;
mod event;
mod mark;
mod parser;
mod reader;
mod scanner;
mod token;
mod writer;

pub use crate::canonical::{CanonicalParser, CanonicalScanner};
pub use crate::emitter::Emitter;
pub use crate::error::*;
pub use crate::event::*;
pub use crate::mark::Mark;
pub use crate::parser::Parser;
pub use crate::reader::Reader;
pub use crate::scanner::Scanner;
pub use crate::token::*;

/// The prefix the `!!` handle expands to.
pub const CORE_SCHEMA_PREFIX: &str = "tag:yaml.org,2002:";

/// The tag `!!null` with the only possible value: `null`.
pub const NULL_TAG: &str = "tag:yaml.org,2002:null";
/// The tag `!!bool` with the values: `true` and `false`.
pub const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
/// The tag `!!str` for string values.
pub const STR_TAG: &str = "tag:yaml.org,2002:str";
/// The tag `!!int` for integer values.
pub const INT_TAG: &str = "tag:yaml.org,2002:int";
/// The tag `!!float` for float values.
pub const FLOAT_TAG: &str = "tag:yaml.org,2002:float";
/// The tag `!!timestamp` for date and time values.
pub const TIMESTAMP_TAG: &str = "tag:yaml.org,2002:timestamp";

/// The tag `!!seq` is used to denote sequences.
pub const SEQ_TAG: &str = "tag:yaml.org,2002:seq";
/// The tag `!!map` is used to denote mapping.
pub const MAP_TAG: &str = "tag:yaml.org,2002:map";

/// The default scalar tag is `!!str`.
pub const DEFAULT_SCALAR_TAG: &str = STR_TAG;
/// The default sequence tag is `!!seq`.
pub const DEFAULT_SEQUENCE_TAG: &str = SEQ_TAG;
/// The default mapping tag is `!!map`.
pub const DEFAULT_MAPPING_TAG: &str = MAP_TAG;

/// The version directive data.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct VersionDirective {
    /// The major version number.
    pub major: i32,
    /// The minor version number.
    pub minor: i32,
}

/// The tag directive data.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct TagDirective {
    /// The tag handle.
    pub handle: String,
    /// The tag prefix.
    pub prefix: String,
}

/// The stream encoding.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Encoding {
    /// Let the parser choose the encoding.
    #[default]
    Any = 0,
    /// The default UTF-8 encoding.
    Utf8 = 1,
    /// The UTF-16-LE encoding with BOM.
    Utf16Le = 2,
    /// The UTF-16-BE encoding with BOM.
    Utf16Be = 3,
}

/// Line break type.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Break {
    /// Let the parser choose the break type.
    #[default]
    Any = 0,
    /// Use CR for line breaks (Mac style).
    Cr = 1,
    /// Use LN for line breaks (Unix style).
    Ln = 2,
    /// Use CR LN for line breaks (DOS style).
    CrLn = 3,
}

/// Scalar styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum ScalarStyle {
    /// Let the emitter choose the style.
    #[default]
    Any = 0,
    /// The plain scalar style.
    Plain = 1,
    /// The single-quoted scalar style.
    SingleQuoted = 2,
    /// The double-quoted scalar style.
    DoubleQuoted = 3,
    /// The literal scalar style.
    Literal = 4,
    /// The folded scalar style.
    Folded = 5,
}

/// Sequence styles.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum SequenceStyle {
    /// Let the emitter choose the style.
    Any = 0,
    /// The block sequence style.
    Block = 1,
    /// The flow sequence style.
    Flow = 2,
}

/// Mapping styles.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum MappingStyle {
    /// Let the emitter choose the style.
    Any = 0,
    /// The block mapping style.
    Block = 1,
    /// The flow mapping style.
    Flow = 2,
}

/// Emitter settings for [`emit`], mirroring the [`Emitter`] setters.
#[derive(Clone, Debug, PartialEq)]
pub struct EmitOptions {
    /// Write the canonical form: flow collections, double-quoted scalars and
    /// explicit tags.
    pub canonical: bool,
    /// The indentation increment, 2 to 9.
    pub indent: i32,
    /// The preferred line width; negative means unlimited.
    pub width: i32,
    /// Write non-ASCII characters unescaped.
    pub unicode: bool,
    /// The line break to write.
    pub line_break: Break,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            canonical: false,
            indent: 2,
            width: 80,
            unicode: false,
            line_break: Break::Ln,
        }
    }
}

/// Scan `input` into tokens.
pub fn scan(input: &str) -> Result<Vec<Token>, Error> {
    let mut scanner = Scanner::new();
    scanner.set_input_string(input);
    Ok(scanner.collect::<Result<_, _>>()?)
}

/// Parse `input` into events.
pub fn parse(input: &str) -> Result<Vec<Event>, Error> {
    let mut parser = Parser::new();
    parser.set_input_string(input);
    Ok(parser.collect::<Result<_, _>>()?)
}

/// Write `events` as YAML text.
///
/// ```
/// # fn main() -> Result<(), yaml_syntax::Error> {
/// let events = yaml_syntax::parse("{a: [1, 2]}")?;
/// let yaml = yaml_syntax::emit(events, &yaml_syntax::EmitOptions::default())?;
/// assert_eq!(yaml, "{a: [1, 2]}\n");
/// # Ok(())
/// # }
/// ```
pub fn emit(
    events: impl IntoIterator<Item = Event>,
    options: &EmitOptions,
) -> Result<String, Error> {
    let mut output = Vec::new();
    {
        let mut emitter = Emitter::new();
        emitter.set_canonical(options.canonical);
        emitter.set_indent(options.indent);
        emitter.set_width(options.width);
        emitter.set_unicode(options.unicode);
        emitter.set_break(options.line_break);
        emitter.set_output_string(&mut output);
        for event in events {
            emitter.emit(event)?;
        }
        emitter.flush()?;
    }
    String::from_utf8(output)
        .map_err(|_| Error::Emitter(EmitterError::Problem("output is not valid UTF-8")))
}

/// Scan canonical YAML into tokens.
pub fn canonical_scan(input: &str) -> Result<Vec<Token>, Error> {
    let mut scanner = CanonicalScanner::new();
    scanner.set_input_string(input);
    Ok(scanner.collect::<Result<_, _>>()?)
}

/// Parse canonical YAML into events.
pub fn canonical_parse(input: &str) -> Result<Vec<Event>, Error> {
    let mut parser = CanonicalParser::new();
    parser.set_input_string(input);
    Ok(parser.collect::<Result<_, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sanity() {
        const SANITY_INPUT: &str = r#"unicode: "Sosa did fine.\u263A"
control: "\b1998\t1999\t2000\n"
hex esc: "\x0d\x0a is \r\n"

single: '"Howdy!" he cried.'
quoted: ' # Not a ''comment''.'
tie-fighter: '|\-*-/|'
"#;
        const SANITY_OUTPUT: &str = r#"unicode: "Sosa did fine.\u263A"
control: "\b1998\t1999\t2000\n"
hex esc: "\r\n is \r\n"
single: '"Howdy!" he cried.'
quoted: ' # Not a ''comment''.'
tie-fighter: '|\-*-/|'
"#;
        let events = parse(SANITY_INPUT).unwrap();
        let output = emit(events, &EmitOptions::default()).unwrap();
        assert_eq!(output, SANITY_OUTPUT);
    }

    #[test]
    fn errors_name_their_stage() {
        assert!(matches!(scan("\"abc"), Err(Error::Scanner(_))));
        assert!(matches!(scan("a\u{1}"), Err(Error::Reader(_))));
        assert!(matches!(parse("- a\nb: c"), Err(Error::Parser(_))));
        assert!(matches!(parse("[a"), Err(Error::Parser(_))));
        assert!(matches!(
            emit(vec![Event::stream_end()], &EmitOptions::default()),
            Err(Error::Emitter(_))
        ));
        assert!(matches!(canonical_parse("--- plain"), Err(Error::Scanner(_))));
    }

    #[test]
    fn canonical_output_reads_back_canonically() {
        let events = parse("a: [1, &x 2, *x]\nb: !!str text\n").unwrap();
        let options = EmitOptions {
            canonical: true,
            ..EmitOptions::default()
        };
        let yaml = emit(events.clone(), &options).unwrap();
        let canonical = canonical_parse(&yaml).unwrap();
        assert_eq!(canonical.len(), events.len());
        assert_eq!(canonical_scan(&yaml).unwrap()[1].data, TokenData::DocumentStart);
    }
}
