#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::too_many_lines)]

use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use yaml_syntax::{
    CanonicalParser, Event, EventData, MappingStyle, Parser, ParserError, ScalarStyle,
    SequenceStyle,
};

pub(crate) fn test_main(
    input: &mut dyn io::BufRead,
    stdout: &mut dyn Write,
    canonical: bool,
) -> Result<(), Box<dyn Error>> {
    let events: Box<dyn Iterator<Item = Result<Event, ParserError>> + '_> = if canonical {
        let mut parser = CanonicalParser::new();
        parser.set_input(input);
        Box::new(parser)
    } else {
        let mut parser = Parser::new();
        parser.set_input(input);
        Box::new(parser)
    };

    for event in events {
        let event = event?;
        let line = match &event.data {
            EventData::StreamStart { .. } => String::from("+STR"),
            EventData::StreamEnd => String::from("-STR"),
            EventData::DocumentStart { implicit, .. } => {
                if *implicit {
                    String::from("+DOC")
                } else {
                    String::from("+DOC ---")
                }
            }
            EventData::DocumentEnd { implicit } => {
                if *implicit {
                    String::from("-DOC")
                } else {
                    String::from("-DOC ...")
                }
            }
            EventData::Alias { anchor } => format!("=ALI *{anchor}"),
            EventData::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                let indicator = match style {
                    ScalarStyle::SingleQuoted => '\'',
                    ScalarStyle::DoubleQuoted => '"',
                    ScalarStyle::Literal => '|',
                    ScalarStyle::Folded => '>',
                    _ => ':',
                };
                format!(
                    "=VAL{} {indicator}{}",
                    properties(anchor.as_deref(), tag.as_deref()),
                    escape(value)
                )
            }
            EventData::SequenceStart {
                anchor, tag, style, ..
            } => format!(
                "+SEQ{}{}",
                if *style == SequenceStyle::Flow { " []" } else { "" },
                properties(anchor.as_deref(), tag.as_deref())
            ),
            EventData::SequenceEnd => String::from("-SEQ"),
            EventData::MappingStart {
                anchor, tag, style, ..
            } => format!(
                "+MAP{}{}",
                if *style == MappingStyle::Flow { " {}" } else { "" },
                properties(anchor.as_deref(), tag.as_deref())
            ),
            EventData::MappingEnd => String::from("-MAP"),
        };
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}

fn properties(anchor: Option<&str>, tag: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(anchor) = anchor {
        out.push_str(" &");
        out.push_str(anchor);
    }
    if let Some(tag) = tag {
        out.push_str(" <");
        out.push_str(tag);
        out.push('>');
    }
    out
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\x08' => out.push_str("\\b"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch => out.push(ch),
        }
    }
    out
}

fn main() -> ExitCode {
    let mut canonical = false;
    let mut paths = Vec::new();
    for arg in env::args_os().skip(1) {
        if arg == "--canonical" {
            canonical = true;
        } else {
            paths.push(arg);
        }
    }
    if paths.is_empty() {
        let _ = writeln!(
            io::stderr(),
            "Usage: run-parser-test-suite [--canonical] <in.yaml>..."
        );
        return ExitCode::FAILURE;
    }
    for path in paths {
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) => {
                let _ = writeln!(io::stderr(), "{}: {err}", path.to_string_lossy());
                return ExitCode::FAILURE;
            }
        };
        let mut input = BufReader::new(file);
        let mut stdout = io::stdout();
        if let Err(err) = test_main(&mut input, &mut stdout, canonical) {
            let _ = writeln!(io::stderr(), "Parse error: {err}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
