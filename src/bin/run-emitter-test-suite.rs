#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::too_many_lines)]

use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;

use yaml_syntax::{
    Emitter, Encoding, Event, ImplicitLevel, MappingStyle, ScalarStyle, SequenceStyle,
};

pub(crate) fn test_main(
    input: &mut dyn BufRead,
    stdout: &mut dyn Write,
    canonical: bool,
    unicode: bool,
) -> Result<(), Box<dyn Error>> {
    let mut emitter = Emitter::new();
    emitter.set_output(stdout);
    emitter.set_canonical(canonical);
    emitter.set_unicode(unicode);

    let mut line_buffer = String::with_capacity(1024);
    loop {
        line_buffer.clear();
        if input.read_line(&mut line_buffer)? == 0 {
            break;
        }
        let line = line_buffer.trim_end_matches(|ch: char| ch == '\n' || ch == '\r');
        if line.is_empty() {
            continue;
        }

        let flow = line.contains(" {}") || line.contains(" []");
        let event = if line.starts_with("+STR") {
            Event::stream_start(Encoding::Utf8)
        } else if line.starts_with("-STR") {
            Event::stream_end()
        } else if let Some(rest) = line.strip_prefix("+DOC") {
            Event::document_start(None, &[], !rest.starts_with(" ---"))
        } else if let Some(rest) = line.strip_prefix("-DOC") {
            Event::document_end(!rest.starts_with(" ..."))
        } else if line.starts_with("+MAP") {
            let tag = get_tag(line);
            Event::mapping_start(
                get_anchor('&', line),
                tag,
                tag.is_none(),
                if flow { MappingStyle::Flow } else { MappingStyle::Block },
            )
        } else if line.starts_with("-MAP") {
            Event::mapping_end()
        } else if line.starts_with("+SEQ") {
            let tag = get_tag(line);
            Event::sequence_start(
                get_anchor('&', line),
                tag,
                tag.is_none(),
                if flow { SequenceStyle::Flow } else { SequenceStyle::Block },
            )
        } else if line.starts_with("-SEQ") {
            Event::sequence_end()
        } else if line.starts_with("=VAL") {
            let (style, value) = get_value(line)?;
            let tag = get_tag(line);
            let implicit = match (tag, style) {
                (Some(_), _) => ImplicitLevel::None,
                (None, ScalarStyle::Plain) => ImplicitLevel::Plain,
                (None, _) => ImplicitLevel::NonPlain,
            };
            Event::scalar(get_anchor('&', line), tag, &value, implicit, style)
        } else if line.starts_with("=ALI") {
            let anchor = get_anchor('*', line).ok_or("alias without a name")?;
            Event::alias(anchor)
        } else {
            return Err(format!("Unknown event: '{line}'").into());
        };

        emitter.emit(event)?;
    }
    emitter.flush()?;
    Ok(())
}

fn get_anchor(sigil: char, line: &str) -> Option<&str> {
    // Only look at the properties, which come before the value.
    let properties = line
        .split_once(|ch: char| matches!(ch, ':' | '\'' | '"' | '|' | '>'))
        .map_or(line, |(head, _)| head);
    let (_, from_sigil) = properties.split_once(sigil)?;
    let name = from_sigil.split(' ').next().unwrap_or_default();
    (!name.is_empty()).then_some(name)
}

fn get_tag(line: &str) -> Option<&str> {
    let (_, from_angle_open) = line.split_once('<')?;
    let (until_angle_close, _) = from_angle_open.split_once('>')?;
    Some(until_angle_close)
}

fn get_value(line: &str) -> Result<(ScalarStyle, String), Box<dyn Error>> {
    let mut remainder = line;
    let (style, value) = loop {
        let Some((_before, tail)) = remainder.split_once(' ') else {
            return Err(format!("invalid line: {line}").into());
        };
        let style = match tail.chars().next() {
            Some(':') => ScalarStyle::Plain,
            Some('\'') => ScalarStyle::SingleQuoted,
            Some('"') => ScalarStyle::DoubleQuoted,
            Some('|') => ScalarStyle::Literal,
            Some('>') => ScalarStyle::Folded,
            _ => {
                // An anchor or tag, move to the next space.
                remainder = tail;
                continue;
            }
        };
        break (style, &tail[1..]);
    };

    let mut buffer = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            buffer.push(ch);
            continue;
        }
        buffer.push(match chars.next() {
            Some('\\') => '\\',
            Some('0') => '\0',
            Some('b') => '\x08',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            other => return Err(format!("invalid escape sequence: {other:?}").into()),
        });
    }
    Ok((style, buffer))
}

fn main() -> ExitCode {
    let mut canonical = false;
    let mut unicode = false;
    let mut paths = Vec::new();
    for arg in env::args_os().skip(1) {
        if arg == "--canonical" {
            canonical = true;
        } else if arg == "--unicode" {
            unicode = true;
        } else {
            paths.push(arg);
        }
    }
    if paths.is_empty() {
        let _ = writeln!(
            io::stderr(),
            "Usage: run-emitter-test-suite [--canonical] [--unicode] <test.event>...",
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
        if let Err(err) = test_main(&mut input, &mut stdout, canonical, unicode) {
            let _ = writeln!(io::stderr(), "{err}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
