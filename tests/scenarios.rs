use pretty_assertions::assert_eq;
use yaml_syntax::{
    emit, parse, scan, EmitOptions, Emitter, Encoding, Error, Event, EventData, ImplicitLevel,
    MappingStyle, ScalarStyle, ScannerError, SequenceStyle, TokenData,
};

fn scalar(value: &str) -> EventData {
    EventData::Scalar {
        anchor: None,
        tag: None,
        value: String::from(value),
        implicit: ImplicitLevel::Plain,
        style: ScalarStyle::Plain,
    }
}

fn node_events(input: &str) -> Vec<EventData> {
    parse(input)
        .unwrap()
        .into_iter()
        .map(|event| event.data)
        .filter(|data| {
            !matches!(
                data,
                EventData::StreamStart { .. }
                    | EventData::StreamEnd
                    | EventData::DocumentStart { .. }
                    | EventData::DocumentEnd { .. }
            )
        })
        .collect()
}

#[test]
fn flow_mapping_with_nested_sequence() {
    assert_eq!(
        node_events("{a: 1, b: [2, 3]}"),
        [
            EventData::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: MappingStyle::Flow,
            },
            scalar("a"),
            scalar("1"),
            scalar("b"),
            EventData::SequenceStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: SequenceStyle::Flow,
            },
            scalar("2"),
            scalar("3"),
            EventData::SequenceEnd,
            EventData::MappingEnd,
        ]
    );
}

#[test]
fn nested_block_sequence_pushes_and_pops_once() {
    let input = "   - a\n   - - b\n     - c\n   - d\n";
    let kinds: Vec<&str> = scan(input)
        .unwrap()
        .into_iter()
        .map(|token| match token.data {
            TokenData::StreamStart { .. } => "STREAM-START",
            TokenData::StreamEnd => "STREAM-END",
            TokenData::BlockSequenceStart => "BLOCK-SEQUENCE-START",
            TokenData::BlockEnd => "BLOCK-END",
            TokenData::BlockEntry => "-",
            TokenData::Scalar { .. } => "SCALAR",
            _ => "OTHER",
        })
        .collect();
    assert_eq!(
        kinds,
        [
            "STREAM-START",
            "BLOCK-SEQUENCE-START",
            "-",
            "SCALAR",
            "-",
            "BLOCK-SEQUENCE-START",
            "-",
            "SCALAR",
            "-",
            "SCALAR",
            "BLOCK-END",
            "-",
            "SCALAR",
            "BLOCK-END",
            "STREAM-END",
        ]
    );
}

fn emit_document(nodes: Vec<Event>) -> String {
    let mut events = vec![
        Event::stream_start(Encoding::Utf8),
        Event::document_start(None, &[], true),
    ];
    events.extend(nodes);
    events.push(Event::document_end(true));
    events.push(Event::stream_end());
    emit(events, &EmitOptions::default()).unwrap()
}

#[test]
fn surrounding_spaces_force_quotes() {
    for style in [ScalarStyle::Any, ScalarStyle::Plain] {
        let output = emit_document(vec![Event::scalar(
            None,
            None,
            "  leading and trailing  ",
            ImplicitLevel::NonPlain,
            style,
        )]);
        assert_eq!(output, "'  leading and trailing  '\n");
    }

    let output = emit_document(vec![
        Event::sequence_start(None, None, true, SequenceStyle::Flow),
        Event::scalar(
            None,
            None,
            "  leading and trailing  ",
            ImplicitLevel::Plain,
            ScalarStyle::Plain,
        ),
        Event::sequence_end(),
    ]);
    assert_eq!(output, "[! '  leading and trailing  ']\n");
}

#[test]
fn long_or_multiline_keys_are_explicit() {
    let long = "x".repeat(120);
    let anchor = "a".repeat(10);
    let output = emit_document(vec![
        Event::mapping_start(None, None, true, MappingStyle::Block),
        Event::scalar(Some(&anchor), None, &long, ImplicitLevel::Plain, ScalarStyle::Any),
        Event::scalar(None, None, "v", ImplicitLevel::Plain, ScalarStyle::Any),
        Event::mapping_end(),
    ]);
    assert_eq!(output, format!("? &{anchor} {long}\n: v\n"));

    let short = "x".repeat(118);
    let output = emit_document(vec![
        Event::mapping_start(None, None, true, MappingStyle::Block),
        Event::scalar(Some(&anchor), None, &short, ImplicitLevel::Plain, ScalarStyle::Any),
        Event::scalar(None, None, "v", ImplicitLevel::Plain, ScalarStyle::Any),
        Event::mapping_end(),
    ]);
    assert_eq!(output, format!("&{anchor} {short}: v\n"));

    let output = emit_document(vec![
        Event::mapping_start(None, None, true, MappingStyle::Flow),
        Event::scalar(None, None, "two\nlines", ImplicitLevel::NonPlain, ScalarStyle::Any),
        Event::scalar(None, None, "v", ImplicitLevel::Plain, ScalarStyle::Any),
        Event::mapping_end(),
    ]);
    assert!(output.starts_with("{? "), "{output:?}");
    let reparsed = node_events(&output);
    assert_eq!(
        reparsed[1],
        EventData::Scalar {
            anchor: None,
            tag: None,
            value: String::from("two\nlines"),
            implicit: ImplicitLevel::NonPlain,
            style: ScalarStyle::SingleQuoted,
        }
    );
}

#[test]
fn unterminated_quote_points_at_opening_quote() {
    let Err(Error::Scanner(ScannerError::Problem {
        context,
        context_mark,
        problem,
        problem_mark,
    })) = scan("\"abc")
    else {
        panic!("expected a scanner error");
    };
    assert_eq!(context, "while scanning a quoted scalar");
    assert_eq!(problem, "found unexpected end of stream");
    assert_eq!((context_mark.line, context_mark.column), (0, 0));
    assert_eq!((problem_mark.line, problem_mark.column), (0, 4));
}

#[test]
fn emitter_accepts_events_one_at_a_time() {
    let mut output = Vec::new();
    {
        let mut emitter = Emitter::new();
        emitter.set_output_string(&mut output);
        for event in parse("- a\n- {b: c}\n").unwrap() {
            emitter.emit(event).unwrap();
        }
    }
    assert_eq!(String::from_utf8(output).unwrap(), "- a\n- {b: c}\n");
}
