use std::mem::discriminant;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use yaml_syntax::{
    emit, parse, Break, EmitOptions, Encoding, Event, EventData, ImplicitLevel, MappingStyle,
    ScalarStyle, SequenceStyle,
};

#[derive(Debug, Clone)]
enum Node {
    Scalar { value: String, quoted: bool },
    Sequence { items: Vec<Node>, flow: bool },
    Mapping { entries: Vec<(Node, Node)>, flow: bool },
}

impl Node {
    fn push_events(&self, events: &mut Vec<Event>) {
        match self {
            Node::Scalar { value, quoted } => {
                let implicit = if *quoted {
                    ImplicitLevel::NonPlain
                } else {
                    ImplicitLevel::Plain
                };
                events.push(Event::scalar(None, None, value, implicit, ScalarStyle::Any));
            }
            Node::Sequence { items, flow } => {
                let style = if *flow {
                    SequenceStyle::Flow
                } else {
                    SequenceStyle::Block
                };
                events.push(Event::sequence_start(None, None, true, style));
                for item in items {
                    item.push_events(events);
                }
                events.push(Event::sequence_end());
            }
            Node::Mapping { entries, flow } => {
                let style = if *flow {
                    MappingStyle::Flow
                } else {
                    MappingStyle::Block
                };
                events.push(Event::mapping_start(None, None, true, style));
                for (key, value) in entries {
                    key.push_events(events);
                    value.push_events(events);
                }
                events.push(Event::mapping_end());
            }
        }
    }
}

fn scalar_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9 ,:#'\"-]{0,8}",
        "[a-z ]{0,3}\n[a-z ]{0,3}",
    ]
}

fn node() -> impl Strategy<Value = Node> {
    let leaf = (scalar_text(), any::<bool>())
        .prop_map(|(value, quoted)| Node::Scalar { value, quoted });
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            (prop::collection::vec(inner.clone(), 0..4), any::<bool>())
                .prop_map(|(items, flow)| Node::Sequence { items, flow }),
            (
                prop::collection::vec((inner.clone(), inner), 0..4),
                any::<bool>()
            )
                .prop_map(|(entries, flow)| Node::Mapping { entries, flow }),
        ]
    })
}

fn stream(documents: &[Node]) -> Vec<Event> {
    let mut events = vec![Event::stream_start(Encoding::Utf8)];
    for document in documents {
        events.push(Event::document_start(None, &[], true));
        document.push_events(&mut events);
        events.push(Event::document_end(true));
    }
    events.push(Event::stream_end());
    events
}

/// Compare two event streams up to the presentation details an emitter is
/// free to change.
fn assert_equivalent(original: &[Event], reparsed: &[Event]) {
    assert_eq!(original.len(), reparsed.len(), "event count differs");
    for (expected, found) in original.iter().zip(reparsed) {
        match (&expected.data, &found.data) {
            (
                EventData::Scalar {
                    anchor: expected_anchor,
                    tag: expected_tag,
                    value: expected_value,
                    implicit: expected_implicit,
                    ..
                },
                EventData::Scalar {
                    anchor: found_anchor,
                    tag: found_tag,
                    value: found_value,
                    implicit: found_implicit,
                    ..
                },
            ) => {
                assert_eq!(expected_anchor, found_anchor);
                assert_eq!(expected_value, found_value);
                if *expected_implicit != ImplicitLevel::Plain
                    && *found_implicit != ImplicitLevel::Plain
                {
                    assert_eq!(expected_tag, found_tag);
                }
            }
            (
                EventData::SequenceStart { .. } | EventData::MappingStart { .. },
                EventData::SequenceStart { .. } | EventData::MappingStart { .. },
            )
            | (EventData::Alias { .. }, EventData::Alias { .. }) => {
                assert_eq!(expected.data.kind(), found.data.kind());
                assert_eq!(expected.data.anchor(), found.data.anchor());
                assert_eq!(expected.data.tag(), found.data.tag());
            }
            (expected, found) => assert_eq!(discriminant(expected), discriminant(found)),
        }
    }
}

fn round_trip(events: &[Event], options: &EmitOptions) {
    let output = emit(events.to_vec(), options).unwrap();
    let reparsed = parse(&output).unwrap_or_else(|err| panic!("{err}\n--- output:\n{output}"));
    assert_equivalent(events, &reparsed);
}

proptest! {
    #[test]
    fn emitted_documents_read_back(documents in prop::collection::vec(node(), 1..3)) {
        round_trip(&stream(&documents), &EmitOptions::default());
    }

    #[test]
    fn canonical_documents_read_back(documents in prop::collection::vec(node(), 1..3)) {
        let options = EmitOptions {
            canonical: true,
            ..EmitOptions::default()
        };
        round_trip(&stream(&documents), &options);
    }

    #[test]
    fn narrow_documents_read_back(document in node(), indent in 2..10i32) {
        let options = EmitOptions {
            indent,
            width: 2 * indent + 1,
            line_break: Break::CrLn,
            ..EmitOptions::default()
        };
        round_trip(&stream(&[document]), &options);
    }
}

const SAMPLES: &[&str] = &[
    "plain",
    "- a\n- b: c\n  d: [e, {f: g}]\n",
    "? [complex, key]\n: value\n? |\n  literal\n  key\n: >\n  folded\n  value\n",
    "%YAML 1.1\n%TAG !e! tag:example.com,2000:app/\n--- !e!foo &anchor\n- *anchor\n- !!int 42\n- !<tag:other> x\n...\n",
    "---\n\"double \\t quoted\\x41\"\n--- 'single ''quoted'''\n--- |+\n  keep\n\n",
    "{a: 1, ? b, c: , ? : d}\n",
    "[a: 1, b, c: [d]]\n",
    "---\n---\n- \n-\n  - deep\n",
];

#[test]
fn samples_read_back() {
    for sample in SAMPLES {
        let events = parse(sample).unwrap();
        for canonical in [false, true] {
            let options = EmitOptions {
                canonical,
                ..EmitOptions::default()
            };
            round_trip(&events, &options);
        }
    }
}
