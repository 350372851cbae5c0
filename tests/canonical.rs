use pretty_assertions::assert_eq;
use yaml_syntax::{canonical_parse, emit, parse, EmitOptions, Event, EventData};

const SAMPLES: &[&str] = &[
    "a: [1, 2]\nb: {c: d}\n",
    "- !!str tagged\n- !local x\n- !<tag:example.com,2000:y> z\n- ! bare\n",
    "--- &top\n- *top\n- 'quoted'\n- \"esc\\u00e9\\n\"\n--- second\n",
    "? [complex, key]\n: |\n  literal\n  text\n",
    "--- !<tag:example.com,2000:thing> {k: v}\n",
    "[]\n--- {}\n--- ''\n",
];

fn canonical(events: Vec<Event>) -> String {
    let options = EmitOptions {
        canonical: true,
        ..EmitOptions::default()
    };
    emit(events, &options).unwrap()
}

fn data(events: Vec<Event>) -> Vec<EventData> {
    events.into_iter().map(|event| event.data).collect()
}

#[test]
fn both_parsers_agree_on_canonical_output() {
    for sample in SAMPLES {
        let output = canonical(parse(sample).unwrap());
        let general = data(parse(&output).unwrap());
        let strict = data(canonical_parse(&output).unwrap());
        assert_eq!(general, strict, "for output:\n{output}");
    }
}

#[test]
fn canonical_output_is_a_fixed_point() {
    for sample in SAMPLES {
        let first = canonical(parse(sample).unwrap());
        let second = canonical(canonical_parse(&first).unwrap());
        assert_eq!(first, second);
    }
}

#[test]
fn collection_events_are_balanced() {
    for sample in SAMPLES {
        let output = canonical(parse(sample).unwrap());
        for events in [parse(sample).unwrap(), canonical_parse(&output).unwrap()] {
            let mut depth = 0usize;
            let mut documents = 0usize;
            for event in &events {
                match event.data {
                    EventData::SequenceStart { .. } | EventData::MappingStart { .. } => depth += 1,
                    EventData::SequenceEnd | EventData::MappingEnd => {
                        depth = depth.checked_sub(1).expect("unbalanced end event");
                    }
                    EventData::DocumentStart { .. } => {
                        assert_eq!(depth, 0);
                        documents += 1;
                    }
                    EventData::DocumentEnd { .. } => assert_eq!(depth, 0),
                    _ => {}
                }
            }
            assert_eq!(depth, 0);
            assert!(documents > 0);
            assert!(matches!(
                events.first().map(|event| &event.data),
                Some(EventData::StreamStart { .. })
            ));
            assert!(matches!(
                events.last().map(|event| &event.data),
                Some(EventData::StreamEnd)
            ));
        }
    }
}
