use std::fmt::Write as _;

use criterion::{criterion_group, criterion_main, Criterion};
use yaml_syntax::{Emitter, Event, Parser, Scanner};

/// A few thousand records mixing block and flow collections, quoted and
/// block scalars, anchors and aliases.
fn large_yaml() -> String {
    let mut yaml = String::from("%YAML 1.1\n---\nrecords:\n");
    for i in 0..5000 {
        let _ = write!(
            yaml,
            "- &r{i}\n  id: {i}\n  name: \"record number {i}\"\n  tags: [alpha, beta, 'gamma {i}']\n  note: |\n    first line of {i}\n    second line\n  owner: {{name: user{i}, active: true}}\n"
        );
        if i > 0 {
            let _ = writeln!(yaml, "- *r{}", i - 1);
        }
    }
    yaml
}

fn parse_events(yaml: &str) -> Vec<Event> {
    let mut parser = Parser::new();
    parser.set_input_string(yaml);
    parser.collect::<Result<_, _>>().unwrap()
}

pub fn parser(c: &mut Criterion) {
    let yaml = large_yaml();

    c.bench_function("scan large", |b| {
        b.iter(|| {
            let mut input = yaml.as_bytes();
            let mut scanner = Scanner::new();
            scanner.set_input(&mut input);
            scanner.map(Result::unwrap).count()
        })
    });

    c.bench_function("parse large", |b| {
        b.iter(|| {
            let mut input = yaml.as_bytes();
            let mut parser = Parser::new();
            parser.set_input(&mut input);
            parser.map(Result::unwrap).count()
        })
    });

    c.bench_function("emit large", |b| {
        // output shouldn't be much larger than the input, but just to be safe...
        let mut buffer = Vec::with_capacity(yaml.len() * 2);
        let events = parse_events(&yaml);

        b.iter_custom(|iters| {
            let mut measurement = std::time::Duration::ZERO;
            for _ in 0..iters {
                let events = events.clone();
                let start_time = std::time::Instant::now();
                let mut emitter = Emitter::new();
                emitter.set_output_string(&mut buffer);
                for event in events {
                    emitter.emit(event).unwrap();
                }
                measurement += start_time.elapsed();
            }
            measurement
        });
    });

    c.bench_function("emit large canonical", |b| {
        let mut buffer = Vec::with_capacity(yaml.len() * 4);
        let events = parse_events(&yaml);

        b.iter_custom(|iters| {
            let mut measurement = std::time::Duration::ZERO;
            for _ in 0..iters {
                let events = events.clone();
                let start_time = std::time::Instant::now();
                let mut emitter = Emitter::new();
                emitter.set_canonical(true);
                emitter.set_output_string(&mut buffer);
                for event in events {
                    emitter.emit(event).unwrap();
                }
                measurement += start_time.elapsed();
            }
            measurement
        });
    });
}

criterion_group!(benches, parser);
criterion_main!(benches);
