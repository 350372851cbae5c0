#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_syntax::{Emitter, EventData, Parser};

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(mut data: &[u8]) {
    let mut parser = Parser::new();
    parser.set_input(&mut data);

    // Parsed events are fed to the emitter as well.
    let mut output = Vec::new();
    let mut emitter = Emitter::new();
    emitter.set_output_string(&mut output);

    while let Ok(Some(event)) = parser.get_event() {
        let is_end = matches!(event.data, EventData::StreamEnd);
        if emitter.emit(event).is_err() {
            break;
        }
        if is_end {
            break;
        }
    }
}
