#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_syntax::{Scanner, TokenData};

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(mut data: &[u8]) {
    let mut scanner = Scanner::new();
    scanner.set_input(&mut data);

    while let Ok(Some(token)) = scanner.get_token() {
        if matches!(token.data, TokenData::StreamEnd) {
            break;
        }
    }
}
