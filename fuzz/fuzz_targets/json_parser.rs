#![no_main]

use libfuzzer_sys::fuzz_target;
use logtide_core::receiver::MessageParser;
use logtide_receiver::JsonLinesParser;

fuzz_target!(|data: &str| {
    let parser = JsonLinesParser::default();
    let _ = parser.parse(data, 1);
});
