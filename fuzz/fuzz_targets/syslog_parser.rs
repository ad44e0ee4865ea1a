#![no_main]

use libfuzzer_sys::fuzz_target;
use logtide_core::receiver::MessageParser;
use logtide_receiver::SyslogParser;

fuzz_target!(|data: &str| {
    let parser = SyslogParser::new();
    let _ = parser.sniff(data);
    let _ = parser.parse(data, 1);
});
