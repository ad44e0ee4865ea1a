#![no_main]

use libfuzzer_sys::fuzz_target;
use logtide_core::receiver::MessageParser;
use logtide_receiver::Log4jXmlParser;

fuzz_target!(|data: &str| {
    let parser = Log4jXmlParser::new();

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    if let Ok(record) = parser.parse(data, 1) {
        assert_eq!(record.sequence, 1);
    }
});
