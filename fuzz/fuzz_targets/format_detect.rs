#![no_main]

use libfuzzer_sys::fuzz_target;
use logtide_receiver::detect_format;
use logtide_receiver::parser::matching_formats;

fuzz_target!(|data: &str| {
    let matches = matching_formats(data);
    assert_eq!(detect_format(data), matches.first().copied());
});
