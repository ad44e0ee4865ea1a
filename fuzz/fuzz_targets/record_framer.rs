#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use logtide_receiver::RecordFramer;
use logtide_receiver::parser::LOG4J_END_MARKER;

#[derive(Debug, Arbitrary)]
struct Input {
    tagged: bool,
    data: Vec<u8>,
    /// 청크 경계 (data 길이로 나눈 나머지를 사용)
    splits: Vec<u16>,
}

fn framer(tagged: bool) -> RecordFramer {
    if tagged {
        RecordFramer::tag_delimited(LOG4J_END_MARKER)
    } else {
        RecordFramer::line_delimited()
    }
}

fuzz_target!(|input: Input| {
    let mut whole = framer(input.tagged);
    let mut expected = whole.push(&input.data);
    expected.extend(whole.finish());

    let mut cuts: Vec<usize> = input
        .splits
        .iter()
        .map(|&s| usize::from(s) % (input.data.len() + 1))
        .collect();
    cuts.sort_unstable();

    // 청크를 어떻게 나누어도 같은 레코드가 나와야 한다
    let mut chunked = framer(input.tagged);
    let mut actual = Vec::new();
    let mut start = 0;
    for cut in cuts {
        actual.extend(chunked.push(&input.data[start..cut]));
        start = cut;
    }
    actual.extend(chunked.push(&input.data[start..]));
    actual.extend(chunked.finish());

    assert_eq!(expected, actual);
    assert_eq!(chunked.pending_len(), 0);
});
