//! 레코드 프레이머 벤치마크
//!
//! 같은 입력을 큰 조각 한 번과 작은 조각 여러 번으로 나눠 넣었을 때의 처리량을 비교합니다.
//! 작은 조각 경로는 미완성 데이터 재검색 비용을 드러냅니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logtide_receiver::RecordFramer;
use logtide_receiver::parser::LOG4J_END_MARKER;

const RECORDS: usize = 1000;

fn log4j_stream() -> Vec<u8> {
    (0..RECORDS)
        .map(|i| {
            format!(
                "<log4j:event logger=\"App\" timestamp=\"{i}\" level=\"INFO\" thread=\"1\">\r\n  <log4j:message>record {i}</log4j:message>\r\n</log4j:event>\r\n"
            )
        })
        .collect::<String>()
        .into_bytes()
}

fn line_stream() -> Vec<u8> {
    (0..RECORDS)
        .map(|i| format!("<14>1 2024-01-15T12:00:00Z host app - - - record {i}\n"))
        .collect::<String>()
        .into_bytes()
}

fn frame_in_chunks(mut framer: RecordFramer, data: &[u8], chunk: usize) -> usize {
    data.chunks(chunk)
        .map(|piece| framer.push(black_box(piece)).len())
        .sum()
}

fn bench_tag_delimited(c: &mut Criterion) {
    let data = log4j_stream();
    let mut group = c.benchmark_group("framer_tag_delimited");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [16usize, 512, data.len()] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let framed =
                    frame_in_chunks(RecordFramer::tag_delimited(LOG4J_END_MARKER), &data, chunk);
                assert_eq!(framed, RECORDS);
            })
        });
    }
    group.finish();
}

fn bench_line_delimited(c: &mut Criterion) {
    let data = line_stream();
    let mut group = c.benchmark_group("framer_line_delimited");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [16usize, 512, data.len()] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let framed = frame_in_chunks(RecordFramer::line_delimited(), &data, chunk);
                assert_eq!(framed, RECORDS);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tag_delimited, bench_line_delimited);
criterion_main!(benches);
