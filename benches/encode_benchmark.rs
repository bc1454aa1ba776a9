// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sinkhole_parser::{DnsAnswer, DnsRequest};

use pprof::criterion::{Output, PProfProfiler};

const BLOCKED: &[u8; 33] = include_bytes!("../assets/blocked_request.bin");

pub fn encode_answer(c: &mut Criterion) {
    let answer = DnsAnswer::from(DnsRequest::try_from(&BLOCKED[..]).unwrap());
    let answer = &answer;
    c.bench_function("encode_answer", |b| {
        b.iter(|| Vec::<u8>::try_from(black_box(answer)).unwrap())
    });
}

pub fn decode_and_encode(c: &mut Criterion) {
    c.bench_function("decode_and_encode", |b| {
        b.iter(|| {
            let request = DnsRequest::try_from(black_box(&BLOCKED[..])).unwrap();
            Vec::<u8>::try_from(&DnsAnswer::from(request)).unwrap()
        })
    });
}

criterion_group!(
    name = encode;
    config = Criterion::default()
            .with_profiler(
                PProfProfiler::new(100, Output::Flamegraph(None))
            );
    targets = encode_answer, decode_and_encode
);
criterion_main!(encode);
