// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sinkhole_parser::DnsRequest;

use pprof::criterion::{Output, PProfProfiler};

const BLOCKED: &[u8; 33] = include_bytes!("../assets/blocked_request.bin");
const ALLOWED: &[u8; 32] = include_bytes!("../assets/allowed_request.bin");

pub fn decode_blocked(c: &mut Criterion) {
    c.bench_function("decode_blocked", |b| {
        b.iter(|| DnsRequest::try_from(black_box(&BLOCKED[..])).unwrap())
    });
}

pub fn decode_allowed(c: &mut Criterion) {
    c.bench_function("decode_allowed", |b| {
        b.iter(|| DnsRequest::try_from(black_box(&ALLOWED[..])).unwrap())
    });
}

criterion_group!(
    name = decode;
    config = Criterion::default()
            .with_profiler(
                PProfProfiler::new(100, Output::Flamegraph(None))
            );
    targets = decode_blocked, decode_allowed
);
criterion_main!(decode);
