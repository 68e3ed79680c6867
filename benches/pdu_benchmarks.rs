// ABOUTME: Benchmark suite for the SMS PDU decoder and the serial line buffer
// ABOUTME: Measures hex decoding, septet unpacking, full PDU walks and line splitting

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sms_router::connection::LineBuffer;
use sms_router::pdu::{decode_septets, decode_ucs2, hex_decode, parse_pdu_at};
use std::time::Duration;

const HELLO_PDU: &str = "0791947101670000040C91947110325476000021503090510380\
                         05E8329BFD06";

/// GSM 7-bit PDU carrying a full 160 character message of repeated "hello "
fn long_gsm_pdu() -> String {
    let septets: Vec<u8> = "hello ".bytes().cycle().take(160).collect();
    let mut packed = vec![0u8; 140];
    for (i, &s) in septets.iter().enumerate() {
        let bit = i * 7;
        let (byte, shift) = (bit / 8, bit % 8);
        packed[byte] |= s << shift;
        if shift > 1 {
            packed[byte + 1] |= s >> (8 - shift);
        }
    }
    let user_data: String = packed.iter().map(|b| format!("{b:02X}")).collect();
    format!("00040C91947110325476000021503090510380A0{user_data}")
}

/// UCS-2 PDU carrying 70 characters of Cyrillic text
fn long_ucs2_pdu() -> String {
    let user_data: String = "привет "
        .encode_utf16()
        .cycle()
        .take(70)
        .map(|u| format!("{u:04X}"))
        .collect();
    format!("00040C91947110325476000821503090510380{:02X}{user_data}", 140)
}

fn bench_hex(c: &mut Criterion) {
    let mut group = c.benchmark_group("hex_decode");
    group.measurement_time(Duration::from_secs(5));

    for pdu in [HELLO_PDU.to_string(), long_gsm_pdu()] {
        group.bench_with_input(BenchmarkId::from_parameter(pdu.len()), &pdu, |b, pdu| {
            b.iter(|| hex_decode(black_box(pdu)))
        });
    }

    group.finish();
}

fn bench_alphabets(c: &mut Criterion) {
    let mut group = c.benchmark_group("alphabets");
    group.measurement_time(Duration::from_secs(5));

    let packed = hex_decode(&long_gsm_pdu()).unwrap_or_default();
    let user_data = packed[packed.len() - 140..].to_vec();
    group.bench_function("septets_160", |b| {
        b.iter(|| decode_septets(black_box(&user_data), 160, 0))
    });

    let ucs2 = hex_decode(&long_ucs2_pdu()).unwrap_or_default();
    let user_data = ucs2[ucs2.len() - 140..].to_vec();
    group.bench_function("ucs2_70", |b| b.iter(|| decode_ucs2(black_box(&user_data))));

    group.finish();
}

fn bench_parse_pdu(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_pdu");
    group.measurement_time(Duration::from_secs(10));

    let long_gsm = long_gsm_pdu();
    let long_ucs2 = long_ucs2_pdu();

    group.bench_function("gsm_short", |b| b.iter(|| parse_pdu_at(black_box(HELLO_PDU), 2026)));
    group.bench_function("gsm_160", |b| b.iter(|| parse_pdu_at(black_box(&long_gsm), 2026)));
    group.bench_function("ucs2_70", |b| b.iter(|| parse_pdu_at(black_box(&long_ucs2), 2026)));
    group.bench_function("truncated", |b| {
        let truncated = &HELLO_PDU[..HELLO_PDU.len() - 2];
        b.iter(|| parse_pdu_at(black_box(truncated), 2026))
    });

    group.finish();
}

fn bench_line_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_buffer");

    let listing = format!("\r\n+CMGL: 1,0,,24\r\n{HELLO_PDU}\r\n\r\nOK\r\n");
    for chunk in [1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::new("listing", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut buffer = LineBuffer::new();
                let mut lines = 0;
                for piece in listing.as_bytes().chunks(chunk) {
                    buffer.extend(piece);
                    while buffer.next_line().is_some() {
                        lines += 1;
                    }
                }
                black_box(lines)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hex, bench_alphabets, bench_parse_pdu, bench_line_buffer);
criterion_main!(benches);
