//! Benchmarks for format recognition and source scanning.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rguid::{Guid, parse, scan_bytes, to_definition, to_hex_text, to_struct_text};

/// Synthetic header with `count` declarations in rotating styles.
fn make_header(count: usize) -> Vec<u8> {
    let mut out = String::with_capacity(count * 160);
    out.push_str("#pragma once\n// generated\n\n");
    for i in 0..count {
        let guid = Guid::from_fields(
            i as u32,
            0x1A3A,
            0x11D0,
            [0x89, 0xB3, 0x00, 0xA0, 0xC9, 0x0A, 0x90, 0xAC],
        );
        let name = format!("IID_Bench{i}");
        match i % 4 {
            0 => out.push_str(&to_definition(&guid, Some(&name))),
            1 => out.push_str(&to_struct_text(&guid, Some(&name))),
            2 => {
                out.push_str("/* ");
                out.push_str(&guid.to_string());
                out.push_str(" */");
            }
            _ => out.push_str(&format!("DEFINE_OLEGUID({name}, 0x{i:08X}, 0, 0);")),
        }
        out.push('\n');
        out.push_str("typedef struct tagFiller { int a; } Filler;\n");
    }
    out.into_bytes()
}

fn bench_parse(c: &mut Criterion) {
    let guid = Guid::from_fields(0x000214F9, 0, 0, rguid::OLE_GUID_TAIL);
    let inputs = [
        ("guid_text", guid.to_string()),
        ("definition", to_definition(&guid, Some("IID_IShellLinkW"))),
        ("struct", to_struct_text(&guid, None)),
        ("hex", to_hex_text(&guid)),
        ("identifier", "IID_IShellLinkW".to_string()),
    ];

    let mut group = c.benchmark_group("parse");
    for (label, text) in &inputs {
        group.bench_with_input(BenchmarkId::from_parameter(label), text, |b, text| {
            b.iter(|| parse(black_box(text)))
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_bytes");
    for count in [16usize, 256, 2048] {
        let header = make_header(count);
        group.throughput(Throughput::Bytes(header.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &header, |b, header| {
            b.iter(|| scan_bytes(black_box(header)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_scan);
criterion_main!(benches);
