use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parsec_storage::crypto::{digest_hex, SymKey};

/// AES-256-GCM block encrypt/decrypt throughput across the chunk sizes
/// `build_file_blocks` actually produces (spec.md §6 "Chunk size" = 4096,
/// plus a couple of neighboring sizes to see the curve).
fn bench_sym_encrypt_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("sym_crypto");
    let key = SymKey::generate();

    for &size in &[64usize, 4096, 65536] {
        let cleartext = vec![0xABu8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", size), &cleartext, |b, data| {
            b.iter(|| key.encrypt(black_box(data)).unwrap());
        });

        let ciphertext = key.encrypt(&cleartext).unwrap();
        group.bench_with_input(BenchmarkId::new("decrypt", size), &ciphertext, |b, data| {
            b.iter(|| key.decrypt(black_box(data)).unwrap());
        });
    }

    group.finish();
}

/// SHA-256 digest throughput for `BlockMeta::digest` computation.
fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");

    for &size in &[64usize, 4096, 65536] {
        let data = vec![0xCDu8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("sha256_hex", size), &data, |b, data| {
            b.iter(|| digest_hex(black_box(data)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sym_encrypt_decrypt, bench_digest);
criterion_main!(benches);
