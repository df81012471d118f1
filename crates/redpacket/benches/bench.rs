use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::future::join_all;
use rand::{SeedableRng, rngs::StdRng};
use redpacket::{PacketService, ServiceConfig, split::split_with};
use std::time::Instant;
use tokio::runtime::Builder;

// Shares per packet in the claim benchmarks.
const SHARES: usize = 1024;

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");

    for share_count in [3, 100, 10_000] {
        group.throughput(Throughput::Elements(share_count as u64));
        group.bench_function(format!("shares/{share_count}"), |b| {
            let mut rng = StdRng::seed_from_u64(0);
            b.iter(|| black_box(split_with(&mut rng, 1_000_000, share_count)));
        });
    }

    group.finish();
}

fn bench_claims(c: &mut Criterion) {
    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    let mut group = c.benchmark_group("claim");
    group.throughput(Throughput::Elements(SHARES as u64));

    for num_shards in [1, 16] {
        let service = rt.block_on(async {
            PacketService::new(ServiceConfig {
                num_shards,
                ..ServiceConfig::default()
            })
            .expect("valid config")
        });

        // Claims are spread over one packet per shard so that the shard count
        // is what varies between runs.
        group.bench_function(format!("shards/{num_shards}"), |b| {
            b.to_async(&rt).iter_custom(|iters| {
                let service = service.clone();
                async move {
                    let start = Instant::now();
                    for _ in 0..iters {
                        let ids: Vec<_> = (0..num_shards)
                            .map(|_| {
                                service
                                    .create_packet(1, (SHARES * 100) as u64, SHARES / num_shards)
                                    .expect("valid packet")
                                    .id
                            })
                            .collect();
                        let claims = ids.iter().flat_map(|&id| {
                            let service = service.clone();
                            (0..SHARES / num_shards).map(move |claimant| {
                                let service = service.clone();
                                tokio::spawn(async move {
                                    service.claim_packet(id, claimant as u64 + 1).await
                                })
                            })
                        });
                        black_box(join_all(claims).await);
                    }
                    start.elapsed()
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_split, bench_claims);
criterion_main!(benches);
