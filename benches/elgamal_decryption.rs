use confidential_balances::{
    decryptor::{silent, StopSignal, TableBuilder},
    testing, Balance,
};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use rand::{rngs::StdRng, SeedableRng};

const TABLE_SIZE: usize = 1 << 16;

fn bench_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_build");
    group.sample_size(10);

    for shard_count in [1usize, 4] {
        let builder = TableBuilder::new(shard_count, TABLE_SIZE).unwrap();
        group.bench_with_input(
            BenchmarkId::new("shards", shard_count),
            &builder,
            |b, builder| {
                b.iter(|| builder.build(&StopSignal::new(), &|_: &str| {}).unwrap());
            },
        );
    }
    group.finish();
}

fn bench_decryption(c: &mut Criterion) {
    let mut rng = StdRng::from_seed([42u8; 32]);
    let decryptor = testing::small_decryptor(TABLE_SIZE).unwrap();
    let stop = StopSignal::new();
    let status = silent();
    // Warm the table outside of the measurements.
    decryptor.set_table_size(TABLE_SIZE, &stop, &status).unwrap();

    let mut group = c.benchmark_group("decrypt_balance");
    let balances: Vec<Balance> = (10..=24).step_by(7).map(|order| (1 << order) - 1).collect();
    for balance in balances {
        let (account, cipher) = testing::create_account_with_amount(&mut rng, balance);
        group.bench_with_input(BenchmarkId::new("balance", balance), &cipher, |b, cipher| {
            b.iter(|| {
                account
                    .secret
                    .decrypt(&decryptor, cipher, 0, &stop, &status)
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = elgamal_decryption;
    config = Criterion::default();
    targets = bench_table_build, bench_decryption,
}

criterion_main!(elgamal_decryption);
