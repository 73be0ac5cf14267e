use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::io;
use std::time::Duration;
use stock_cache::{Content, DecodeError, MemorySource, Resource, ResourceCache};

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn path(n: u64) -> String {
    format!("textures/t{:016x}.tex", n)
}

#[derive(Default)]
struct Blob(Vec<u8>);

impl Resource for Blob {
    const KIND: &'static str = "blob";
    fn description(&self) -> String {
        format!("{} bytes", self.0.len())
    }
    fn clear(&mut self) {
        self.0.clear();
    }
    fn read(&mut self, content: &Content<'_>) -> Result<(), DecodeError> {
        self.0 = content.bytes().to_vec();
        Ok(())
    }
    fn write(&self, out: &mut dyn io::Write) -> io::Result<()> {
        out.write_all(&self.0)
    }
    fn used_memory(&self) -> usize {
        self.0.len()
    }
}

fn files(paths: &[String]) -> MemorySource {
    let mut src = MemorySource::new();
    for p in paths {
        src.insert(p.clone(), vec![0u8; 64]);
    }
    src
}

fn bench_obtain_miss(c: &mut Criterion) {
    let paths: Vec<_> = lcg(1).take(10_000).map(path).collect();
    let src = files(&paths);
    c.bench_function("cache_obtain_miss_10k", |b| {
        b.iter_batched(
            ResourceCache::<Blob>::new,
            |mut cache| {
                for p in &paths {
                    cache.obtain(p, &src).unwrap();
                }
                black_box(cache)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_obtain_hit(c: &mut Criterion) {
    let paths: Vec<_> = lcg(7).take(20_000).map(path).collect();
    let src = files(&paths);
    let mut cache = ResourceCache::<Blob>::new();
    for p in &paths {
        cache.obtain(p, &src).unwrap();
    }
    let mut it = paths.iter().cycle();
    c.bench_function("cache_obtain_hit_release", |b| {
        b.iter(|| {
            let h = cache.obtain(it.next().unwrap(), &src).unwrap();
            cache.release(black_box(h));
        })
    });
}

fn bench_free_unused(c: &mut Criterion) {
    let paths: Vec<_> = lcg(11).take(10_000).map(path).collect();
    let src = files(&paths);
    c.bench_function("cache_free_unused_half_10k", |b| {
        b.iter_batched(
            || {
                let mut cache = ResourceCache::<Blob>::new();
                for (i, p) in paths.iter().enumerate() {
                    let h = cache.obtain(p, &src).unwrap();
                    if i % 2 == 0 {
                        cache.release(h);
                    }
                }
                cache
            },
            |mut cache| {
                black_box(cache.free_unused());
                cache
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_obtain_miss, bench_obtain_hit, bench_free_unused
}
criterion_main!(benches);
