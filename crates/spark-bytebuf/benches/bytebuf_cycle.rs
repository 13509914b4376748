use criterion::{BenchmarkId, Criterion, black_box};
use spark_bytebuf::{ByteBuf, LbPool, LbPoolConfig, MultiPool, Pool};
use std::{env, time::Duration};

/// 写入路径基准：对比短输入逐字节拷贝与长输入展开拷贝的成本。
///
/// # 设计背景（Why）
/// - 拷贝策略以 256 字节为界切换，基准覆盖阈值两侧，便于发现阈值设置的回归；
/// - 每轮从空缓冲开始，扩容成本计入其中，反映“写满即交付”的真实负载。
fn bench_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("bytebuf_write");
    for size in [16usize, 255, 257, 4096] {
        let payload = vec![0xA5u8; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                let mut buf = ByteBuf::new();
                for _ in 0..8 {
                    buf.write(black_box(payload)).unwrap();
                }
                black_box(buf.len())
            });
        });
    }
    group.finish();

    c.bench_function("bytebuf_write_scalars", |b| {
        b.iter(|| {
            let mut buf = ByteBuf::new();
            buf.write_string(black_box("latency=")).unwrap();
            buf.write_int(black_box(-1_234_567)).unwrap();
            buf.write_byte(b' ').unwrap();
            buf.write_float(black_box(3.25), Some(3)).unwrap();
            buf.write_bool(black_box(true)).unwrap();
            black_box(buf.len())
        });
    });
}

/// 复用池基准：单线程 `get → write → put` 循环。
///
/// # 逻辑解析（How）
/// - 简单池与多池在归还时释放内存，每轮都会重新分配；
/// - 有界池保留内存块，稳定后每轮只剩写入本身的成本。
fn bench_pool_cycles(c: &mut Criterion) {
    let payload = [0x5Au8; 512];

    let simple = Pool::new();
    c.bench_function("pool_cycle", |b| {
        b.iter(|| {
            let mut buf = simple.get();
            buf.write(black_box(&payload)).unwrap();
            simple.put(buf);
        });
    });

    let bounded = LbPool::new(LbPoolConfig::new(64, 0.1)).unwrap();
    c.bench_function("lb_pool_cycle", |b| {
        b.iter(|| {
            let mut buf = bounded.get();
            buf.write(black_box(&payload)).unwrap();
            black_box(bounded.put(buf))
        });
    });

    let sharded = MultiPool::new(16);
    c.bench_function("multi_pool_cycle", |b| {
        b.iter(|| {
            let mut buf = sharded.get();
            buf.write(black_box(&payload)).unwrap();
            sharded.put(buf);
        });
    });
}

fn main() {
    let mut quick_mode = false;
    for arg in env::args().skip(1) {
        if arg == "--quick" {
            quick_mode = true;
        }
    }

    let mut criterion = Criterion::default();
    if quick_mode {
        criterion = criterion
            .sample_size(10)
            .warm_up_time(Duration::from_millis(100))
            .measurement_time(Duration::from_millis(250));
    }

    bench_writes(&mut criterion);
    bench_pool_cycles(&mut criterion);
    criterion.final_summary();
}
