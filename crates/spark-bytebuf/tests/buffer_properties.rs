//! `buffer_properties` 集成测试：以影子模型验证 `ByteBuf` 的内容与容量性质。
//!
//! # 测试目标（Why）
//! - 任意写入序列之后，`as_bytes()` 必须等于各次写入的拼接；
//! - 穿插扩容、收缩、软重置、释放等操作时，重分配前写入的内容逐位保留；
//! - 任意可达状态下 `len <= capacity`。
//!
//! # 结构安排（How）
//! - `Op` 枚举描述一次缓冲操作，`Vec<u8>` 作为影子模型同步执行；
//! - 每一步之后比较缓冲内容与模型，并检查容量不变式。

use proptest::prelude::*;
use spark_bytebuf::{ByteBuf, ErrorKind};

#[derive(Clone, Debug)]
enum Op {
    Write(Vec<u8>),
    WriteByte(u8),
    ResetLen,
    Reset,
    Release,
    Grow(usize),
    GrowDelta(isize),
    GrowLen(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => prop::collection::vec(any::<u8>(), 0..1500).prop_map(Op::Write),
        2 => any::<u8>().prop_map(Op::WriteByte),
        1 => Just(Op::ResetLen),
        1 => Just(Op::Reset),
        1 => Just(Op::Release),
        1 => (0usize..4096).prop_map(Op::Grow),
        1 => (-256isize..256).prop_map(Op::GrowDelta),
        1 => (0usize..512).prop_map(Op::GrowLen),
    ]
}

fn apply(buf: &mut ByteBuf, model: &mut Vec<u8>, op: &Op) {
    match op {
        Op::Write(data) => {
            let n = buf.write(data).expect("写入不应失败");
            assert_eq!(n, data.len());
            model.extend_from_slice(data);
        }
        Op::WriteByte(byte) => {
            buf.write_byte(*byte).expect("单字节写入不应失败");
            model.push(*byte);
        }
        Op::ResetLen => {
            let capacity = buf.capacity();
            buf.reset_len();
            assert_eq!(buf.capacity(), capacity, "软重置保留容量");
            model.clear();
        }
        Op::Reset => {
            buf.reset();
            assert_eq!(buf.capacity(), 0);
            model.clear();
        }
        Op::Release => {
            buf.release();
            assert_eq!(buf.capacity(), 0);
            model.clear();
        }
        Op::Grow(capacity) => {
            buf.grow(*capacity).expect("扩容不应失败");
            assert!(buf.capacity() >= *capacity);
        }
        Op::GrowDelta(delta) => {
            let before = buf.capacity();
            let target = before as isize + delta;
            match buf.grow_delta(*delta) {
                Ok(()) => {
                    assert!(target >= 0);
                    if *delta < 0 {
                        model.truncate(target as usize);
                        assert_eq!(buf.capacity(), target as usize);
                    }
                }
                Err(err) => {
                    assert!(target < 0, "只有负目标容量才会失败");
                    assert_eq!(err.kind(), ErrorKind::NegativeCap);
                    assert_eq!(buf.capacity(), before, "失败时容量不变");
                }
            }
        }
        Op::GrowLen(n) => {
            buf.grow_len(*n).expect("认领区域不应失败");
            let kept = model.len().min(*n);
            assert_eq!(&buf.as_bytes()[..kept], &model[..kept], "认领前的内容保留");
            *model = buf.as_bytes().to_vec();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn sequential_writes_concatenate(chunks in prop::collection::vec(
        prop::collection::vec(any::<u8>(), 0..700), 0..24,
    )) {
        let mut buf = ByteBuf::new();
        let mut expected = Vec::new();
        for chunk in &chunks {
            buf.write(chunk).expect("写入不应失败");
            expected.extend_from_slice(chunk);
        }
        prop_assert_eq!(buf.as_bytes(), &expected[..]);
        prop_assert_eq!(buf.len(), expected.len());
    }

    #[test]
    fn content_survives_arbitrary_operation_sequences(ops in prop::collection::vec(op(), 1..40)) {
        let mut buf = ByteBuf::new();
        let mut model = Vec::new();
        for op in &ops {
            apply(&mut buf, &mut model, op);
            prop_assert!(buf.len() <= buf.capacity());
            prop_assert_eq!(buf.as_bytes(), &model[..]);
        }
    }

    #[test]
    fn soft_reset_then_write_yields_exactly_the_new_bytes(
        first in prop::collection::vec(any::<u8>(), 1..600),
        second in prop::collection::vec(any::<u8>(), 0..600),
    ) {
        let mut buf = ByteBuf::new();
        buf.write(&first).expect("首写");
        buf.reset_len();
        prop_assert!(buf.as_bytes().is_empty());
        buf.write(&second).expect("软重置后写入");
        prop_assert_eq!(buf.as_bytes(), &second[..]);
    }

    #[test]
    fn integers_render_like_display(value in any::<i64>(), unsigned in any::<u64>()) {
        let mut buf = ByteBuf::new();
        buf.write_int(value).expect("有符号整数");
        buf.write_byte(b'|').expect("分隔符");
        buf.write_uint(unsigned).expect("无符号整数");
        prop_assert_eq!(buf.to_str().expect("UTF-8"), format!("{value}|{unsigned}"));
    }

    #[test]
    fn floats_render_like_display(value in any::<f64>(), precision in 0usize..20) {
        let mut buf = ByteBuf::new();
        buf.write_float(value, None).expect("最短表示");
        buf.write_byte(b'|').expect("分隔符");
        buf.write_float(value, Some(precision)).expect("定点表示");
        prop_assert_eq!(
            buf.to_str().expect("UTF-8"),
            format!("{value}|{value:.precision$}")
        );
    }
}

#[test]
fn thousand_byte_write_then_reset_is_empty() {
    let mut buf = ByteBuf::new();
    buf.write(&[0xAB; 1000]).expect("写入 1000 字节");
    buf.reset();
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.capacity(), 0);
}

#[test]
fn empty_write_does_not_allocate() {
    let mut buf = ByteBuf::new();
    assert_eq!(buf.write(&[]).expect("空写入"), 0);
    assert_eq!(buf.capacity(), 0);
    assert!(buf.as_bytes().is_empty());
}
