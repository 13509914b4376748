//! 写入路径的尺寸自适应拷贝。
//!
//! 长输入按 8/4/2/1 字节步长做展开拷贝，以字为单位减少逐字节开销；
//! 短输入直接逐字节写入，避免展开逻辑的固定成本反过来主导短写。

use core::ptr;

/// 超过该长度的输入走展开拷贝。
pub(crate) const SHORT_INPUT_THRESHOLD: usize = 256;

/// 将 `src` 拷贝到 `dst` 起始的区域。
///
/// # Safety
/// - `dst` 必须指向至少 `src.len()` 字节的可写内存；
/// - 目标区域不得与 `src` 重叠。
#[inline]
pub(crate) unsafe fn copy_adaptive(src: &[u8], dst: *mut u8) {
    if src.len() > SHORT_INPUT_THRESHOLD {
        unsafe { copy_unrolled(src, dst) }
    } else {
        unsafe { copy_bytewise(src, dst) }
    }
}

#[inline]
unsafe fn copy_bytewise(src: &[u8], dst: *mut u8) {
    for (offset, byte) in src.iter().enumerate() {
        unsafe { dst.add(offset).write(*byte) };
    }
}

unsafe fn copy_unrolled(src: &[u8], dst: *mut u8) {
    let len = src.len();
    let from = src.as_ptr();
    let mut offset = 0;

    while len - offset >= 8 {
        unsafe {
            let word = ptr::read_unaligned(from.add(offset).cast::<u64>());
            ptr::write_unaligned(dst.add(offset).cast::<u64>(), word);
        }
        offset += 8;
    }
    // 8 字节步长之后最多剩 7 字节，4/2/1 各至多执行一次。
    if len - offset >= 4 {
        unsafe {
            let word = ptr::read_unaligned(from.add(offset).cast::<u32>());
            ptr::write_unaligned(dst.add(offset).cast::<u32>(), word);
        }
        offset += 4;
    }
    if len - offset >= 2 {
        unsafe {
            let word = ptr::read_unaligned(from.add(offset).cast::<u16>());
            ptr::write_unaligned(dst.add(offset).cast::<u16>(), word);
        }
        offset += 2;
    }
    if len - offset == 1 {
        unsafe { dst.add(offset).write(*from.add(offset)) };
    }
}
