use std::{
    alloc::{self, Layout},
    fmt,
    io::{self, Read, Write as _},
    ptr::{self, NonNull},
    slice,
    str::{self, Utf8Error},
};

use bytes::{BufMut, buf::UninitSlice};

use crate::{
    copy::copy_adaptive,
    error::{ByteBufError, Result},
    marshal::MarshalTo,
};

/// 有效区超过该长度时扩容改走 `realloc`，否则走“新分配 + 拷贝 + 释放”。
const MALLOC_GROW_THRESHOLD: usize = 1024;
/// `read_from` 首次分配的最小容量。
const READ_MIN_CAPACITY: usize = 64;
/// `BufMut::chunk_mut` 在无剩余空间时的最小扩容基数。
const CHUNK_MIN_CAPACITY: usize = 64;
/// 64 位整数十进制文本的最坏长度（含符号）向上取整。
const INT_SCRATCH: usize = 32;
/// `f64` 十进制文本（不含额外精度位）的最坏长度。
///
/// 最短往返表示下最小次正规数展开为 `0.` 加 323 个零再加 17 位有效数字，
/// 定点精度表示下整数部分最多 309 位，二者都落在该上限之内。
const FLOAT_SCRATCH: usize = 352;
/// 格式化精度参数的上限，超过时 `core::fmt` 会 panic。
const MAX_FLOAT_PRECISION: usize = u16::MAX as usize;
/// `"false"` 的长度。
const BOOL_SCRATCH: usize = 5;

/// `ByteBuf` 是一块显式分配、显式释放的可增长字节缓冲。
///
/// # 设计动机（Why）
/// - 序列化、协议编码等热路径需要反复“写满 → 交付 → 复用”同一块内存，
///   由缓冲自身掌控 `alloc`/`realloc`/`dealloc`，可以精确控制扩容策略与释放时机；
/// - 与复用池配合时，池只需转移所有权即可跳过分配器往返。
///
/// # 结构设计（How）
/// - `ptr`/`cap`：独占的内存块及其大小，满足 `ptr.is_none() ⇔ cap == 0`；
/// - `len`：有效字节数，恒有 `len <= init <= cap`；
/// - `init`：已初始化水位线。`[0, init)` 内的字节一定被写过（数据或零），
///   只有在需要把尾部区域作为 `&mut [u8]` 交给外部时才补零到目标位置；
/// - `hint`：[`ByteBuf::reset`] 记住的上一次容量，下一次首写直接按它分配。
///
/// # 契约说明（What）
/// - 单个实例不支持两个所有者并发修改；所有权通过池的 `put`/`get` 显式转移；
/// - 所有失败路径都保持 `len <= cap`，分配失败时 `len`/`cap` 与内容保持调用前的状态；
/// - `Drop` 总会释放持有的内存块。
pub struct ByteBuf {
    ptr: Option<NonNull<u8>>,
    len: usize,
    cap: usize,
    init: usize,
    hint: usize,
}

// `ByteBuf` 像 `Vec<u8>` 一样独占其内存块，`&self` 方法只读取不可变视图。
unsafe impl Send for ByteBuf {}
unsafe impl Sync for ByteBuf {}

impl ByteBuf {
    /// 创建未分配内存的空缓冲。
    pub const fn new() -> Self {
        Self {
            ptr: None,
            len: 0,
            cap: 0,
            init: 0,
            hint: 0,
        }
    }

    /// 创建并预分配恰好 `capacity` 字节的缓冲。
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buf = Self::new();
        buf.grow(capacity)?;
        Ok(buf)
    }

    /// 有效字节数。
    pub fn len(&self) -> usize {
        self.len
    }

    /// 当前已分配的字节数。
    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 将 `data` 追加到有效区末尾，返回接受的字节数。
    ///
    /// # 实现策略
    /// 1. 尚未分配时按 `hint`（若有）或 `2 × data.len()` 首次分配；
    /// 2. 剩余空间不足时调用 `grow((len + data.len()) × 2)`，按新需求而非当前容量翻倍，
    ///    避免大量小写入触发反复重分配；
    /// 3. 拷贝按输入长度在展开拷贝与逐字节拷贝之间切换。
    ///
    /// # 错误
    /// - 分配或重分配失败时返回 [`ByteBufError::BadAlloc`]，此时不写入任何字节。
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let n = data.len();
        if n == 0 {
            return Ok(0);
        }
        self.reserve_tail(n)?;
        // SAFETY: `reserve_tail` 保证 `[len, len + n)` 落在已分配区域内，且 `data` 是外部切片，不与之重叠。
        unsafe { copy_adaptive(data, self.base().add(self.len)) };
        self.set_len_written(self.len + n);
        Ok(n)
    }

    /// 写入单个字节。
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte]).map(drop)
    }

    /// 写入字符串的字节表示，不做中间拷贝。
    pub fn write_string(&mut self, text: &str) -> Result<usize> {
        self.write(text.as_bytes())
    }

    /// 写入有符号整数的十进制文本。
    ///
    /// 文本先由 `itoa` 生成在栈上，再拷入预留区，多出的一次拷贝至多 20 字节。
    pub fn write_int(&mut self, value: i64) -> Result<usize> {
        let mut digits = itoa::Buffer::new();
        let text = digits.format(value).as_bytes();
        self.write_scratch(INT_SCRATCH, |dst| copy_prefix(dst, text))
    }

    /// 写入无符号整数的十进制文本，拷贝路径同 [`ByteBuf::write_int`]。
    pub fn write_uint(&mut self, value: u64) -> Result<usize> {
        let mut digits = itoa::Buffer::new();
        let text = digits.format(value).as_bytes();
        self.write_scratch(INT_SCRATCH, |dst| copy_prefix(dst, text))
    }

    /// 写入浮点数的十进制文本。
    ///
    /// - `precision = None`：最短且可往返的表示；
    /// - `precision = Some(p)`：定点表示，保留 `p` 位小数。
    ///
    /// 预留区大小为最坏长度加上 `p`，格式化直接落在预留区内。
    ///
    /// # 错误
    /// - `p` 超过 `u16::MAX` 时返回 [`ByteBufError::BadAlloc`]，缓冲保持不变；
    /// - 预留区分配失败时同样返回 [`ByteBufError::BadAlloc`]。
    pub fn write_float(&mut self, value: f64, precision: Option<usize>) -> Result<usize> {
        let extra = precision.unwrap_or(0);
        let worst_case = FLOAT_SCRATCH
            .checked_add(extra)
            .ok_or(ByteBufError::BadAlloc {
                requested: usize::MAX,
            })?;
        if extra > MAX_FLOAT_PRECISION {
            return Err(ByteBufError::BadAlloc {
                requested: worst_case,
            });
        }
        self.write_scratch(worst_case, |dst| {
            let mut cursor = io::Cursor::new(dst);
            let outcome = match precision {
                Some(p) => write!(cursor, "{value:.p$}"),
                None => write!(cursor, "{value}"),
            };
            outcome.ok()?;
            usize::try_from(cursor.position()).ok()
        })
    }

    /// 写入 `true` 或 `false`。
    pub fn write_bool(&mut self, value: bool) -> Result<usize> {
        let text: &[u8] = if value { b"true" } else { b"false" };
        self.write_scratch(BOOL_SCRATCH, |dst| copy_prefix(dst, text))
    }

    /// 让 `marshaler` 直接序列化进缓冲内存。
    ///
    /// # 契约说明（What）
    /// - 先扩容到恰好 `size()` 字节，再把 `len` 设为 `size()`，
    ///   随后 `marshal_to` 收到的目标区域从偏移 0 开始、长度恰好为 `size()`；
    ///   原有内容会被覆盖；
    /// - `marshaler` 缺失时返回 [`ByteBufError::NilMarshaler`]，不发生任何分配；
    /// - 返回值是 `marshal_to` 报告的写入字节数。
    pub fn write_marshaler_to<M>(&mut self, marshaler: Option<&M>) -> Result<usize>
    where
        M: MarshalTo + ?Sized,
    {
        let marshaler = marshaler.ok_or(ByteBufError::NilMarshaler)?;
        let size = marshaler.size();
        self.grow(size)?;
        self.ensure_init(size);
        self.len = size;
        marshaler
            .marshal_to(self.as_bytes_mut())
            .map_err(ByteBufError::Marshal)
    }

    /// 从 `reader` 持续读取直到流结束，返回本次读入的字节数。
    ///
    /// # 实现策略
    /// - 未分配时先分配 64 字节，此后每当写满就按当前容量翻倍；
    /// - 每轮把 `[len, cap)` 作为目标区交给 `reader`，读到 0 字节视为流结束（不是错误）；
    /// - `Interrupted` 自动重试，与标准库 `read_to_end` 保持一致。
    ///
    /// # 错误
    /// - 数据源报告的字节数超过目标区长度时返回 [`ByteBufError::InvalidRead`]；
    /// - 其它读取错误包装为 [`ByteBufError::Io`]；
    /// - 出错前已经读入的字节保留在缓冲中，可通过 [`ByteBuf::len`] 观察。
    pub fn read_from<R>(&mut self, reader: &mut R) -> Result<u64>
    where
        R: Read + ?Sized,
    {
        if self.cap == 0 {
            self.grow(READ_MIN_CAPACITY)?;
        }
        let mut total: u64 = 0;
        loop {
            if self.len == self.cap {
                self.grow(self.cap.saturating_mul(2))?;
            }
            let available = self.cap - self.len;
            let spare = self.initialized_range(self.len, self.cap);
            match reader.read(spare) {
                Ok(0) => return Ok(total),
                Ok(reported) if reported > available => {
                    return Err(ByteBufError::InvalidRead {
                        reported,
                        available,
                    });
                }
                Ok(read) => {
                    self.len += read;
                    total += read as u64;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(ByteBufError::Io(err)),
            }
        }
    }

    /// 将有效区完整写入 `writer`，返回写出的字节数。
    pub fn write_to<W>(&self, writer: &mut W) -> Result<u64>
    where
        W: io::Write + ?Sized,
    {
        writer.write_all(self.as_bytes())?;
        Ok(self.len as u64)
    }

    /// 确保容量不小于 `capacity`。
    ///
    /// # 契约说明（What）
    /// - 当前容量已满足时不做任何事；
    /// - 否则把内存块调整为恰好 `capacity` 字节，`[0, len)` 的内容逐位保留；
    /// - 分配失败返回 [`ByteBufError::BadAlloc`]，缓冲保持调用前的状态。
    ///
    /// 负容量在 `usize` 下无法表达，带符号的调整请使用 [`ByteBuf::grow_delta`]。
    pub fn grow(&mut self, capacity: usize) -> Result<()> {
        if self.cap >= capacity {
            return Ok(());
        }
        if self.ptr.is_some() {
            self.reallocate(capacity)
        } else {
            self.allocate(capacity)
        }
    }

    /// 按 `capacity + delta` 调整容量。
    ///
    /// - `delta >= 0`：等价于 [`ByteBuf::grow`]；
    /// - `delta < 0`：收缩内存块，`len` 截断为 `min(len, 新容量)`，收缩到 0 时释放内存；
    /// - 目标容量为负时返回 [`ByteBufError::NegativeCap`]，缓冲保持不变。
    pub fn grow_delta(&mut self, delta: isize) -> Result<()> {
        // 已分配的容量受 `Layout` 约束，必然不超过 `isize::MAX`。
        let current = isize::try_from(self.cap).map_err(|_| ByteBufError::BadAlloc {
            requested: self.cap,
        })?;
        let target = current
            .checked_add(delta)
            .ok_or(ByteBufError::BadAlloc {
                requested: usize::MAX,
            })?;
        let capacity =
            usize::try_from(target).map_err(|_| ByteBufError::NegativeCap { requested: target })?;
        if delta >= 0 {
            self.grow(capacity)
        } else {
            self.shrink_to(capacity)
        }
    }

    /// 必要时扩容，然后直接把 `len` 设为 `n`，供调用方认领一段区域直接写入。
    ///
    /// 新认领的区域若从未被写过则为零值，否则保留上一轮的旧内容。
    pub fn grow_len(&mut self, n: usize) -> Result<()> {
        self.grow(n)?;
        self.ensure_init(n);
        self.len = n;
        Ok(())
    }

    /// 有效区的零拷贝字节视图。
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `[0, len)` 已初始化且位于独占的内存块内；未分配时 `len == 0`，悬垂指针配零长度是合法的。
        unsafe { slice::from_raw_parts(self.base(), self.len) }
    }

    /// 有效区的可变视图。
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: 同 `as_bytes`，且 `&mut self` 保证独占。
        unsafe { slice::from_raw_parts_mut(self.base(), self.len) }
    }

    /// 有效区的零拷贝文本视图，内容不是合法 UTF-8 时返回错误。
    pub fn to_str(&self) -> core::result::Result<&str, Utf8Error> {
        str::from_utf8(self.as_bytes())
    }

    /// 把有效区复制到 `dst` 并返回它。
    ///
    /// 注意：`dst` 会先被截断到长度 0，语义是“覆盖”而不是追加，
    /// 方法名沿用既有调用方依赖的叫法。
    pub fn append_bytes(&self, mut dst: Vec<u8>) -> Vec<u8> {
        dst.clear();
        dst.extend_from_slice(self.as_bytes());
        dst
    }

    /// 文本版本的 [`ByteBuf::append_bytes`]，同样是覆盖语义。
    pub fn append_string(&self, mut dst: String) -> core::result::Result<String, Utf8Error> {
        let text = self.to_str()?;
        dst.clear();
        dst.push_str(text);
        Ok(dst)
    }

    /// 只清空长度，保留内存块（软重置）。
    pub fn reset_len(&mut self) {
        self.len = 0;
    }

    /// 释放内存块并清空长度。
    ///
    /// 释放后 `capacity() == 0`，但上一次的容量会被记住，
    /// 下一次首写直接按该大小分配，省去逐级翻倍。
    pub fn reset(&mut self) {
        if self.cap > 0 {
            self.hint = self.cap;
        }
        self.free();
    }

    /// 完全拆除：释放内存块，清空长度、容量与容量记忆。
    pub fn release(&mut self) {
        self.free();
        self.hint = 0;
    }

    /// 内存块起始地址；未分配时为悬垂指针，只能配合零长度使用。
    fn base(&self) -> *mut u8 {
        self.ptr.map_or(NonNull::dangling().as_ptr(), NonNull::as_ptr)
    }

    fn set_len_written(&mut self, end: usize) {
        self.len = end;
        self.init = self.init.max(end);
    }

    /// 把 `[init, end)` 补零，使 `[0, end)` 全部可以安全地作为 `&mut [u8]` 暴露。
    ///
    /// 调用方保证 `end <= cap`。
    fn ensure_init(&mut self, end: usize) {
        debug_assert!(end <= self.cap);
        if end > self.init {
            // SAFETY: `init < end <= cap`，区域位于已分配的内存块内。
            unsafe { ptr::write_bytes(self.base().add(self.init), 0, end - self.init) };
            self.init = end;
        }
    }

    /// 返回 `[start, end)` 的已初始化可变视图，调用方保证 `start <= end <= cap`。
    fn initialized_range(&mut self, start: usize, end: usize) -> &mut [u8] {
        self.ensure_init(end);
        // SAFETY: `ensure_init` 之后 `[0, end)` 已初始化，`&mut self` 保证独占。
        unsafe { slice::from_raw_parts_mut(self.base().add(start), end - start) }
    }

    /// 为尾部追加 `additional` 字节准备空间，沿用写入路径的分配与翻倍策略。
    fn reserve_tail(&mut self, additional: usize) -> Result<()> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or(ByteBufError::BadAlloc {
                requested: usize::MAX,
            })?;
        if self.ptr.is_none() {
            let initial = if self.hint > 0 {
                self.hint
            } else {
                doubled(additional)?
            };
            self.allocate(initial)?;
        }
        if required > self.cap {
            self.grow(doubled(required)?)?;
        }
        Ok(())
    }

    /// 预留 `worst_case` 字节的草稿区交给 `encode`，再把长度收缩到实际编码长度。
    fn write_scratch<F>(&mut self, worst_case: usize, encode: F) -> Result<usize>
    where
        F: FnOnce(&mut [u8]) -> Option<usize>,
    {
        self.reserve_tail(worst_case)?;
        let start = self.len;
        let scratch = self.initialized_range(start, start + worst_case);
        let written = encode(scratch)
            .filter(|written| *written <= worst_case)
            .ok_or(ByteBufError::BadAlloc {
                requested: worst_case,
            })?;
        self.set_len_written(start + written);
        Ok(written)
    }

    fn allocate(&mut self, capacity: usize) -> Result<()> {
        debug_assert!(self.ptr.is_none() && capacity > 0);
        let layout = layout_for(capacity)?;
        // SAFETY: `capacity > 0`，布局非零大小。
        let raw = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(raw).ok_or(ByteBufError::BadAlloc {
            requested: capacity,
        })?;
        self.ptr = Some(ptr);
        self.cap = capacity;
        self.len = 0;
        self.init = 0;
        Ok(())
    }

    /// 把已有内存块调整为 `capacity` 字节，保留 `[0, min(len, capacity))`。
    fn reallocate(&mut self, capacity: usize) -> Result<()> {
        let Some(old) = self.ptr else {
            return self.allocate(capacity);
        };
        debug_assert!(capacity > 0);
        let new_layout = layout_for(capacity)?;
        let old_layout = layout_for(self.cap)?;
        let keep = self.len.min(capacity);

        // 短有效区用“新分配 + 拷贝 + 释放”，只搬运有效字节；长有效区交给 `realloc` 原地扩展。
        let in_place = keep > MALLOC_GROW_THRESHOLD;
        let raw = if in_place {
            // SAFETY: `old` 由 `old_layout` 分配，`capacity` 经 `layout_for` 校验。
            unsafe { alloc::realloc(old.as_ptr(), old_layout, capacity) }
        } else {
            // SAFETY: 新块非零大小；`keep` 不超过新旧两块的大小，两块互不重叠。
            unsafe {
                let fresh = alloc::alloc(new_layout);
                if !fresh.is_null() {
                    ptr::copy_nonoverlapping(old.as_ptr(), fresh, keep);
                    alloc::dealloc(old.as_ptr(), old_layout);
                }
                fresh
            }
        };
        // 失败时旧内存块仍然有效，状态保持不变。
        let ptr = NonNull::new(raw).ok_or(ByteBufError::BadAlloc {
            requested: capacity,
        })?;

        self.init = if in_place {
            self.init.min(capacity)
        } else {
            keep
        };
        self.ptr = Some(ptr);
        self.cap = capacity;
        self.len = keep;
        Ok(())
    }

    fn shrink_to(&mut self, capacity: usize) -> Result<()> {
        if capacity >= self.cap {
            return Ok(());
        }
        if capacity == 0 {
            self.free();
            return Ok(());
        }
        self.reallocate(capacity)
    }

    fn free(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            if let Ok(layout) = layout_for(self.cap) {
                // SAFETY: `ptr` 由同一布局分配，且此后不再被访问。
                unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
            }
        }
        self.len = 0;
        self.cap = 0;
        self.init = 0;
    }
}

fn layout_for(capacity: usize) -> Result<Layout> {
    Layout::array::<u8>(capacity).map_err(|_| ByteBufError::BadAlloc {
        requested: capacity,
    })
}

fn doubled(n: usize) -> Result<usize> {
    n.checked_mul(2).ok_or(ByteBufError::BadAlloc {
        requested: usize::MAX,
    })
}

fn copy_prefix(dst: &mut [u8], text: &[u8]) -> Option<usize> {
    dst.get_mut(..text.len())?.copy_from_slice(text);
    Some(text.len())
}

impl Default for ByteBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ByteBuf {
    fn drop(&mut self) {
        self.free();
    }
}

impl fmt::Debug for ByteBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuf")
            .field("len", &self.len)
            .field("capacity", &self.cap)
            .finish()
    }
}

/// 以有损 UTF-8 方式渲染有效区。
impl fmt::Display for ByteBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl AsRef<[u8]> for ByteBuf {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl io::Write for ByteBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        ByteBuf::write(self, data).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for ByteBuf {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        self.write_string(text).map(drop).map_err(|_| fmt::Error)
    }
}

/// 让 `bytes` 生态的编码器（`put_u32`、`put_slice` 等）直接写入缓冲。
///
/// # Panics
/// 与 `Vec<u8>` 的实现一致，`chunk_mut` 在需要扩容而分配失败时调用
/// [`std::alloc::handle_alloc_error`]。
unsafe impl BufMut for ByteBuf {
    fn remaining_mut(&self) -> usize {
        isize::MAX as usize - self.len
    }

    unsafe fn advance_mut(&mut self, cnt: usize) {
        let available = self.cap - self.len;
        assert!(
            cnt <= available,
            "ByteBuf::advance_mut 超出剩余可写空间：请求 {cnt}，实际 {available}"
        );
        self.set_len_written(self.len + cnt);
    }

    fn chunk_mut(&mut self) -> &mut UninitSlice {
        if self.len == self.cap {
            let target = self.cap.max(CHUNK_MIN_CAPACITY).saturating_mul(2);
            if self.grow(target).is_err() {
                match Layout::array::<u8>(target) {
                    Ok(layout) => alloc::handle_alloc_error(layout),
                    Err(_) => panic!("ByteBuf capacity overflow"),
                }
            }
        }
        // SAFETY: `[len, cap)` 位于已分配的内存块内，`UninitSlice` 不要求已初始化。
        unsafe { UninitSlice::from_raw_parts_mut(self.base().add(self.len), self.cap - self.len) }
    }
}
