use crate::error::BoxError;

/// `MarshalTo` 描述可以直接序列化进缓冲内存的对象（例如 Protobuf 生成的消息）。
///
/// # 契约说明（What）
/// - `size`：返回序列化后的精确字节数，缓冲据此一次性扩容；
/// - `marshal_to`：`dst` 的长度恰好等于 `size()`，实现者返回实际写入的字节数；
/// - **前置条件**：两次调用之间对象不得被修改，否则 `size` 与实际输出可能不一致。
///
/// # 设计取舍（Trade-offs）
/// - 错误类型使用装箱的动态错误以保持对象安全，调用端可以传入 `&dyn MarshalTo`。
pub trait MarshalTo {
    /// 序列化后的字节数。
    fn size(&self) -> usize;

    /// 将对象写入 `dst`，返回写入的字节数。
    fn marshal_to(&self, dst: &mut [u8]) -> Result<usize, BoxError>;
}

impl<T: MarshalTo + ?Sized> MarshalTo for &T {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn marshal_to(&self, dst: &mut [u8]) -> Result<usize, BoxError> {
        (**self).marshal_to(dst)
    }
}
