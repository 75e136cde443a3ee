//! 位串（由 `'0'` 与 `'1'` 组成的字符串）与字节之间的转换，高位在前。

use crate::{Error, Result};

/// 把位串装入字节，末尾不足一字节的部分补零。
/// 返回字节与位数。
pub fn pack(bits: &str) -> Result<(Vec<u8>, usize)> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    let mut len = 0;

    for (i, c) in bits.chars().enumerate() {
        match c {
            '0' => (),
            '1' => bytes[i / 8] |= 0x80 >> (i % 8),
            c => return Err(Error::InvalidBinaryString(c)),
        }
        len += 1;
    }

    Ok((bytes, len))
}

pub fn unpack(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:08b}")).collect()
}

/// 只取前 `len` 位
pub fn unpack_prefix(bytes: &[u8], len: usize) -> String {
    let mut bits = unpack(bytes);
    bits.truncate(len);
    bits
}
