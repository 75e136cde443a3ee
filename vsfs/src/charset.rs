//! 字节与可显示字符之间的映射。
//!
//! 字节值与同值的 Unicode 标量一一对应（Latin-1），0 仅作填充。

use crate::{Error, Result};

#[inline]
pub fn encode(c: char) -> Option<u8> {
    u8::try_from(c).ok().filter(|&b| b != 0)
}

#[inline]
pub fn decode(b: u8) -> char {
    char::from(b)
}

pub fn encode_str(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| encode(c).ok_or(Error::InvalidCharacter(c)))
        .collect()
}

/// 解码到第一个填充字节为止
pub fn decode_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| decode(b))
        .collect()
}
