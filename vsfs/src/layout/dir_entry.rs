use crate::{charset, Error, Result, ENTRY_BITS, NAME_MAX_LEN};

/// 文件系统项的元信息：13 字节文件名 + 3 字节 inode 编号。
///
/// 文件名为空的目录项是空闲的。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    inode_id: u32,
}

impl DirEntry {
    /// 元信息大小恒为16字节
    pub const SIZE: usize = 16;

    #[inline]
    pub fn new(name: &str, inode_id: u32) -> Self {
        Self {
            name: name.to_owned(),
            inode_id,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn inode_id(&self) -> u32 {
        self.inode_id
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.name.is_empty()
    }

    /// `.` 与 `..` 之外的目录项
    #[inline]
    pub fn is_child(&self) -> bool {
        !self.is_free() && self.name != "." && self.name != ".."
    }

    /// 检查文件名能否写进目录项
    pub fn check_name(name: &str) -> Result<()> {
        if name.chars().count() > NAME_MAX_LEN {
            return Err(Error::FilenameTooLong(name.to_owned()));
        }
        charset::encode_str(name).map(drop)
    }

    pub fn to_bytes(&self) -> Result<[u8; Self::SIZE]> {
        Self::check_name(&self.name)?;
        let name = charset::encode_str(&self.name)?;

        let mut bytes = [0; Self::SIZE];
        bytes[..name.len()].copy_from_slice(&name);
        bytes[NAME_MAX_LEN..].copy_from_slice(&self.inode_id.to_be_bytes()[1..]);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::InvalidChunkSize {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self::decode(bytes))
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            name: charset::decode_bytes(&bytes[..NAME_MAX_LEN]),
            inode_id: u32::from_be_bytes([
                0,
                bytes[NAME_MAX_LEN],
                bytes[NAME_MAX_LEN + 1],
                bytes[NAME_MAX_LEN + 2],
            ]),
        }
    }
}

/// 把目录项依次打包，`block_size` 以位计。
/// 返回的字节不足一块，由块读写层补零。
pub fn build_directory(entries: &[DirEntry], block_size: usize) -> Result<Vec<u8>> {
    let capacity = block_size / ENTRY_BITS;
    if entries.len() > capacity {
        return Err(Error::DirectoryBlockOverflow {
            entries: entries.len(),
            capacity,
        });
    }

    let mut bytes = Vec::with_capacity(entries.len() * DirEntry::SIZE);
    for entry in entries {
        bytes.extend_from_slice(&entry.to_bytes()?);
    }
    Ok(bytes)
}

/// 解读一整块的目录项，包括空闲项
pub fn decode_directory(bytes: &[u8]) -> Vec<DirEntry> {
    bytes
        .chunks_exact(DirEntry::SIZE)
        .map(DirEntry::decode)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_layout() {
        let bytes = DirEntry::new("ab", 0x01_0203).to_bytes().unwrap();
        assert_eq!(
            [b'a', b'b', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x02, 0x03],
            bytes
        );
        assert_eq!(
            DirEntry::new("ab", 0x01_0203),
            DirEntry::from_bytes(&bytes).unwrap()
        );
    }

    #[test]
    fn names_are_limited() {
        assert!(DirEntry::new("thirteen-char", 1).to_bytes().is_ok());
        assert_eq!(
            Err(Error::FilenameTooLong("fourteen-chars".into())),
            DirEntry::new("fourteen-chars", 1).to_bytes()
        );
        assert_eq!(
            Err(Error::InvalidCharacter('文')),
            DirEntry::new("文件", 1).to_bytes()
        );
    }

    #[test]
    fn directory_round_trip_marks_free_slots() {
        // 512 位的块能放 4 个目录项
        let entries = [DirEntry::new(".", 3), DirEntry::new("..", 0)];
        let mut block = build_directory(&entries, 512).unwrap();
        assert_eq!(32, block.len());
        block.resize(64, 0);

        let decoded = decode_directory(&block);
        assert_eq!(4, decoded.len());
        assert_eq!(&entries[..], &decoded[..2]);
        assert!(decoded[2..].iter().all(DirEntry::is_free));
        assert!(!decoded.iter().any(DirEntry::is_child));
    }

    #[test]
    fn directory_block_overflow() {
        let entries = vec![DirEntry::new("x", 1); 2];
        assert_eq!(
            Err(Error::DirectoryBlockOverflow {
                entries: 2,
                capacity: 1
            }),
            build_directory(&entries, 128)
        );
    }
}
