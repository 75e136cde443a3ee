use crate::{Error, Result, MAGIC};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 记录 inode 数量与各区域的块数
///
/// 磁盘上只占 56 位：
/// 魔数(8) | inode 数(16) | inode 表块数(4) | 数据块数(4) | 块大小(24)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    magic: u8,
    pub inode_count: u16,
    pub inode_blocks: u8,
    pub data_blocks: u8,
    /// 块大小（位）
    pub block_size: u32,
}

impl SuperBlock {
    pub const SIZE: usize = 7;

    pub fn build(
        inode_count: u16,
        inode_blocks: u8,
        data_blocks: u8,
        block_size: u32,
    ) -> Result<Self> {
        if inode_blocks > 0x0F || data_blocks > 0x0F {
            return Err(Error::InvalidGeometry(
                "region block counts must fit in a nibble",
            ));
        }
        if block_size >= 1 << 24 {
            return Err(Error::InvalidGeometry("block size must fit in 24 bits"));
        }

        Ok(Self {
            magic: MAGIC,
            inode_count,
            inode_blocks,
            data_blocks,
            block_size,
        })
    }

    #[inline]
    pub fn magic(&self) -> u8 {
        self.magic
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let [count_hi, count_lo] = self.inode_count.to_be_bytes();
        let [_, size_hi, size_mid, size_lo] = self.block_size.to_be_bytes();

        [
            self.magic,
            count_hi,
            count_lo,
            self.inode_blocks << 4 | self.data_blocks & 0x0F,
            size_hi,
            size_mid,
            size_lo,
        ]
    }

    /// 只解读前 7 个字节，其余部分忽略
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some(bytes) = bytes.get(..Self::SIZE) else {
            return Err(Error::InvalidChunkSize {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        };

        Ok(Self {
            magic: bytes[0],
            inode_count: u16::from_be_bytes([bytes[1], bytes[2]]),
            inode_blocks: bytes[3] >> 4,
            data_blocks: bytes[3] & 0x0F,
            block_size: u32::from_be_bytes([0, bytes[4], bytes[5], bytes[6]]),
        })
    }
}
