use crate::{bits, BlockId, BlockIo, Error, Result};

/// 位图块，记录其指示区域的分配情况。
///
/// 第 `i` 位位于第 `i / 8` 字节的第 `7 - i % 8` 位（高位在前），1 表示已分配。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitmap {
    /// 位图所在块
    block: BlockId,
    /// 有效位数
    count: usize,
}

impl Bitmap {
    #[inline]
    pub fn new(block: BlockId, count: usize) -> Self {
        Self { block, count }
    }

    #[inline]
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// 位图所指示区域的单元总数
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    pub async fn get(&self, io: &BlockIo, index: usize) -> Result<bool> {
        let block = io.read_block(self.block).await?;
        Ok(bit(block.as_bytes(), index))
    }

    /// 读出位图块，改写一位后写回
    pub async fn update(&self, io: &BlockIo, index: usize, value: bool) -> Result<()> {
        if index >= self.count {
            return Err(Error::BitmapIndex {
                index,
                count: self.count,
            });
        }

        let mut bytes = io.read_block(self.block).await?.into_bytes();
        set_bit(&mut bytes, index, value);
        io.write_block(self.block, &bytes).await?;

        log::debug!("bitmap@{}: bit {index} <- {}", self.block, u8::from(value));
        Ok(())
    }

    /// 编号最小的空闲位
    pub async fn find_free(&self, io: &BlockIo) -> Result<Option<usize>> {
        Ok(self.find_free_n(io, 1).await?.first().copied())
    }

    /// 按编号从小到大找出至多 `n` 个空闲位
    pub async fn find_free_n(&self, io: &BlockIo, n: usize) -> Result<Vec<usize>> {
        let block = io.read_block(self.block).await?;
        Ok((0..self.count)
            .filter(|&i| !bit(block.as_bytes(), i))
            .take(n)
            .collect())
    }

    pub async fn count_free(&self, io: &BlockIo) -> Result<usize> {
        let block = io.read_block(self.block).await?;
        Ok((0..self.count)
            .filter(|&i| !bit(block.as_bytes(), i))
            .count())
    }

    /// 有效部分的位串
    pub async fn to_bit_string(&self, io: &BlockIo) -> Result<String> {
        let block = io.read_block(self.block).await?;
        Ok(bits::unpack_prefix(block.as_bytes(), self.count))
    }
}

#[inline]
fn bit(bytes: &[u8], index: usize) -> bool {
    bytes[index / 8] & (0x80 >> (index % 8)) != 0
}

#[inline]
fn set_bit(bytes: &mut [u8], index: usize, value: bool) {
    let mask = 0x80 >> (index % 8);
    if value {
        bytes[index / 8] |= mask;
    } else {
        bytes[index / 8] &= !mask;
    }
}
