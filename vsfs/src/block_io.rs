//! # 块读写层
//!
//! 逻辑块由 `sectors_per_block` 个连续扇区组成。
//! 读块时并发读出全部扇区再拼接，写块时把数据补零到整块后切分，并发写入各扇区。
//! 每个块操作都要等它的全部扇区操作完成才返回。

use block_dev::{DiskController, DiskGeometry};
use derive_more::{Display, From, Into};
use futures::future;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::layout::{self, DirEntry, DiskInode, SuperBlock};
use crate::{Error, Result};

/// 块编号
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct BlockId(usize);

impl BlockId {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }
}

impl core::ops::Add<usize> for BlockId {
    type Output = Self;

    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs)
    }
}

/// 读出的块。
///
/// 同一份字节可以按超级块、目录项或 inode 三种方式解读，
/// 由调用者根据上下文挑选。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    data: Vec<u8>,
}

impl Block {
    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn super_block(&self) -> Result<SuperBlock> {
        SuperBlock::from_bytes(&self.data)
    }

    pub fn dir_entries(&self) -> Vec<DirEntry> {
        layout::decode_directory(&self.data)
    }

    pub fn inodes(&self) -> Vec<DiskInode> {
        self.data
            .chunks_exact(DiskInode::SIZE)
            .map(DiskInode::decode)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct BlockIo {
    disk: DiskController,
}

impl BlockIo {
    pub fn new(disk: DiskController) -> Self {
        Self { disk }
    }

    #[inline]
    pub fn disk(&self) -> &DiskController {
        &self.disk
    }

    #[inline]
    pub fn geometry(&self) -> DiskGeometry {
        self.disk.geometry()
    }

    #[inline]
    pub fn block_bytes(&self) -> usize {
        self.geometry().block_bytes()
    }

    fn check(&self, block: BlockId) -> Result<()> {
        let total = self.geometry().total_blocks;
        if usize::from(block) < total {
            Ok(())
        } else {
            Err(Error::InvalidBlockAddress {
                block: block.into(),
                total,
            })
        }
    }

    pub async fn read_block(&self, block: BlockId) -> Result<Block> {
        self.check(block)?;
        let geometry = self.geometry();

        let sectors = future::try_join_all(
            geometry
                .sectors_of(block.into())
                .map(|sector| self.disk.read_sector(sector)),
        )
        .await?;
        let data = sectors.concat();
        if data.len() < geometry.block_bytes() {
            return Err(Error::BlockUnderflow {
                len: data.len(),
                capacity: geometry.block_bytes(),
            });
        }

        log::debug!("read block {block}");
        Ok(Block { id: block, data })
    }

    /// 不足一块的数据在末尾补零
    pub async fn write_block(&self, block: BlockId, data: &[u8]) -> Result<()> {
        self.check(block)?;
        let geometry = self.geometry();
        let capacity = geometry.block_bytes();
        if data.len() > capacity {
            return Err(Error::BlockOverflow {
                len: data.len(),
                capacity,
            });
        }

        let mut padded = data.to_vec();
        padded.resize(capacity, 0);
        future::try_join_all(
            geometry
                .sectors_of(block.into())
                .zip(padded.chunks(geometry.sector_bytes()))
                .map(|(sector, chunk)| self.disk.write_sector(sector, chunk)),
        )
        .await?;

        log::debug!("write block {block}");
        Ok(())
    }

    #[inline]
    pub async fn zero_block(&self, block: BlockId) -> Result<()> {
        self.write_block(block, &[]).await
    }

    /// 并发读多个块，结果按传入顺序排列。
    ///
    /// 每完成一块就以 `(已完成, 总数)` 调用一次 `progress`，
    /// 调用顺序取决于实际完成顺序。
    pub async fn read_blocks(
        &self,
        blocks: &[BlockId],
        mut progress: impl FnMut(usize, usize),
    ) -> Result<Vec<Block>> {
        let total = blocks.len();
        let mut pending: FuturesUnordered<_> = blocks
            .iter()
            .enumerate()
            .map(|(i, &block)| async move { (i, self.read_block(block).await) })
            .collect();

        let mut read: Vec<Option<Block>> = vec![None; total];
        let mut done = 0;
        while let Some((i, block)) = pending.next().await {
            read[i] = Some(block?);
            done += 1;
            progress(done, total);
        }

        Ok(read.into_iter().flatten().collect())
    }

    /// 并发写多个块，`blocks` 与 `data` 必须一一对应
    pub async fn write_blocks<D: AsRef<[u8]>>(
        &self,
        blocks: &[BlockId],
        data: &[D],
        mut progress: impl FnMut(usize, usize),
    ) -> Result<()> {
        if blocks.len() != data.len() {
            return Err(Error::BadDataLength {
                blocks: blocks.len(),
                data: data.len(),
            });
        }

        let total = blocks.len();
        let mut pending: FuturesUnordered<_> = blocks
            .iter()
            .zip(data)
            .map(|(&block, data)| self.write_block(block, data.as_ref()))
            .collect();

        let mut done = 0;
        while let Some(written) = pending.next().await {
            written?;
            done += 1;
            progress(done, total);
        }

        Ok(())
    }
}
