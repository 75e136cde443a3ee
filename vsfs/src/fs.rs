//! # 文件系统管理层
//!
//! 构建出磁盘的布局并使用：格式化、挂载、inode 定位与数据块的分配回收。

use std::time::{SystemTime, UNIX_EPOCH};

use block_dev::{DiskController, DiskGeometry};
use enumflags2::BitFlags;
use spin::Mutex;

use crate::fd::{FdTable, FileDescriptor};
use crate::layout::{self, Bitmap, DirEntry, DiskInode, DiskInodeKind, SuperBlock};
use crate::{
    Block, BlockId, BlockIo, Error, Result, DATA_BITMAP_BLOCK, DIRECT_POINTERS, ENTRY_BITS,
    INODE_BITMAP_BLOCK, INODE_TABLE_BLOCK, SUPER_BLOCK,
};

/// 根目录的 inode 编号
pub const ROOT_INODE: u32 = 0;

/// 4 位块指针最多寻址 16 个块
const MAX_BLOCKS: usize = 16;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// inode 表占用的块数，缺省为 `max(1, (总块数 - 3) / 4)`
    pub inode_blocks: Option<u8>,
}

/// inode 与数据块的使用情况
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub inodes_used: usize,
    pub inodes_total: usize,
    pub data_used: usize,
    pub data_total: usize,
}

/// 由超级块推出的各区域位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsLayout {
    pub inode_bitmap: Bitmap,
    pub data_bitmap: Bitmap,
    pub inode_start: BlockId,
    pub inode_blocks: usize,
    pub data_start: BlockId,
    pub data_blocks: usize,
    /// 块大小（位）
    pub block_size: usize,
}

impl FsLayout {
    /// 为给定几何参数规划布局
    pub fn plan(geometry: DiskGeometry, options: FormatOptions) -> Result<Self> {
        geometry.validate()?;

        let total = geometry.total_blocks;
        if total > MAX_BLOCKS {
            return Err(Error::InvalidGeometry(
                "a 4-bit block pointer addresses at most 16 blocks",
            ));
        }
        if total < 5 {
            return Err(Error::InvalidGeometry(
                "at least one inode block and one data block are required",
            ));
        }
        if geometry.block_size() < ENTRY_BITS {
            return Err(Error::InvalidGeometry("a block must hold at least 128 bits"));
        }

        let inode_blocks = options
            .inode_blocks
            .map_or_else(|| ((total - 3) / 4).max(1), usize::from);
        if inode_blocks == 0 || 3 + inode_blocks >= total {
            return Err(Error::InvalidGeometry(
                "at least one inode block and one data block are required",
            ));
        }

        let layout = Self::new(geometry.block_size(), inode_blocks, total - 3 - inode_blocks)?;
        if layout.data_blocks < 2usize.div_ceil(layout.entries_per_block()) {
            return Err(Error::InvalidGeometry(
                "the root directory does not fit in the data area",
            ));
        }
        Ok(layout)
    }

    /// 从超级块恢复布局，并核对磁盘几何参数
    pub fn from_super_block(super_block: &SuperBlock, geometry: DiskGeometry) -> Result<Self> {
        if !super_block.is_valid() {
            return Err(Error::BadMagic(super_block.magic()));
        }
        if super_block.block_size as usize != geometry.block_size() {
            return Err(Error::InvalidGeometry(
                "the superblock was written with another block size",
            ));
        }

        let inode_blocks = usize::from(super_block.inode_blocks);
        let data_blocks = usize::from(super_block.data_blocks);
        if 3 + inode_blocks + data_blocks != geometry.total_blocks {
            return Err(Error::InvalidGeometry(
                "the superblock was written for another disk size",
            ));
        }

        Self::new(geometry.block_size(), inode_blocks, data_blocks)
    }

    fn new(block_size: usize, inode_blocks: usize, data_blocks: usize) -> Result<Self> {
        // 写满 8 个块的文件大小必须能放进 inode 的 24 位大小字段
        if DIRECT_POINTERS * block_size > DiskInode::MAX_SIZE as usize {
            return Err(Error::InvalidGeometry(
                "a full file would overflow the 24-bit inode size",
            ));
        }

        let inode_count = inode_blocks * (block_size / ENTRY_BITS);
        if inode_count > usize::from(u16::MAX) {
            return Err(Error::InvalidGeometry("too many inodes for the superblock"));
        }

        Ok(Self {
            inode_bitmap: Bitmap::new(INODE_BITMAP_BLOCK, inode_count),
            data_bitmap: Bitmap::new(DATA_BITMAP_BLOCK, data_blocks),
            inode_start: INODE_TABLE_BLOCK,
            inode_blocks,
            data_start: INODE_TABLE_BLOCK + inode_blocks,
            data_blocks,
            block_size,
        })
    }

    #[inline]
    pub fn inode_count(&self) -> usize {
        self.inode_bitmap.count()
    }

    #[inline]
    pub fn inodes_per_block(&self) -> usize {
        self.block_size / ENTRY_BITS
    }

    #[inline]
    pub fn entries_per_block(&self) -> usize {
        self.block_size / ENTRY_BITS
    }

    fn super_block(&self) -> Result<SuperBlock> {
        SuperBlock::build(
            self.inode_count() as u16,
            self.inode_blocks as u8,
            self.data_blocks as u8,
            self.block_size as u32,
        )
    }
}

pub struct Vsfs {
    pub(crate) io: BlockIo,
    pub(crate) layout: FsLayout,
    /// 结构性修改（位图、父目录、inode）的临界区
    pub(crate) meta: tokio::sync::Mutex<()>,
    pub(crate) fds: Mutex<FdTable>,
}

impl Vsfs {
    /// 清空磁盘并建立只含根目录的文件系统
    pub async fn format(disk: DiskController, options: FormatOptions) -> Result<Self> {
        let layout = FsLayout::plan(disk.geometry(), options)?;
        let fs = Self::with_layout(BlockIo::new(disk), layout);

        let total = fs.io.geometry().total_blocks;
        let all: Vec<BlockId> = (0..total).map(BlockId::new).collect();
        let empty = vec![Vec::<u8>::new(); total];
        fs.io
            .write_blocks(&all, &empty, |done, total| {
                log::trace!("format: zeroed {done}/{total} blocks")
            })
            .await?;

        fs.io
            .write_block(SUPER_BLOCK, &layout.super_block()?.to_bytes())
            .await?;

        let seed = fs.seed_directory(ROOT_INODE, ROOT_INODE)?;
        let blocks: Vec<BlockId> = (0..seed.len()).map(|i| layout.data_start + i).collect();
        fs.io.write_blocks(&blocks, &seed, |_, _| ()).await?;

        let mut root = DiskInode::new(DiskInodeKind::Directory, BitFlags::all(), now());
        root.size = (2 * ENTRY_BITS) as u32;
        for (pointer, &block) in root.pointers.iter_mut().zip(&blocks) {
            *pointer = Some(block);
        }
        fs.write_inode(ROOT_INODE, &root).await?;

        layout
            .inode_bitmap
            .update(&fs.io, ROOT_INODE as usize, true)
            .await?;
        for &block in &blocks {
            fs.claim_data(block).await?;
        }

        log::info!(
            "format: {} inodes in {} blocks, {} data blocks from block {}",
            layout.inode_count(),
            layout.inode_blocks,
            layout.data_blocks,
            layout.data_start,
        );
        Ok(fs)
    }

    /// 挂载已格式化的磁盘
    pub async fn mount(disk: DiskController) -> Result<Self> {
        let io = BlockIo::new(disk);
        let super_block = io.read_block(SUPER_BLOCK).await?.super_block()?;
        let layout = FsLayout::from_super_block(&super_block, io.geometry())?;

        log::info!(
            "mount: {} inodes, {} data blocks",
            layout.inode_count(),
            layout.data_blocks
        );
        Ok(Self::with_layout(io, layout))
    }

    fn with_layout(io: BlockIo, layout: FsLayout) -> Self {
        Self {
            io,
            layout,
            meta: tokio::sync::Mutex::new(()),
            fds: Mutex::new(FdTable::new()),
        }
    }

    #[inline]
    pub fn layout(&self) -> &FsLayout {
        &self.layout
    }

    #[inline]
    pub fn disk(&self) -> &DiskController {
        self.io.disk()
    }

    /// 通过ID获取 inode 在磁盘上的位置：**块ID**以及**块内偏移**
    pub fn disk_inode_pos(&self, inode_id: u32) -> Result<(BlockId, usize)> {
        let id = inode_id as usize;
        if id >= self.layout.inode_count() {
            return Err(Error::InvalidInode(inode_id));
        }

        let per_block = self.layout.inodes_per_block();
        Ok((
            self.layout.inode_start + id / per_block,
            id % per_block * DiskInode::SIZE,
        ))
    }

    pub(crate) async fn read_inode(&self, inode_id: u32) -> Result<DiskInode> {
        let (block, offset) = self.disk_inode_pos(inode_id)?;
        let block = self.io.read_block(block).await?;
        let inode = DiskInode::from_bytes(&block.as_bytes()[offset..])?;
        self.check_pointers(&inode)?;
        Ok(inode)
    }

    /// inode 表按块读写，先读出整块再改写其中一项
    pub(crate) async fn write_inode(&self, inode_id: u32, inode: &DiskInode) -> Result<()> {
        let (block, offset) = self.disk_inode_pos(inode_id)?;
        let mut bytes = self.io.read_block(block).await?.into_bytes();
        bytes[offset..offset + DiskInode::SIZE].copy_from_slice(&inode.to_bytes());
        self.io.write_block(block, &bytes).await?;

        log::debug!("inode {inode_id} written to block {block} at {offset}");
        Ok(())
    }

    /// 编号最小的空闲 inode
    pub(crate) async fn find_free_inode(&self) -> Result<u32> {
        self.layout
            .inode_bitmap
            .find_free(&self.io)
            .await?
            .map(|id| id as u32)
            .ok_or(Error::InodeOverflow)
    }

    /// 找出 `n` 个空闲数据块，不足则报错；此时位图尚未改动
    pub(crate) async fn find_free_data(&self, n: usize) -> Result<Vec<BlockId>> {
        let free = self.layout.data_bitmap.find_free_n(&self.io, n).await?;
        if free.len() < n {
            return Err(Error::DataBlockOverflow);
        }
        Ok(free
            .into_iter()
            .map(|i| self.layout.data_start + i)
            .collect())
    }

    /// 数据块在数据位图中的下标，数据区之外的块指针无效
    fn data_index(&self, block: BlockId) -> Result<usize> {
        let raw = usize::from(block);
        let start = usize::from(self.layout.data_start);
        if (start..start + self.layout.data_blocks).contains(&raw) {
            Ok(raw - start)
        } else {
            Err(Error::InvalidBlockPointer(raw))
        }
    }

    /// 磁盘上读出的 inode 的块指针都必须落在数据区内
    fn check_pointers(&self, inode: &DiskInode) -> Result<()> {
        inode
            .blocks()
            .try_for_each(|block| self.data_index(block).map(drop))
    }

    pub(crate) async fn claim_data(&self, block: BlockId) -> Result<()> {
        let index = self.data_index(block)?;
        self.layout.data_bitmap.update(&self.io, index, true).await
    }

    /// 回收的数据块会被清零
    pub(crate) async fn release_data(&self, block: BlockId) -> Result<()> {
        let index = self.data_index(block)?;
        self.io.zero_block(block).await?;
        self.layout.data_bitmap.update(&self.io, index, false).await
    }

    /// 新目录的 `.` 与 `..`，一块放不下时顺延到后续块
    pub(crate) fn seed_directory(&self, inode_id: u32, parent_id: u32) -> Result<Vec<Vec<u8>>> {
        let entries = [DirEntry::new(".", inode_id), DirEntry::new("..", parent_id)];
        entries
            .chunks(self.layout.entries_per_block())
            .map(|chunk| layout::build_directory(chunk, self.layout.block_size))
            .collect()
    }

    /// 读出目录的全部块，保留空闲项以便定位
    pub(crate) async fn read_directory(
        &self,
        dir: &DiskInode,
    ) -> Result<Vec<(BlockId, Vec<DirEntry>)>> {
        let blocks: Vec<BlockId> = dir.blocks().collect();
        let read = self.io.read_blocks(&blocks, |_, _| ()).await?;
        Ok(read
            .into_iter()
            .map(|block| (block.id(), block.dir_entries()))
            .collect())
    }

    pub async fn super_block(&self) -> Result<SuperBlock> {
        self.io.read_block(SUPER_BLOCK).await?.super_block()
    }

    pub async fn inode(&self, inode_id: u32) -> Result<DiskInode> {
        self.read_inode(inode_id).await
    }

    pub async fn inode_bitmap(&self) -> Result<String> {
        self.layout.inode_bitmap.to_bit_string(&self.io).await
    }

    pub async fn data_bitmap(&self) -> Result<String> {
        self.layout.data_bitmap.to_bit_string(&self.io).await
    }

    /// 原样读出任意一块
    pub async fn dump_block(&self, block: BlockId) -> Result<Block> {
        self.io.read_block(block).await
    }

    pub async fn usage(&self) -> Result<Usage> {
        let inodes_total = self.layout.inode_count();
        let data_total = self.layout.data_blocks;
        let inodes_free = self.layout.inode_bitmap.count_free(&self.io).await?;
        let data_free = self.layout.data_bitmap.count_free(&self.io).await?;

        Ok(Usage {
            inodes_used: inodes_total - inodes_free,
            inodes_total,
            data_used: data_total - data_free,
            data_total,
        })
    }

    pub fn open_descriptors(&self) -> Vec<(usize, FileDescriptor)> {
        self.fds.lock().open_descriptors()
    }
}

/// 当前 Unix 时间（秒）
pub(crate) fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as u32)
}

#[cfg(test)]
mod tests {
    use block_dev::DiskConfig;

    use super::*;

    fn disk(geometry: DiskGeometry) -> DiskController {
        DiskController::new(DiskConfig::new(geometry)).unwrap()
    }

    #[test]
    fn default_plan() {
        let layout = FsLayout::plan(DiskGeometry::default(), FormatOptions::default()).unwrap();
        assert_eq!(3, layout.inode_blocks);
        assert_eq!(3, layout.inode_count());
        assert_eq!(BlockId::new(6), layout.data_start);
        assert_eq!(10, layout.data_blocks);
    }

    #[test]
    fn rejects_bad_geometry() {
        let plan = |geometry, inode_blocks| {
            FsLayout::plan(geometry, FormatOptions { inode_blocks })
        };
        assert!(matches!(
            plan(DiskGeometry::new(128, 1, 17), None),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            plan(DiskGeometry::new(64, 1, 16), None),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            plan(DiskGeometry::default(), Some(13)),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            plan(DiskGeometry::default(), Some(0)),
            Err(Error::InvalidGeometry(_))
        ));
        // 8 个满块的大小恰好放得下 24 位大小字段
        assert!(plan(DiskGeometry::new((1 << 21) - 8, 1, 16), None).is_ok());
        assert!(matches!(
            plan(DiskGeometry::new(1 << 21, 1, 16), None),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            plan(DiskGeometry::new(1 << 20, 2, 16), None),
            Err(Error::InvalidGeometry(_))
        ));

        // 128 位的块上，根目录的 `.` 与 `..` 需要两个数据块
        assert!(matches!(
            plan(DiskGeometry::default(), Some(12)),
            Err(Error::InvalidGeometry(_))
        ));
        assert_eq!(
            11,
            plan(DiskGeometry::default(), Some(11)).unwrap().inode_count()
        );
    }

    #[tokio::test]
    async fn format_writes_root() {
        let fs = Vsfs::format(disk(DiskGeometry::default()), FormatOptions::default())
            .await
            .unwrap();

        let super_block = fs.super_block().await.unwrap();
        assert!(super_block.is_valid());
        assert_eq!(3, super_block.inode_count);
        assert_eq!(10, super_block.data_blocks);
        assert_eq!(128, super_block.block_size);

        // 128 位的块只放得下一个目录项
        let root = fs.inode(ROOT_INODE).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(256, root.size);
        assert_eq!(
            vec![BlockId::new(6), BlockId::new(7)],
            root.blocks().collect::<Vec<_>>()
        );

        assert_eq!("100", fs.inode_bitmap().await.unwrap());
        assert_eq!("1100000000", fs.data_bitmap().await.unwrap());
        assert_eq!(
            Usage {
                inodes_used: 1,
                inodes_total: 3,
                data_used: 2,
                data_total: 10,
            },
            fs.usage().await.unwrap()
        );
    }

    #[tokio::test]
    async fn mount_after_format() {
        let disk = disk(DiskGeometry::new(256, 2, 8));
        let formatted = Vsfs::format(disk.clone(), FormatOptions::default())
            .await
            .unwrap();
        let mounted = Vsfs::mount(disk).await.unwrap();
        assert_eq!(formatted.layout(), mounted.layout());
        assert_eq!(
            formatted.inode(ROOT_INODE).await.unwrap(),
            mounted.inode(ROOT_INODE).await.unwrap()
        );
    }

    #[tokio::test]
    async fn mount_rejects_blank_disk() {
        let result = Vsfs::mount(disk(DiskGeometry::default())).await;
        assert_eq!(Some(Error::BadMagic(0)), result.err());
    }

    #[tokio::test]
    async fn inode_position() {
        let fs = Vsfs::format(disk(DiskGeometry::new(256, 1, 16)), FormatOptions::default())
            .await
            .unwrap();
        assert_eq!(Ok((BlockId::new(3), 0)), fs.disk_inode_pos(0));
        assert_eq!(Ok((BlockId::new(3), 16)), fs.disk_inode_pos(1));
        assert_eq!(Ok((BlockId::new(4), 0)), fs.disk_inode_pos(2));
        assert_eq!(Err(Error::InvalidInode(6)), fs.disk_inode_pos(6));
    }

    #[tokio::test]
    async fn release_zeroes_block() {
        let fs = Vsfs::format(disk(DiskGeometry::default()), FormatOptions::default())
            .await
            .unwrap();
        let blocks = fs.find_free_data(2).await.unwrap();
        assert_eq!(vec![BlockId::new(8), BlockId::new(9)], blocks);

        fs.io.write_block(blocks[0], &[0xFF; 16]).await.unwrap();
        fs.claim_data(blocks[0]).await.unwrap();
        assert_eq!("1110000000", fs.data_bitmap().await.unwrap());

        fs.release_data(blocks[0]).await.unwrap();
        assert_eq!("1100000000", fs.data_bitmap().await.unwrap());
        assert_eq!(&[0; 16], fs.dump_block(blocks[0]).await.unwrap().as_bytes());

        assert_eq!(Err(Error::DataBlockOverflow), fs.find_free_data(9).await);
    }

    #[tokio::test]
    async fn pointers_outside_the_data_area() {
        let fs = Vsfs::format(disk(DiskGeometry::default()), FormatOptions::default())
            .await
            .unwrap();
        let before = fs.disk().snapshot().await.unwrap();

        // 数据区为 6..16
        for block in [0, 1, 2, 5] {
            let block = BlockId::new(block);
            assert_eq!(
                Err(Error::InvalidBlockPointer(block.into())),
                fs.release_data(block).await
            );
            assert_eq!(
                Err(Error::InvalidBlockPointer(block.into())),
                fs.claim_data(block).await
            );
        }
        assert_eq!(before, fs.disk().snapshot().await.unwrap());

        let mut inode = fs.inode(ROOT_INODE).await.unwrap();
        assert_eq!(Ok(()), fs.check_pointers(&inode));
        inode.pointers[5] = Some(BlockId::new(3));
        assert_eq!(Err(Error::InvalidBlockPointer(3)), fs.check_pointers(&inode));
    }
}
