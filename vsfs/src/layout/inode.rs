//! inode 占 16 字节：
//!
//! | 字节 | 内容 |
//! |---|---|
//! | 0 | 类型（第 3 位，1 为目录）与权限（第 0~2 位：读 4、写 2、执行 1） |
//! | 1..4 | 大小（位） |
//! | 4..8 | 创建时间（Unix 秒） |
//! | 8..12 | 修改时间（Unix 秒） |
//! | 12..16 | 8 个 4 位块指针，偶数槽位在高半字节 |
//!
//! 指针值 0 表示未分配：0 号块是超级块，永远不会被指向。

use enumflags2::{bitflags, BitFlags};

use crate::{BlockId, Error, Result, DIRECT_POINTERS};

const DIRECTORY_BIT: u8 = 0b1000;

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Execute = 0b001,
    Write = 0b010,
    Read = 0b100,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum DiskInodeKind {
    #[default]
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskInode {
    pub kind: DiskInodeKind,
    pub permissions: BitFlags<Permission>,
    /// 内容大小（位），目录为目录项数乘以 128
    pub size: u32,
    pub created: u32,
    pub modified: u32,
    /// 直接索引
    pub pointers: [Option<BlockId>; DIRECT_POINTERS],
}

impl DiskInode {
    pub const SIZE: usize = 16;

    /// 大小字段只有 24 位
    pub const MAX_SIZE: u32 = (1 << 24) - 1;

    #[inline]
    pub fn new(kind: DiskInodeKind, permissions: BitFlags<Permission>, now: u32) -> Self {
        Self {
            kind,
            permissions,
            size: 0,
            created: now,
            modified: now,
            pointers: [None; DIRECT_POINTERS],
        }
    }

    /// 由原始字段构建，检查指针个数与取值范围
    pub fn build(
        kind: DiskInodeKind,
        permissions: BitFlags<Permission>,
        size: u32,
        created: u32,
        modified: u32,
        pointers: &[usize],
    ) -> Result<Self> {
        if pointers.len() != DIRECT_POINTERS {
            return Err(Error::InvalidBlockPointerCount(pointers.len()));
        }
        if size > Self::MAX_SIZE {
            return Err(Error::FileOverflow {
                len: size as usize,
                capacity: Self::MAX_SIZE as usize,
            });
        }

        let mut slots = [None; DIRECT_POINTERS];
        for (slot, &pointer) in slots.iter_mut().zip(pointers) {
            if pointer > 0x0F {
                return Err(Error::InvalidBlockPointer(pointer));
            }
            *slot = (pointer != 0).then_some(BlockId::new(pointer));
        }

        Ok(Self {
            kind,
            permissions,
            size,
            created,
            modified,
            pointers: slots,
        })
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == DiskInodeKind::Directory
    }

    /// 按槽位顺序列出已分配的块
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.pointers.iter().flatten().copied()
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks().count()
    }

    /// 第一个空闲的指针槽位
    #[inline]
    pub fn free_slot(&self) -> Option<usize> {
        self.pointers.iter().position(Option::is_none)
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0; Self::SIZE];

        let kind = match self.kind {
            DiskInodeKind::File => 0,
            DiskInodeKind::Directory => DIRECTORY_BIT,
        };
        bytes[0] = kind | self.permissions.bits();
        bytes[1..4].copy_from_slice(&self.size.to_be_bytes()[1..]);
        bytes[4..8].copy_from_slice(&self.created.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.modified.to_be_bytes());

        for (i, pointer) in self.pointers.iter().enumerate() {
            let nibble = pointer.map_or(0, |block| usize::from(block) as u8 & 0x0F);
            bytes[12 + i / 2] |= if i % 2 == 0 { nibble << 4 } else { nibble };
        }

        bytes
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

    /// 任何 16 字节都能解读为 inode
    pub(crate) fn decode(bytes: &[u8]) -> Self {
        let kind = if bytes[0] & DIRECTORY_BIT != 0 {
            DiskInodeKind::Directory
        } else {
            DiskInodeKind::File
        };

        let mut pointers = [None; DIRECT_POINTERS];
        for (i, pointer) in pointers.iter_mut().enumerate() {
            let byte = bytes[12 + i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
            *pointer = (nibble != 0).then_some(BlockId::new(nibble as usize));
        }

        Self {
            kind,
            permissions: BitFlags::from_bits_truncate(bytes[0]),
            size: u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]),
            created: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            modified: u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            pointers,
        }
    }
}
