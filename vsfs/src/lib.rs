//! # VSFS
//!
//! 构建在模拟磁盘之上的极简类 POSIX 文件系统，磁盘上的每一位都可以检视。
//!
//! 磁盘布局：
//! 超级块 | 索引节点位图 | 数据块位图 | 索引节点表 | 数据块区域

/* vsfs 的整体架构，自上而下 */

// 操作层：open/close/read/write/mkdir/rmdir/unlink/listing
mod vfs;

// 路径解析
mod path;

// 文件描述符表
mod fd;

// 文件系统管理层：格式化、挂载、inode 定位与空间分配
mod fs;

// 磁盘数据结构层：表示磁盘文件系统的数据结构
pub mod layout;

// 块读写层：块与扇区之间的拆分与重组
mod block_io;

mod error;

pub mod bits;
pub mod charset;

pub use self::{
    block_io::{Block, BlockId, BlockIo},
    error::{Error, Result},
    fd::{AccessMode, FdTable, FileDescriptor, OpenFlag},
    fs::{FormatOptions, FsLayout, Usage, Vsfs, ROOT_INODE},
    layout::{DirEntry, DiskInode, DiskInodeKind, Permission, SuperBlock},
    path::Path,
    vfs::Stat,
};

pub use block_dev::{DiskConfig, DiskController, DiskError, DiskGeometry};

pub const MAGIC: u8 = 0x56;

/// 目录项与 inode 都占 128 位
pub const ENTRY_BITS: usize = 128;

/// 每个 inode 的直接索引个数，也是文件大小的上限（块数）
pub const DIRECT_POINTERS: usize = 8;

/// 文件名最长字符数
pub const NAME_MAX_LEN: usize = 13;

pub const SUPER_BLOCK: BlockId = BlockId::new(0);
pub const INODE_BITMAP_BLOCK: BlockId = BlockId::new(1);
pub const DATA_BITMAP_BLOCK: BlockId = BlockId::new(2);
pub const INODE_TABLE_BLOCK: BlockId = BlockId::new(3);
