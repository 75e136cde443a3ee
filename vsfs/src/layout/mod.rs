//! # 磁盘数据结构层
//!
//! vsfs 的磁盘布局：
//! 超级块 | 索引节点位图 | 数据块位图 | 索引节点表 | 数据块区域
//!
//! 所有结构按位打包，多字节字段均为大端序。

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{DiskInode, DiskInodeKind, Permission};

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::{build_directory, decode_directory, DirEntry};
