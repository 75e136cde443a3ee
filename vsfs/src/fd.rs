//! # 文件描述符层
//!
//! 内存中的文件描述符表只会增长：关闭描述符只是把槽位置空，编号不会被复用。

use enumflags2::{bitflags, BitFlags};

use crate::{Error, Permission, Result};

#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    /// 只读
    RDONLY = 0b0001,
    /// 只写
    WRONLY = 0b0010,
    /// 读写兼备
    RDWR   = 0b0100,
    /// 创建文件，文件已存在则报错
    CREAT  = 0b1000,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    /// 三个访问标志必须恰好出现一个
    pub fn from_flags(flags: BitFlags<OpenFlag>) -> Result<Self> {
        let access = flags & (OpenFlag::RDONLY | OpenFlag::WRONLY | OpenFlag::RDWR);
        match access.exactly_one() {
            Some(OpenFlag::RDONLY) => Ok(Self::ReadOnly),
            Some(OpenFlag::WRONLY) => Ok(Self::WriteOnly),
            Some(OpenFlag::RDWR) => Ok(Self::ReadWrite),
            _ => Err(Error::OpenFlag),
        }
    }

    #[inline]
    pub fn readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    #[inline]
    pub fn writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }

    /// 以该模式打开具有 `permissions` 权限的文件是否被允许。
    ///
    /// 同时具备读写权限的文件总是可以打开；
    /// 只有写权限的文件可以只写打开，但不能读写打开。
    pub fn permits(self, permissions: BitFlags<Permission>) -> bool {
        if permissions.contains(Permission::Read | Permission::Write) {
            return true;
        }

        match self {
            Self::ReadOnly => permissions.contains(Permission::Read),
            Self::WriteOnly => permissions.contains(Permission::Write),
            Self::ReadWrite => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDescriptor {
    pub inode: u32,
    pub mode: AccessMode,
}

#[derive(Debug, Default)]
pub struct FdTable {
    slots: Vec<Option<FileDescriptor>>,
}

impl FdTable {
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// 追加描述符，返回其编号
    pub fn push(&mut self, fd: FileDescriptor) -> usize {
        self.slots.push(Some(fd));
        self.slots.len() - 1
    }

    /// 越界或已关闭的描述符都无效
    pub fn get(&self, fd: usize) -> Result<FileDescriptor> {
        self.slots
            .get(fd)
            .copied()
            .flatten()
            .ok_or(Error::InvalidFileDescriptor(fd))
    }

    /// 重复关闭不报错，越界才报错
    pub fn close(&mut self, fd: usize) -> Result<()> {
        let slot = self
            .slots
            .get_mut(fd)
            .ok_or(Error::InvalidFileDescriptor(fd))?;
        *slot = None;
        Ok(())
    }

    /// 表的长度，包括已关闭的槽位
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn open_descriptors(&self) -> Vec<(usize, FileDescriptor)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(fd, slot)| slot.map(|desc| (fd, desc)))
            .collect()
    }
}
