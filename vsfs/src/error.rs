use block_dev::DiskError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Disk(#[from] DiskError),

    /* 寻址 */
    #[error("block {block} is out of range, the disk has {total} blocks")]
    InvalidBlockAddress { block: usize, total: usize },

    #[error("block pointer {0} does not fit in a nibble")]
    InvalidBlockPointer(usize),

    #[error("an inode holds exactly 8 block pointers, got {0}")]
    InvalidBlockPointerCount(usize),

    #[error("bit {index} is outside a bitmap of {count} bits")]
    BitmapIndex { index: usize, count: usize },

    #[error("inode {0} is out of range")]
    InvalidInode(u32),

    #[error("bad file descriptor {0}")]
    InvalidFileDescriptor(usize),

    #[error("invalid path {0:?}")]
    InvalidPath(String),

    #[error("{0:?} is not a directory")]
    InvalidDirectoryPath(String),

    #[error("file name {0:?} is longer than 13 characters")]
    FilenameTooLong(String),

    #[error("character {0:?} has no on-disk encoding")]
    InvalidCharacter(char),

    /* 容量 */
    #[error("{len} bytes overflow a {capacity}-byte block")]
    BlockOverflow { len: usize, capacity: usize },

    #[error("{len} bytes underflow a {capacity}-byte block")]
    BlockUnderflow { len: usize, capacity: usize },

    #[error("{len} bits exceed the file size limit of {capacity} bits")]
    FileOverflow { len: usize, capacity: usize },

    #[error("no free inode left")]
    InodeOverflow,

    #[error("no free data block left")]
    DataBlockOverflow,

    #[error("every block pointer of the directory is in use")]
    DirectoryOverflow,

    #[error("{entries} entries overflow a directory block of {capacity} entries")]
    DirectoryBlockOverflow { entries: usize, capacity: usize },

    /* 语义冲突 */
    #[error("{0:?} already exists")]
    NameAlreadyExists(String),

    #[error("directory {0:?} is not empty")]
    DirectoryNotEmpty(String),

    #[error("{0:?} is a directory, use rmdir")]
    UnlinkDirectory(String),

    #[error("file descriptor {0} refers to a directory")]
    OpenDirectory(usize),

    #[error("exactly one of RDONLY, WRONLY and RDWR is required")]
    OpenFlag,

    #[error("creating a file requires a mode")]
    Mode,

    #[error("access denied")]
    AccessDenied,

    /* 编码 */
    #[error("{0:?} is not a binary digit")]
    InvalidBinaryString(char),

    #[error("{blocks} blocks were given {data} buffers")]
    BadDataLength { blocks: usize, data: usize },

    #[error("expected a chunk of {expected} bytes, got {actual}")]
    InvalidChunkSize { expected: usize, actual: usize },

    /* 格式化与挂载 */
    #[error("invalid file system geometry: {0}")]
    InvalidGeometry(&'static str),

    #[error("bad magic number {0:#04x}")]
    BadMagic(u8),
}
