//! # 操作层
//!
//! 类 POSIX 的文件系统接口。除 `close` 外都是异步的，
//! 涉及元数据的操作在同一个临界区内完成：先检查容量，再写入结构，最后翻转位图。

use enumflags2::BitFlags;

use crate::fd::{AccessMode, FileDescriptor, OpenFlag};
use crate::fs::now;
use crate::layout::{self, DirEntry, DiskInode, DiskInodeKind, Permission};
use crate::{bits, BlockId, Error, Path, Result, Vsfs, DIRECT_POINTERS, ENTRY_BITS};

/// 文件或目录的元信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub inode: u32,
    pub kind: DiskInodeKind,
    pub permissions: BitFlags<Permission>,
    /// 大小（位）
    pub size: u32,
    pub created: u32,
    pub modified: u32,
    pub blocks: Vec<BlockId>,
}

/// 新目录项的落脚处
#[derive(Debug, Clone, Copy)]
enum EntrySlot {
    /// 父目录已有块中的空闲项
    Existing { block: BlockId, index: usize },
    /// 父目录的空闲指针槽位，需要新分配一块
    NewBlock { pointer: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Unlink,
    Rmdir,
}

impl Vsfs {
    /// 打开文件，返回文件描述符。
    ///
    /// 带 [`OpenFlag::CREAT`] 时创建新文件，目标已存在则报错，`mode` 为新文件的权限；
    /// 否则打开已有的文件，并按其权限检查访问模式。
    pub async fn open(
        &self,
        path: &str,
        flags: BitFlags<OpenFlag>,
        mode: Option<BitFlags<Permission>>,
    ) -> Result<usize> {
        let access = AccessMode::from_flags(flags)?;

        let inode = {
            let _meta = self.meta.lock().await;
            if flags.contains(OpenFlag::CREAT) {
                let mode = mode.ok_or(Error::Mode)?;
                self.create(path, DiskInodeKind::File, mode).await?
            } else {
                let inode_id = self.resolve(path, false).await?;
                let inode = self.read_inode(inode_id).await?;
                if !access.permits(inode.permissions) {
                    return Err(Error::AccessDenied);
                }
                inode_id
            }
        };

        let fd = self.fds.lock().push(FileDescriptor {
            inode,
            mode: access,
        });
        log::info!("open {path:?} as fd {fd} ({access:?})");
        Ok(fd)
    }

    pub fn close(&self, fd: usize) -> Result<()> {
        self.fds.lock().close(fd)?;
        log::info!("close fd {fd}");
        Ok(())
    }

    /// 读出文件全部已分配块的原始字节
    pub async fn read(&self, fd: usize) -> Result<Vec<u8>> {
        let desc = self.fds.lock().get(fd)?;
        if !desc.mode.readable() {
            return Err(Error::AccessDenied);
        }

        let _meta = self.meta.lock().await;
        let inode = self.read_inode(desc.inode).await?;
        if inode.is_dir() {
            return Err(Error::OpenDirectory(fd));
        }

        let blocks: Vec<BlockId> = inode.blocks().collect();
        let read = self
            .io
            .read_blocks(&blocks, |done, total| {
                log::trace!("read fd {fd}: {done}/{total} blocks")
            })
            .await?;

        log::info!("read fd {fd}: {} blocks", blocks.len());
        Ok(read.into_iter().flat_map(|block| block.into_bytes()).collect())
    }

    /// 以位串覆写文件的全部内容。
    ///
    /// 块数不变时原地覆写，变少时回收多余的块，变多时从数据区补足。
    pub async fn write(&self, fd: usize, data: &str) -> Result<()> {
        let desc = self.fds.lock().get(fd)?;
        let (bytes, len) = bits::pack(data)?;
        if !desc.mode.writable() {
            return Err(Error::AccessDenied);
        }

        let _meta = self.meta.lock().await;
        let mut inode = self.read_inode(desc.inode).await?;
        if inode.is_dir() {
            return Err(Error::OpenDirectory(fd));
        }

        let block_size = self.layout.block_size;
        let capacity = (DIRECT_POINTERS * block_size).min(DiskInode::MAX_SIZE as usize);
        if len > capacity {
            return Err(Error::FileOverflow { len, capacity });
        }

        let needed = len.div_ceil(block_size);
        let current: Vec<BlockId> = inode.blocks().collect();
        let mut blocks = current.clone();

        if needed > current.len() {
            let shortfall = needed - current.len();
            let free = self.layout.data_bitmap.find_free_n(&self.io, shortfall).await?;
            if free.len() < shortfall {
                return Err(Error::FileOverflow {
                    len,
                    capacity: (current.len() + free.len()) * block_size,
                });
            }
            blocks.extend(free.into_iter().map(|i| self.layout.data_start + i));
        }
        let released = blocks.split_off(needed);

        let segments: Vec<&[u8]> = bytes.chunks(self.io.block_bytes()).collect();
        self.io
            .write_blocks(&blocks, &segments, |done, total| {
                log::trace!("write fd {fd}: {done}/{total} blocks")
            })
            .await?;

        for &block in blocks.iter().skip(current.len()) {
            self.claim_data(block).await?;
        }
        for &block in &released {
            self.release_data(block).await?;
        }

        inode.pointers = [None; DIRECT_POINTERS];
        for (pointer, &block) in inode.pointers.iter_mut().zip(&blocks) {
            *pointer = Some(block);
        }
        inode.size = len as u32;
        inode.modified = now();
        self.write_inode(desc.inode, &inode).await?;

        log::info!(
            "write fd {fd}: {len} bits in {} blocks, {} released",
            blocks.len(),
            released.len()
        );
        Ok(())
    }

    /// 创建目录，初始含有 `.` 与 `..`
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        let _meta = self.meta.lock().await;
        let inode = self
            .create(path, DiskInodeKind::Directory, BitFlags::all())
            .await?;
        log::info!("mkdir {path:?} as inode {inode}");
        Ok(())
    }

    pub async fn rmdir(&self, path: &str) -> Result<()> {
        let _meta = self.meta.lock().await;
        self.remove(path, Removal::Rmdir).await
    }

    pub async fn unlink(&self, path: &str) -> Result<()> {
        let _meta = self.meta.lock().await;
        self.remove(path, Removal::Unlink).await
    }

    /// 列出目录中的全部非空闲项，包括 `.` 与 `..`
    pub async fn listing(&self, path: &str) -> Result<Vec<DirEntry>> {
        let _meta = self.meta.lock().await;
        let inode_id = self.resolve(path, false).await?;
        let inode = self.read_inode(inode_id).await?;
        if !inode.is_dir() {
            return Err(Error::InvalidDirectoryPath(path.to_owned()));
        }

        Ok(self
            .read_directory(&inode)
            .await?
            .into_iter()
            .flat_map(|(_, entries)| entries)
            .filter(|entry| !entry.is_free())
            .collect())
    }

    pub async fn stat(&self, path: &str) -> Result<Stat> {
        let _meta = self.meta.lock().await;
        let inode_id = self.resolve(path, false).await?;
        let inode = self.read_inode(inode_id).await?;

        Ok(Stat {
            inode: inode_id,
            kind: inode.kind,
            permissions: inode.permissions,
            size: inode.size,
            created: inode.created,
            modified: inode.modified,
            blocks: inode.blocks().collect(),
        })
    }

    /// 在父目录中创建新的文件或目录，返回其 inode 编号。
    ///
    /// 调用者须持有元数据锁。
    async fn create(
        &self,
        path: &str,
        kind: DiskInodeKind,
        permissions: BitFlags<Permission>,
    ) -> Result<u32> {
        let components = path.components()?;
        let Some(&name) = components.last() else {
            return Err(Error::InvalidPath(path.to_owned()));
        };
        if name == "." || name == ".." {
            return Err(Error::InvalidPath(path.to_owned()));
        }
        DirEntry::check_name(name)?;

        let parent_id = self.resolve(path, true).await?;
        let mut parent = self.read_inode(parent_id).await?;
        if !parent.is_dir() {
            return Err(Error::InvalidPath(path.to_owned()));
        }

        match self.resolve(path, false).await {
            Ok(_) => return Err(Error::NameAlreadyExists(path.to_owned())),
            Err(Error::InvalidPath(_)) => (),
            Err(err) => return Err(err),
        }

        // 先确认容量，失败时磁盘保持原样
        let inode_id = self.find_free_inode().await?;
        let slot = self.plan_entry(&parent).await?;
        let seed = match kind {
            DiskInodeKind::Directory => self.seed_directory(inode_id, parent_id)?,
            DiskInodeKind::File => Vec::new(),
        };
        let fresh = seed.len() + usize::from(matches!(slot, EntrySlot::NewBlock { .. }));
        let mut data = self.find_free_data(fresh).await?;

        let entry = DirEntry::new(name, inode_id);
        match slot {
            EntrySlot::Existing { block, index } => {
                let mut bytes = self.io.read_block(block).await?.into_bytes();
                let offset = index * DirEntry::SIZE;
                bytes[offset..offset + DirEntry::SIZE].copy_from_slice(&entry.to_bytes()?);
                self.io.write_block(block, &bytes).await?;
            }
            EntrySlot::NewBlock { pointer } => {
                let block = data.remove(0);
                let bytes =
                    layout::build_directory(std::slice::from_ref(&entry), self.layout.block_size)?;
                self.io.write_block(block, &bytes).await?;
                self.claim_data(block).await?;
                parent.pointers[pointer] = Some(block);
            }
        }

        let now = now();
        parent.size += ENTRY_BITS as u32;
        parent.modified = now;
        self.write_inode(parent_id, &parent).await?;

        let mut inode = DiskInode::new(kind, permissions, now);
        if kind == DiskInodeKind::Directory {
            self.io.write_blocks(&data, &seed, |_, _| ()).await?;
            for (pointer, &block) in inode.pointers.iter_mut().zip(&data) {
                *pointer = Some(block);
            }
            inode.size = (2 * ENTRY_BITS) as u32;
        }
        self.write_inode(inode_id, &inode).await?;

        self.layout
            .inode_bitmap
            .update(&self.io, inode_id as usize, true)
            .await?;
        for &block in &data {
            self.claim_data(block).await?;
        }

        log::debug!("created {path:?} ({kind:?}) as inode {inode_id} under inode {parent_id}");
        Ok(inode_id)
    }

    /// 父目录已有块中的第一个空闲项，没有则找一个空闲指针槽位
    async fn plan_entry(&self, parent: &DiskInode) -> Result<EntrySlot> {
        for (block, entries) in self.read_directory(parent).await? {
            if let Some(index) = entries.iter().position(DirEntry::is_free) {
                return Ok(EntrySlot::Existing { block, index });
            }
        }

        parent
            .free_slot()
            .map(|pointer| EntrySlot::NewBlock { pointer })
            .ok_or(Error::DirectoryOverflow)
    }

    /// 删除文件或空目录。调用者须持有元数据锁。
    async fn remove(&self, path: &str, removal: Removal) -> Result<()> {
        let components = path.components()?;
        let Some(&name) = components.last() else {
            return Err(Error::InvalidPath(path.to_owned()));
        };
        if name == "." || name == ".." {
            return Err(Error::InvalidPath(path.to_owned()));
        }

        let inode_id = self.resolve(path, false).await?;
        let inode = self.read_inode(inode_id).await?;
        match removal {
            Removal::Unlink if inode.is_dir() => {
                return Err(Error::UnlinkDirectory(path.to_owned()));
            }
            Removal::Rmdir if !inode.is_dir() => {
                return Err(Error::InvalidDirectoryPath(path.to_owned()));
            }
            Removal::Rmdir => {
                let children = self.read_directory(&inode).await?;
                if children
                    .iter()
                    .flat_map(|(_, entries)| entries)
                    .any(DirEntry::is_child)
                {
                    return Err(Error::DirectoryNotEmpty(path.to_owned()));
                }
            }
            Removal::Unlink => (),
        }

        let parent_id = self.resolve(path, true).await?;
        let mut parent = self.read_inode(parent_id).await?;
        let mut emptied = None;
        for (pointer, slot) in parent.pointers.iter().enumerate() {
            let Some(block) = *slot else { continue };
            let mut entries = self.io.read_block(block).await?.dir_entries();
            let Some(index) = entries
                .iter()
                .position(|entry| !entry.is_free() && entry.name() == name)
            else {
                continue;
            };

            entries[index] = DirEntry::default();
            if entries.iter().all(DirEntry::is_free) {
                emptied = Some((pointer, block));
            } else {
                let bytes = layout::build_directory(&entries, self.layout.block_size)?;
                self.io.write_block(block, &bytes).await?;
            }
            break;
        }

        // 父目录中变空的块随之回收
        if let Some((pointer, block)) = emptied {
            parent.pointers[pointer] = None;
            self.release_data(block).await?;
        }
        parent.size = parent.size.saturating_sub(ENTRY_BITS as u32);
        parent.modified = now();
        self.write_inode(parent_id, &parent).await?;

        for block in inode.blocks() {
            self.release_data(block).await?;
        }
        self.layout
            .inode_bitmap
            .update(&self.io, inode_id as usize, false)
            .await?;

        log::info!(
            "{removal:?} {path:?}: inode {inode_id} and {} blocks freed",
            inode.block_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use block_dev::{DiskConfig, DiskController, DiskGeometry, SectorId};

    use super::*;
    use crate::FormatOptions;

    async fn vsfs(geometry: DiskGeometry, inode_blocks: Option<u8>) -> Vsfs {
        let disk = DiskController::new(DiskConfig::new(geometry)).unwrap();
        Vsfs::format(disk, FormatOptions { inode_blocks })
            .await
            .unwrap()
    }

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(DirEntry::name).collect()
    }

    #[tokio::test]
    async fn create_then_open() {
        let fs = vsfs(DiskGeometry::new(512, 1, 16), None).await;
        let rw = OpenFlag::RDWR | OpenFlag::CREAT;

        assert_eq!(Err(Error::Mode), fs.open("/f", rw, None).await);
        let fd = fs.open("/f", rw, Some(BitFlags::all())).await.unwrap();
        assert_eq!(0, fd);
        assert_eq!(
            Err(Error::NameAlreadyExists("/f".to_owned())),
            fs.open("/f", rw, Some(BitFlags::all())).await
        );
        assert_eq!(1, fs.open("/f", OpenFlag::RDONLY.into(), None).await.unwrap());
        assert_eq!(
            Err(Error::InvalidPath("/g".to_owned())),
            fs.open("/g", OpenFlag::RDONLY.into(), None).await
        );
        assert_eq!(
            Err(Error::OpenFlag),
            fs.open("/f", OpenFlag::CREAT.into(), Some(BitFlags::all())).await
        );

        let stat = fs.stat("/f").await.unwrap();
        assert_eq!(DiskInodeKind::File, stat.kind);
        assert_eq!(0, stat.size);
        assert!(stat.blocks.is_empty());

        // 512 位的块放得下 4 个目录项
        assert_eq!(
            vec![".", "..", "f"],
            names(&fs.listing("/").await.unwrap())
        );
        assert_eq!(3 * 128, fs.stat("/").await.unwrap().size);
    }

    #[tokio::test]
    async fn access_follows_permissions() {
        let fs = vsfs(DiskGeometry::new(512, 1, 16), None).await;
        let creat = OpenFlag::WRONLY | OpenFlag::CREAT;
        let fd = fs.open("/r", creat, Some(Permission::Read.into())).await.unwrap();
        // 创建时不检查权限
        fs.write(fd, "1").await.unwrap();

        assert!(fs.open("/r", OpenFlag::RDONLY.into(), None).await.is_ok());
        assert_eq!(
            Err(Error::AccessDenied),
            fs.open("/r", OpenFlag::WRONLY.into(), None).await
        );
        assert_eq!(
            Err(Error::AccessDenied),
            fs.open("/r", OpenFlag::RDWR.into(), None).await
        );

        let ro = fs.open("/r", OpenFlag::RDONLY.into(), None).await.unwrap();
        assert_eq!(Err(Error::AccessDenied), fs.write(ro, "1").await);
        assert_eq!(Err(Error::AccessDenied), fs.read(fd).await);
    }

    #[tokio::test]
    async fn write_grows_and_shrinks() {
        let fs = vsfs(DiskGeometry::default(), None).await;
        let fd = fs
            .open("/f", OpenFlag::RDWR | OpenFlag::CREAT, Some(BitFlags::all()))
            .await
            .unwrap();

        // 根目录占用 6、7 号块，/f 的目录项占用 8 号块
        let three_blocks = "1".repeat(128 * 2 + 1);
        fs.write(fd, &three_blocks).await.unwrap();
        let stat = fs.stat("/f").await.unwrap();
        assert_eq!(257, stat.size);
        assert_eq!(
            vec![BlockId::new(9), BlockId::new(10), BlockId::new(11)],
            stat.blocks
        );

        let data = fs.read(fd).await.unwrap();
        assert_eq!(48, data.len());
        assert!(data[..32].iter().all(|&b| b == 0xFF));
        assert_eq!(0x80, data[32]);
        assert!(data[33..].iter().all(|&b| b == 0));

        fs.write(fd, "0101").await.unwrap();
        let stat = fs.stat("/f").await.unwrap();
        assert_eq!(vec![BlockId::new(9)], stat.blocks);
        assert_eq!(4, stat.size);
        assert_eq!(0x50, fs.read(fd).await.unwrap()[0]);
        assert_eq!("1111000000", fs.data_bitmap().await.unwrap());
        assert_eq!(
            &[0; 16],
            fs.dump_block(BlockId::new(10)).await.unwrap().as_bytes()
        );

        fs.write(fd, "").await.unwrap();
        assert!(fs.stat("/f").await.unwrap().blocks.is_empty());
        assert!(fs.read(fd).await.unwrap().is_empty());

        assert_eq!(Err(Error::InvalidBinaryString('2')), fs.write(fd, "102").await);
    }

    #[tokio::test]
    async fn write_reports_exhausted_data_area() {
        let fs = vsfs(DiskGeometry::default(), None).await;
        let flags = OpenFlag::RDWR | OpenFlag::CREAT;
        let a = fs.open("/a", flags, Some(BitFlags::all())).await.unwrap();
        let b = fs.open("/b", flags, Some(BitFlags::all())).await.unwrap();
        // 10 个数据块：根目录 2 块，两个目录项各 1 块，剩余 6 块
        fs.write(a, &"1".repeat(128 * 4)).await.unwrap();

        assert_eq!(
            Err(Error::FileOverflow {
                len: 128 * 3,
                capacity: 128 * 2,
            }),
            fs.write(b, &"1".repeat(128 * 3)).await
        );
        assert!(fs.stat("/b").await.unwrap().blocks.is_empty());
    }

    #[tokio::test]
    async fn directories_reject_file_operations() {
        let fs = vsfs(DiskGeometry::new(512, 1, 16), None).await;
        fs.mkdir("/d").await.unwrap();
        let fd = fs.open("/d", OpenFlag::RDWR.into(), None).await.unwrap();
        assert_eq!(Err(Error::OpenDirectory(fd)), fs.read(fd).await);
        assert_eq!(Err(Error::OpenDirectory(fd)), fs.write(fd, "1").await);
        assert_eq!(
            Err(Error::UnlinkDirectory("/d".to_owned())),
            fs.unlink("/d").await
        );

        let file = fs
            .open("/d/f", OpenFlag::WRONLY | OpenFlag::CREAT, Some(BitFlags::all()))
            .await
            .unwrap();
        fs.close(file).unwrap();
        assert_eq!(
            Err(Error::InvalidDirectoryPath("/d/f".to_owned())),
            fs.rmdir("/d/f").await
        );
        assert_eq!(
            Err(Error::InvalidDirectoryPath("/d/f".to_owned())),
            fs.listing("/d/f").await
        );
        assert_eq!(
            Err(Error::InvalidPath("/d/f/g".to_owned())),
            fs.mkdir("/d/f/g").await
        );
        assert_eq!(
            Err(Error::InvalidPath("/d/f/g".to_owned())),
            fs.stat("/d/f/g").await
        );
    }

    #[tokio::test]
    async fn remove_releases_everything() {
        let fs = vsfs(DiskGeometry::new(512, 1, 16), None).await;
        fs.mkdir("/d").await.unwrap();
        let fd = fs
            .open("/d/f", OpenFlag::RDWR | OpenFlag::CREAT, Some(BitFlags::all()))
            .await
            .unwrap();
        fs.write(fd, &"1".repeat(1024)).await.unwrap();

        assert_eq!(
            vec![".", "..", "f"],
            names(&fs.listing("/d").await.unwrap())
        );
        let usage = fs.usage().await.unwrap();
        assert_eq!(3, usage.inodes_used);
        assert_eq!(4, usage.data_used);

        assert_eq!(
            Err(Error::DirectoryNotEmpty("/d".to_owned())),
            fs.rmdir("/d").await
        );
        fs.unlink("/d/f").await.unwrap();
        assert_eq!(vec![".", ".."], names(&fs.listing("/d").await.unwrap()));
        assert_eq!(256, fs.stat("/d").await.unwrap().size);

        fs.rmdir("/d").await.unwrap();
        assert_eq!(vec![".", ".."], names(&fs.listing("/").await.unwrap()));
        let usage = fs.usage().await.unwrap();
        assert_eq!(1, usage.inodes_used);
        assert_eq!(1, usage.data_used);
        assert_eq!(
            Err(Error::InvalidPath("/d".to_owned())),
            fs.rmdir("/d").await
        );

        for path in ["/", "/.", "/.."] {
            assert_eq!(Err(Error::InvalidPath(path.to_owned())), fs.rmdir(path).await);
        }
    }

    #[tokio::test]
    async fn emptied_directory_block_is_released() {
        // 128 位的块只放得下一个目录项，删除后整块回收
        let fs = vsfs(DiskGeometry::default(), None).await;
        fs.mkdir("/a").await.unwrap();
        // 父目录新增一块，新目录的 `.` 与 `..` 各占一块
        assert_eq!(5, fs.usage().await.unwrap().data_used);
        let root = fs.stat("/").await.unwrap();
        assert_eq!(3, root.blocks.len());

        fs.rmdir("/a").await.unwrap();
        let root = fs.stat("/").await.unwrap();
        assert_eq!(vec![BlockId::new(6), BlockId::new(7)], root.blocks);
        assert_eq!(256, root.size);
        assert_eq!("1100000000", fs.data_bitmap().await.unwrap());
    }

    #[tokio::test]
    async fn failed_create_leaves_disk_untouched() {
        // 一块 inode 表，128 位时只有一个 inode，根目录占用
        let fs = vsfs(DiskGeometry::default(), Some(1)).await;
        let before = fs.disk().snapshot().await.unwrap();

        assert_eq!(Err(Error::InodeOverflow), fs.mkdir("/a").await);
        assert_eq!(
            Err(Error::InodeOverflow),
            fs.open("/f", OpenFlag::RDWR | OpenFlag::CREAT, Some(BitFlags::all()))
                .await
        );
        assert_eq!(before, fs.disk().snapshot().await.unwrap());
        assert!(fs.open_descriptors().is_empty());
    }

    #[tokio::test]
    async fn corrupt_pointer_is_rejected_before_writing() {
        let disk = DiskController::new(DiskConfig::new(DiskGeometry::default())).unwrap();
        let fs = Vsfs::format(disk.clone(), FormatOptions::default())
            .await
            .unwrap();
        let fd = fs
            .open("/f", OpenFlag::RDWR | OpenFlag::CREAT, Some(BitFlags::all()))
            .await
            .unwrap();
        fs.close(fd).unwrap();

        // inode 1 独占扇区 4，第 12 字节高 4 位是第一个块指针，改指向位图块
        let mut sector = disk.read_sector(SectorId::new(4)).await.unwrap();
        sector[12] = 0x10;
        disk.write_sector(SectorId::new(4), &sector).await.unwrap();

        let fs = Vsfs::mount(disk).await.unwrap();
        let before = fs.disk().snapshot().await.unwrap();

        assert_eq!(Err(Error::InvalidBlockPointer(1)), fs.unlink("/f").await);
        assert_eq!(
            Err(Error::InvalidBlockPointer(1)),
            fs.open("/f", OpenFlag::RDWR.into(), None).await
        );
        assert_eq!(Err(Error::InvalidBlockPointer(1)), fs.stat("/f").await.map(drop));
        assert_eq!(before, fs.disk().snapshot().await.unwrap());
        // 根目录的 `.`、`..` 与 `f` 各占一块
        assert_eq!("1110000000", fs.data_bitmap().await.unwrap());
        assert_eq!(vec![".", "..", "f"], names(&fs.listing("/").await.unwrap()));
    }

    #[tokio::test]
    async fn new_entry_needs_a_data_block() {
        // 8 个 inode，数据区 5 块，根目录占 2 块
        let fs = vsfs(DiskGeometry::default(), Some(8)).await;
        let flags = OpenFlag::WRONLY | OpenFlag::CREAT;
        for i in 0..3 {
            fs.open(&format!("/f{i}"), flags, Some(BitFlags::all()))
                .await
                .unwrap();
        }
        assert_eq!(
            Err(Error::DataBlockOverflow),
            fs.open("/f3", flags, Some(BitFlags::all())).await
        );
        assert_eq!(Err(Error::InvalidPath("/f3".to_owned())), fs.resolve("/f3", false).await);
    }

    #[tokio::test]
    async fn directory_overflow() {
        let fs = vsfs(DiskGeometry::default(), None).await;
        // 8 个指针都指向已满的块
        let mut full = DiskInode::new(DiskInodeKind::Directory, BitFlags::all(), 0);
        full.pointers = [Some(BlockId::new(6)); DIRECT_POINTERS];
        assert!(matches!(
            fs.plan_entry(&full).await,
            Err(Error::DirectoryOverflow)
        ));

        let root = fs.inode(0).await.unwrap();
        assert!(matches!(
            fs.plan_entry(&root).await,
            Ok(EntrySlot::NewBlock { pointer: 2 })
        ));
    }

    #[tokio::test]
    async fn bad_names() {
        let fs = vsfs(DiskGeometry::new(512, 1, 16), None).await;
        assert_eq!(
            Err(Error::FilenameTooLong("fourteen_chars".to_owned())),
            fs.mkdir("/fourteen_chars").await
        );
        assert_eq!(Err(Error::InvalidCharacter('€')), fs.mkdir("/€").await);
        assert_eq!(Err(Error::InvalidPath("/".to_owned())), fs.mkdir("/").await);
        assert_eq!(Err(Error::InvalidPath("x".to_owned())), fs.mkdir("x").await);
        assert_eq!(
            Err(Error::InvalidPath("/no/dir".to_owned())),
            fs.mkdir("/no/dir").await
        );
    }
}
