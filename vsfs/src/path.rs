use crate::layout::DiskInode;
use crate::{Error, Result, Vsfs, NAME_MAX_LEN, ROOT_INODE};

pub trait Path {
    fn is_absolute(&self) -> bool;

    /// 拆出绝对路径的各个部分，根目录没有任何部分。
    ///
    /// 允许一个结尾的`/`，中间不允许出现空的部分。
    fn components(&self) -> Result<Vec<&str>>;

    /// 返回路径的最后一部分，若为根目录或路径无效则返回`None`。
    fn file_name(&self) -> Option<&str>;
}

impl Path for str {
    fn is_absolute(&self) -> bool {
        self.starts_with('/')
    }

    fn components(&self) -> Result<Vec<&str>> {
        let Some(rest) = self.strip_prefix('/') else {
            return Err(Error::InvalidPath(self.to_owned()));
        };
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest.is_empty() {
            return if self == "/" {
                Ok(Vec::new())
            } else {
                Err(Error::InvalidPath(self.to_owned()))
            };
        }

        let components: Vec<&str> = rest.split('/').collect();
        for name in &components {
            if name.is_empty() {
                return Err(Error::InvalidPath(self.to_owned()));
            }
            if name.chars().count() > NAME_MAX_LEN {
                return Err(Error::FilenameTooLong((*name).to_owned()));
            }
        }

        Ok(components)
    }

    fn file_name(&self) -> Option<&str> {
        self.components().ok()?.pop()
    }
}

impl Vsfs {
    /// 从根目录逐级解析路径，返回 inode 编号。
    ///
    /// `use_parent` 为真时少走最后一步，返回父目录的 inode。
    pub(crate) async fn resolve(&self, path: &str, use_parent: bool) -> Result<u32> {
        let components = path.components()?;
        let walk = if use_parent {
            match components.split_last() {
                Some((_, parent)) => parent,
                None => return Err(Error::InvalidPath(path.to_owned())),
            }
        } else {
            &components[..]
        };

        let mut current = ROOT_INODE;
        for name in walk {
            let inode = self.read_inode(current).await?;
            // 文件不能作为中间目录
            if !inode.is_dir() {
                return Err(Error::InvalidPath(path.to_owned()));
            }
            current = self
                .lookup(&inode, name)
                .await?
                .ok_or_else(|| Error::InvalidPath(path.to_owned()))?;
        }

        log::trace!("resolve {path:?} -> inode {current}");
        Ok(current)
    }

    /// 在目录中按名字查找
    pub(crate) async fn lookup(&self, dir: &DiskInode, name: &str) -> Result<Option<u32>> {
        Ok(self
            .read_directory(dir)
            .await?
            .into_iter()
            .flat_map(|(_, entries)| entries)
            .find(|entry| !entry.is_free() && entry.name() == name)
            .map(|entry| entry.inode_id()))
    }
}

#[cfg(test)]
mod tests {
    use block_dev::{DiskConfig, DiskController, DiskGeometry};

    use super::*;
    use crate::FormatOptions;

    #[test]
    fn components() {
        assert_eq!(Ok(vec![]), "/".components());
        assert_eq!(Ok(vec!["a", "b"]), "/a/b".components());
        assert_eq!(Ok(vec!["a", "b"]), "/a/b/".components());
        assert_eq!(Ok(vec!["a", "..", "c"]), "/a/../c".components());

        for bad in ["", "a/b", "//", "/a//b", "/a/b//"] {
            assert_eq!(Err(Error::InvalidPath(bad.to_owned())), bad.components());
        }
        assert_eq!(
            Err(Error::FilenameTooLong("fourteen_chars".to_owned())),
            "/a/fourteen_chars".components()
        );
        assert!("/thirteen_char".components().is_ok());
    }

    #[test]
    fn file_name() {
        assert_eq!(Some("c"), "/a/b/c".file_name());
        assert_eq!(Some("c"), "/a/b/c/".file_name());
        assert_eq!(None, "/".file_name());
        assert_eq!(None, "a".file_name());
    }

    #[tokio::test]
    async fn resolve_from_root() {
        let disk = DiskController::new(DiskConfig::new(DiskGeometry::default())).unwrap();
        let fs = Vsfs::format(disk, FormatOptions::default()).await.unwrap();

        assert_eq!(Ok(ROOT_INODE), fs.resolve("/", false).await);
        assert_eq!(Ok(ROOT_INODE), fs.resolve("/.", false).await);
        assert_eq!(Ok(ROOT_INODE), fs.resolve("/..", false).await);
        assert_eq!(Ok(ROOT_INODE), fs.resolve("/missing", true).await);
        assert_eq!(
            Err(Error::InvalidPath("/missing".to_owned())),
            fs.resolve("/missing", false).await
        );
        assert_eq!(
            Err(Error::InvalidPath("/".to_owned())),
            fs.resolve("/", true).await
        );
    }
}
