
pub mod script;

use std::fs;
use std::io;
use std::path::Path;

use block_dev::{DiskConfig, DiskController, DiskError, SectorStore};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Disk(#[from] DiskError),

    #[error(transparent)]
    Fs(#[from] vsfs::Error),

    #[error("{0}")]
    Parse(String),
}

/// 按扇区顺序把整个磁盘写入镜像文件
pub async fn save_image(disk: &DiskController, path: &Path) -> Result<(), ShellError> {
    let image = disk.snapshot().await?;
    fs::write(path, &image)?;
    log::info!("saved {} bytes to {}", image.len(), path.display());
    Ok(())
}

/// 由镜像文件启动磁盘控制器，镜像长度必须与几何参数相符。
///
/// 控制器的服务循环是 tokio 任务，须在运行时内调用。
pub fn load_image(path: &Path, config: DiskConfig) -> Result<DiskController, ShellError> {
    let image = fs::read(path)?;
    let store = SectorStore::from_image(config.geometry, &image)?;
    log::info!("loaded {} bytes from {}", image.len(), path.display());
    Ok(DiskController::with_store(config, store)?)
}
