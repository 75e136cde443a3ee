use std::time::Duration;

use crate::{DiskError, Result, SectorId};

/// 磁盘的几何参数，格式化之前给定，之后不可更改。
///
/// 扇区大小以**位**计，必须是8的倍数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    /// 扇区大小（位）
    pub sector_size: usize,
    /// 每块包含的扇区数
    pub sectors_per_block: usize,
    /// 磁盘总块数
    pub total_blocks: usize,
}

impl Default for DiskGeometry {
    fn default() -> Self {
        Self::new(128, 1, 16)
    }
}

impl DiskGeometry {
    pub const fn new(sector_size: usize, sectors_per_block: usize, total_blocks: usize) -> Self {
        Self {
            sector_size,
            sectors_per_block,
            total_blocks,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sector_size == 0 || self.sector_size % 8 != 0 {
            return Err(DiskError::InvalidGeometry(
                "sector size must be a positive multiple of 8 bits",
            ));
        }
        if self.sectors_per_block == 0 {
            return Err(DiskError::InvalidGeometry(
                "a block needs at least one sector",
            ));
        }
        if self.total_blocks == 0 {
            return Err(DiskError::InvalidGeometry("a disk needs at least one block"));
        }
        Ok(())
    }

    /// 每个扇区的字节数
    #[inline]
    pub const fn sector_bytes(&self) -> usize {
        self.sector_size / 8
    }

    /// 块大小（位）
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.sector_size * self.sectors_per_block
    }

    #[inline]
    pub const fn block_bytes(&self) -> usize {
        self.block_size() / 8
    }

    #[inline]
    pub const fn total_sectors(&self) -> usize {
        self.sectors_per_block * self.total_blocks
    }

    /// 块号所对应的连续扇区
    pub fn sectors_of(&self, block: usize) -> impl Iterator<Item = SectorId> {
        let start = block * self.sectors_per_block;
        (start..start + self.sectors_per_block).map(SectorId::new)
    }

    pub fn check_sector(&self, sector: SectorId) -> Result<()> {
        if usize::from(sector) < self.total_sectors() {
            Ok(())
        } else {
            Err(DiskError::InvalidSector {
                sector,
                total: self.total_sectors(),
            })
        }
    }

    /// 写入的数据必须恰好填满一个扇区
    pub fn check_payload(&self, len: usize) -> Result<()> {
        let capacity = self.sector_bytes();
        match len.cmp(&capacity) {
            core::cmp::Ordering::Greater => Err(DiskError::SectorOverflow { len, capacity }),
            core::cmp::Ordering::Less => Err(DiskError::SectorUnderflow { len, capacity }),
            core::cmp::Ordering::Equal => Ok(()),
        }
    }
}

/// 磁盘控制器的配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskConfig {
    pub geometry: DiskGeometry,
    /// 等待请求完成的上限，超时报 [`DiskError::ServiceTimeout`]
    pub service_timeout: Duration,
    /// 服务循环处理每个请求前的模拟寻道延迟，不影响结果
    pub service_latency: Duration,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self::new(DiskGeometry::default())
    }
}

impl DiskConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub const fn new(geometry: DiskGeometry) -> Self {
        Self {
            geometry,
            service_timeout: Self::DEFAULT_TIMEOUT,
            service_latency: Duration::ZERO,
        }
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.service_timeout = timeout;
        self
    }

    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.service_latency = latency;
        self
    }
}
