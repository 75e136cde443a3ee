//! 扇区的抽象

use derive_more::{Add, Display, From, Into};

use crate::{DiskError, DiskGeometry, Result};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Add, From, Into)]
#[repr(transparent)]
pub struct SectorId(usize);

impl core::ops::Add<usize> for SectorId {
    type Output = Self;

    fn add(self, rhs: usize) -> Self::Output {
        self + Self(rhs)
    }
}

impl SectorId {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }
}

/// 扇区数组，磁盘上的全部数据。
///
/// 只有服务循环会持有它，其余组件都得经过请求队列。
#[derive(Debug, Clone)]
pub struct SectorStore {
    geometry: DiskGeometry,
    sectors: Vec<Box<[u8]>>,
}

impl SectorStore {
    pub fn new(geometry: DiskGeometry) -> Self {
        let sectors = (0..geometry.total_sectors())
            .map(|_| vec![0; geometry.sector_bytes()].into_boxed_slice())
            .collect();

        Self { geometry, sectors }
    }

    /// 由按扇区顺序排列的原始镜像构建
    pub fn from_image(geometry: DiskGeometry, image: &[u8]) -> Result<Self> {
        geometry.validate()?;
        if image.len() != geometry.total_sectors() * geometry.sector_bytes() {
            return Err(DiskError::InvalidGeometry(
                "image length does not match the disk geometry",
            ));
        }

        let sectors = image
            .chunks_exact(geometry.sector_bytes())
            .map(Box::from)
            .collect();

        Ok(Self { geometry, sectors })
    }

    #[inline]
    pub fn geometry(&self) -> DiskGeometry {
        self.geometry
    }

    pub fn get(&self, id: SectorId) -> Result<&[u8]> {
        self.geometry.check_sector(id)?;
        Ok(&self.sectors[usize::from(id)])
    }

    pub fn set(&mut self, id: SectorId, data: &[u8]) -> Result<()> {
        self.geometry.check_sector(id)?;
        self.geometry.check_payload(data.len())?;
        self.sectors[usize::from(id)].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let store = SectorStore::new(DiskGeometry::default());
        for i in 0..16 {
            assert!(store.get(SectorId::new(i)).unwrap().iter().all(|&b| b == 0));
        }
        assert_eq!(
            Err(DiskError::InvalidSector {
                sector: SectorId::new(16),
                total: 16
            }),
            store.get(SectorId::new(16)).map(<[u8]>::to_vec)
        );
    }

    #[test]
    fn set_then_get() {
        let mut store = SectorStore::new(DiskGeometry::default());
        let data: Vec<u8> = (0..16).collect();
        store.set(SectorId::new(3), &data).unwrap();
        assert_eq!(&data[..], store.get(SectorId::new(3)).unwrap());
        assert!(matches!(
            store.set(SectorId::new(3), &data[..8]),
            Err(DiskError::SectorUnderflow { .. })
        ));
    }

    #[test]
    fn image_length_must_match() {
        let geometry = DiskGeometry::new(64, 2, 4);
        assert!(SectorStore::from_image(geometry, &[0; 63]).is_err());

        let image: Vec<u8> = (0..64).collect();
        let store = SectorStore::from_image(geometry, &image).unwrap();
        assert_eq!(&image[8..16], store.get(SectorId::new(1)).unwrap());
    }
}
