//! # 磁盘控制器
//!
//! 控制器独占扇区数组与请求队列：
//!
//! 1. 调用者构造请求、分配编号并放入队列，随即等待完成句柄；
//! 2. 唯一的服务循环依次取出队首请求，对扇区数组执行后回填结果；
//! 3. 调用者拿到带有自己编号的完成记录后返回。
//!
//! 队列是先进先出的，服务循环一次只处理一个请求，
//! 因此请求的完成顺序与提交顺序一致。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time;

use crate::{
    DiskConfig, DiskError, DiskGeometry, DiskOp, DiskRequest, RequestId, Result, SectorId,
    SectorStore,
};

#[derive(Debug, Clone)]
pub struct DiskController {
    config: DiskConfig,
    queue: mpsc::UnboundedSender<DiskRequest>,
    next_id: Arc<AtomicU64>,
    stats: Arc<Counters>,
}

/// 服务循环处理过的请求数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiskStats {
    pub reads: u64,
    pub writes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicU64,
    writes: AtomicU64,
}

impl DiskController {
    /// 以全零的扇区数组启动控制器。
    ///
    /// 服务循环作为 tokio 任务启动，因此必须在运行时内调用。
    pub fn new(config: DiskConfig) -> Result<Self> {
        config.geometry.validate()?;
        Self::with_store(config, SectorStore::new(config.geometry))
    }

    /// 以已有的扇区数组启动控制器
    pub fn with_store(config: DiskConfig, store: SectorStore) -> Result<Self> {
        config.geometry.validate()?;
        if store.geometry() != config.geometry {
            return Err(DiskError::InvalidGeometry(
                "sector store was built for a different geometry",
            ));
        }

        let (queue, requests) = mpsc::unbounded_channel();
        let stats = Arc::new(Counters::default());
        tokio::spawn(service(
            store,
            requests,
            config.service_latency,
            stats.clone(),
        ));
        log::debug!("disk controller started with {:?}", config.geometry);

        Ok(Self {
            config,
            queue,
            next_id: Arc::new(AtomicU64::new(0)),
            stats,
        })
    }

    #[inline]
    pub fn geometry(&self) -> DiskGeometry {
        self.config.geometry
    }

    #[inline]
    pub fn config(&self) -> DiskConfig {
        self.config
    }

    pub fn stats(&self) -> DiskStats {
        DiskStats {
            reads: self.stats.reads.load(Ordering::Relaxed),
            writes: self.stats.writes.load(Ordering::Relaxed),
        }
    }

    pub async fn read_sector(&self, sector: SectorId) -> Result<Vec<u8>> {
        self.geometry().check_sector(sector)?;
        self.submit(DiskOp::Read { sector }).await
    }

    pub async fn write_sector(&self, sector: SectorId, data: &[u8]) -> Result<()> {
        let geometry = self.geometry();
        geometry.check_sector(sector)?;
        geometry.check_payload(data.len())?;
        self.submit(DiskOp::Write {
            sector,
            data: data.to_vec(),
        })
        .await
        .map(drop)
    }

    /// 按扇区顺序读出整个磁盘
    pub async fn snapshot(&self) -> Result<Vec<u8>> {
        let geometry = self.geometry();
        let mut image = Vec::with_capacity(geometry.total_sectors() * geometry.sector_bytes());
        for sector in 0..geometry.total_sectors() {
            image.extend(self.read_sector(SectorId::new(sector)).await?);
        }
        Ok(image)
    }

    async fn submit(&self, op: DiskOp) -> Result<Vec<u8>> {
        let id = RequestId::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (request, completion) = DiskRequest::new(id, op);
        self.queue
            .send(request)
            .map_err(|_| DiskError::ControllerClosed)?;

        let timeout = self.config.service_timeout;
        match time::timeout(timeout, completion).await {
            Ok(Ok(completion)) => {
                debug_assert_eq!(id, completion.id);
                completion.result
            }
            Ok(Err(_)) => Err(DiskError::ControllerClosed),
            Err(_) => Err(DiskError::ServiceTimeout {
                request: id,
                timeout,
            }),
        }
    }
}

/// 服务循环：队列关闭（控制器全部被丢弃）时退出
async fn service(
    mut store: SectorStore,
    mut requests: mpsc::UnboundedReceiver<DiskRequest>,
    latency: std::time::Duration,
    stats: Arc<Counters>,
) {
    while let Some(request) = requests.recv().await {
        if !latency.is_zero() {
            time::sleep(latency).await;
        }

        let result = match &request.op {
            DiskOp::Read { sector } => {
                stats.reads.fetch_add(1, Ordering::Relaxed);
                log::trace!("request {}: read sector {sector}", request.id);
                store.get(*sector).map(<[u8]>::to_vec)
            }
            DiskOp::Write { sector, data } => {
                stats.writes.fetch_add(1, Ordering::Relaxed);
                log::trace!("request {}: write sector {sector}", request.id);
                store.set(*sector, data).map(|()| Vec::new())
            }
        };
        request.complete(result);
    }

    log::debug!("disk servicing loop stopped");
}
