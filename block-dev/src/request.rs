use derive_more::{Display, From, Into};
use tokio::sync::oneshot;

use crate::{DiskError, SectorId};

/// 请求编号，在控制器内单调递增，不会重复
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct RequestId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskOp {
    Read { sector: SectorId },
    Write { sector: SectorId, data: Vec<u8> },
}

/// 排队中的磁盘请求，附带一个完成句柄
#[derive(Debug)]
pub struct DiskRequest {
    pub id: RequestId,
    pub op: DiskOp,
    reply: oneshot::Sender<Completion>,
}

/// 请求完成的记录，读请求携带扇区内容，写请求为空
#[derive(Debug)]
pub struct Completion {
    pub id: RequestId,
    pub result: Result<Vec<u8>, DiskError>,
}

impl DiskRequest {
    pub fn new(id: RequestId, op: DiskOp) -> (Self, oneshot::Receiver<Completion>) {
        let (reply, rx) = oneshot::channel();
        (Self { id, op, reply }, rx)
    }

    /// 交还结果；发起者已放弃等待时直接丢弃
    pub fn complete(self, result: Result<Vec<u8>, DiskError>) {
        let completion = Completion {
            id: self.id,
            result,
        };
        if self.reply.send(completion).is_err() {
            log::debug!("request {} completed after its requester gave up", self.id);
        }
    }
}
