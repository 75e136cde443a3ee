use std::time::Duration;

use thiserror::Error;

use crate::{RequestId, SectorId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiskError {
    #[error("invalid disk geometry: {0}")]
    InvalidGeometry(&'static str),

    #[error("sector {sector} is out of range, the disk has {total} sectors")]
    InvalidSector { sector: SectorId, total: usize },

    #[error("payload of {len} bytes overflows a {capacity}-byte sector")]
    SectorOverflow { len: usize, capacity: usize },

    #[error("payload of {len} bytes underflows a {capacity}-byte sector")]
    SectorUnderflow { len: usize, capacity: usize },

    #[error("request {request} was not serviced within {timeout:?}")]
    ServiceTimeout { request: RequestId, timeout: Duration },

    #[error("the disk servicing loop has stopped")]
    ControllerClosed,
}
