//! # 模拟磁盘
//!
//! 以**扇区**为单位存储数据的模拟块设备。
//! 所有读写都以请求的形式排进 [`DiskController`] 的队列，
//! 由唯一的服务循环按先进先出的顺序逐个执行，
//! 执行完毕后通过请求自带的完成句柄把结果交还给发起者。
//!
//! 上层（文件系统）只持有 [`DiskController`]，从不直接触碰扇区数组。

mod controller;
mod error;
mod geometry;
mod request;
mod sector;

pub use self::{
    controller::{DiskController, DiskStats},
    error::DiskError,
    geometry::{DiskConfig, DiskGeometry},
    request::{Completion, DiskOp, DiskRequest, RequestId},
    sector::{SectorId, SectorStore},
};

pub type Result<T> = core::result::Result<T, DiskError>;
