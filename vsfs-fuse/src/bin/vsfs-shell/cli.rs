use std::path::PathBuf;
use std::time::Duration;

use block_dev::{DiskConfig, DiskGeometry};
use clap::Parser;

#[derive(Parser)]
pub struct Cli {
    /// Sector size in bits, a multiple of 8
    #[arg(long, default_value_t = 128)]
    pub sector_size: usize,

    #[arg(long, default_value_t = 1)]
    pub sectors_per_block: usize,

    /// Number of blocks, at most 16
    #[arg(long, default_value_t = 16)]
    pub total_blocks: usize,

    /// Blocks reserved for the inode table
    #[arg(long)]
    pub inode_blocks: Option<u8>,

    /// How long a disk request may wait for the servicing loop
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Simulated seek time of every disk request
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,

    /// Mount this disk image instead of formatting a blank disk
    #[arg(long, short)]
    pub image: Option<PathBuf>,

    /// Write the disk image here after the script has run
    #[arg(long, short)]
    pub save: Option<PathBuf>,

    /// Script file, read from stdin when omitted
    pub script: Option<PathBuf>,
}

impl Cli {
    pub fn disk_config(&self) -> DiskConfig {
        DiskConfig::new(DiskGeometry::new(
            self.sector_size,
            self.sectors_per_block,
            self.total_blocks,
        ))
        .with_timeout(Duration::from_millis(self.timeout_ms))
        .with_latency(Duration::from_millis(self.latency_ms))
    }
}
