mod cli;

use std::fs;
use std::io;

use block_dev::DiskController;
use clap::Parser;
use cli::Cli;
use vsfs::{FormatOptions, Vsfs};
use vsfs_fuse::script::{self, Command};
use vsfs_fuse::{load_image, save_image, ShellError};

#[tokio::main]
async fn main() -> Result<(), ShellError> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.disk_config();

    let (disk, fs) = match &cli.image {
        Some(image) => {
            let disk = load_image(image, config)?;
            (disk.clone(), Vsfs::mount(disk).await?)
        }
        None => {
            let disk = DiskController::new(config)?;
            let options = FormatOptions {
                inode_blocks: cli.inode_blocks,
            };
            (disk.clone(), Vsfs::format(disk, options).await?)
        }
    };

    let source = match &cli.script {
        Some(path) => fs::read_to_string(path)?,
        None => io::read_to_string(io::stdin())?,
    };

    for (number, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        println!("> {line}");

        let command: Command = match line.parse() {
            Ok(command) => command,
            Err(err) => {
                log::warn!("line {}: {err}", number + 1);
                println!("error: {err}");
                continue;
            }
        };
        match script::execute(&fs, &command).await {
            Ok(out) => print!("{out}"),
            Err(err) => {
                log::warn!("line {}: {line:?} failed: {err}", number + 1);
                println!("error: {err}");
            }
        }
    }

    let stats = disk.stats();
    log::info!("disk serviced {} reads, {} writes", stats.reads, stats.writes);

    if let Some(path) = &cli.save {
        save_image(&disk, path).await?;
    }

    Ok(())
}
