//! `imgpull` – fetch every image in the input file.

use anyhow::Result;
use imgpull_core::batch;
use imgpull_core::config::ImgpullConfig;
use imgpull_core::downloader::FetchOptions;
use std::io;

pub fn run_download(cfg: &ImgpullConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = batch::run_batch(cfg, &FetchOptions::default(), &mut out)?;
    tracing::info!(
        "processed {} record(s) from {}",
        summary.processed(),
        cfg.input_path.display()
    );
    Ok(())
}
