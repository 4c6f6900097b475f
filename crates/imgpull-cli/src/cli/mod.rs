//! CLI for imgpull.

mod run;

use anyhow::Result;
use clap::Parser;
use imgpull_core::config;
use std::path::PathBuf;

use run::run_download;

/// Top-level CLI: download every image listed in a CSV file.
#[derive(Debug, Parser)]
#[command(name = "imgpull")]
#[command(about = "imgpull: download product images listed in a CSV file", long_about = None)]
pub struct Cli {
    /// CSV file to read (default from config, else `images.csv`).
    /// The first row is treated as a header; field 4 holds the image URL.
    #[arg(long, short, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Directory to save images into (default from config, else `images_folder_python`).
    #[arg(long, short, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?.with_overrides(cli.input, cli.output_dir);
        tracing::debug!("effective config: {:?}", cfg);
        run_download(&cfg)
    }
}
