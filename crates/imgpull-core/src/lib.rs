pub mod config;
pub mod logging;

// Pipeline stages, in the order a record goes through them.
pub mod records;
pub mod naming;
pub mod downloader;
pub mod storage;
pub mod batch;
