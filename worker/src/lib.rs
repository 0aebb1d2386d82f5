pub mod client;
pub mod config;
pub mod worker;

pub use client::CoordinatorClient;
pub use config::WorkerConfig;
pub use worker::{ExitReason, Worker, WorkerSummary};
