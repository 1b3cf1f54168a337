pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod trigger;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliArgs;

pub use crate::adapters::{ConsoleDispatcher, PostgrestOrderStore, ResendDispatcher};
pub use crate::config::ReportConfig;
pub use crate::core::period::CycleSchedule;
pub use crate::core::report::{
    OutcomeKind, ReportEngine, ReportOutcome, ReportRun, ReportSettings, ReportState,
};
pub use crate::utils::error::{ReportError, Result};
