//! Lookup pipeline services

pub mod batch_runner;
pub mod classifier;
pub mod normalizer;
pub mod orchestrator;
pub mod provider;
pub mod rehydrator;
pub mod sheet_mirror;
pub mod validator;

pub use batch_runner::run_batch;
pub use orchestrator::LookupOrchestrator;
pub use provider::{DeviceProvider, HttpDeviceProvider};
pub use sheet_mirror::{LoggingSheetTransport, SheetMirror, SheetTransport};
