//! Client code for menucache.
//!
//! This crate provides the network fetcher and the offline cache proxy
//! worker built on top of it, shared by the server binary and its tests.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher};

pub use worker::{
    ActivateReport, ControlMessage, ControlOutcome, InstallFailure, InstallReport, Interception, OfflineProxy,
    ResponseSource, Served, WorkerState, WorkerStatus,
};
