//! Batch sales-order entry against an ERP GUI scripting surface.
//!
//! The agent reads a tabular working file, segments it into sales orders
//! by the purchase-order sentinel column, drives the `sapflow` screen
//! fill engine once per order, and reconciles outcomes into updated and
//! error spreadsheets with failure screenshots. The live ERP session is
//! owned by the hosting worker; this crate consumes it behind the
//! `sapflow::GuiSession` trait and ships a simulator for tests and dry
//! runs.

pub mod artifact;
pub mod batch;
pub mod config;
pub mod dataset;
pub mod sim;
pub mod va01;

pub use batch::{run_batch, BatchJob, BatchSummary, OrderError};
pub use config::Settings;
pub use dataset::Table;
pub use sim::SimSession;
