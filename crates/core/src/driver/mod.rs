//! Top-level batch run.
//!
//! One run prepares the batch the cursor names, resolves each processable
//! working-set entry in file order, and (optionally) advances the cursor.
//! Per-URL failures never stop the batch; storage failures abort the run.

mod batch_driver;
mod error;
mod types;

pub use batch_driver::BatchDriver;
pub use error::DriverError;
pub use types::{BatchReport, DriverPhase};
