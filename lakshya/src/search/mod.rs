//! Object re-acquisition by scanning head positions.

mod locator;

pub use locator::{ObjectLocator, ScanOutcome, select_best_detection};
