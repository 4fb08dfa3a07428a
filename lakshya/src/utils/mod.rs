//! Process-level helpers for the `lakshya` binary.

mod signal;

pub use signal::shutdown_flag;
