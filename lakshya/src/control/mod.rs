//! Approach control loop.
//!
//! ```text
//! ControlHandle ──(crossbeam channel)──► CommandInbox ─┐
//!   start / stop / resume                 ControlFlags  │ owned by
//!                                                        ▼ the periodic task
//!                                    ApproachController::tick()
//!                                      │ resolve pose → candidate → goto
//!                                      │ poll status (cancellable wait)
//!                                      └ gaze scan → select → emit
//! ```
//!
//! The periodic task is the only owner of the flags, retry state and latched
//! observation. Producers only ever send messages.

mod commands;
mod controller;
mod pacer;
mod thread;

pub use commands::{CommandInbox, ControlCommand, ControlFlags, ControlHandle, create_control_channel};
pub use controller::{ApproachController, TickOutcome};
pub use pacer::Pacer;
pub use thread::ApproachThread;
