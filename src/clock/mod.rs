//! Replicated tournament clock: structure, snapshot, correction, engine and session loop.

pub mod authority;
pub mod display;
pub mod drift;
pub mod engine;
pub mod gate;
pub mod polling;
#[cfg(feature = "remote-sync")]
pub mod remote;
pub mod session;
pub mod structure;
pub mod sync;
pub mod timer;
