//! Library crate for blind-clock: the replicated tournament clock, its game store
//! service, and the pieces shared by the binaries and integration tests.

pub mod clock;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
