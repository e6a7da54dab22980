#![allow(clippy::result_large_err)]

pub mod app;
pub mod app_state;
pub mod codec;
pub mod config;
pub mod delivery;
pub mod error;
pub mod relay;
pub mod telemetry;
pub mod transport;
