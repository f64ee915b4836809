//! Core TRX library (agent API client, trace aggregation, config).

pub mod aggregator;
pub mod api;
pub mod config;
pub mod controller;
pub mod interrupt;
pub mod session;
pub mod thinking;
