pub mod ask;
pub mod config;
pub mod functions;
pub mod health;
pub mod session;
