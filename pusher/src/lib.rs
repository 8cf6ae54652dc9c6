pub mod chain;
pub mod config;
pub mod execution;
pub mod hermes;
pub mod metrics;
pub mod planner;
pub mod price;
pub mod scheduler;

pub mod error;
