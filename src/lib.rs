pub mod agent;
pub mod config;
pub mod error;
pub mod platform;
pub mod report;
pub mod shutdown;
pub mod workflow;
