//! Data preparation for the televendas dashboard: load the actions and hourly
//! activity exports, normalize them once, then filter, aggregate and classify
//! on demand.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod filter;
pub mod highlight;
pub mod loader;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod report;
