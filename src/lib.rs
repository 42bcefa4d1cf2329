pub mod backup;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod journal;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod stats;
pub mod store;
