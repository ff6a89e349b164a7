pub mod args;
pub mod commands;
mod config;
mod error;
pub mod insight;
pub mod model;
pub mod pipeline;
mod store;
#[cfg(test)]
mod test;
mod utils;

pub use config::{Config, InsightConfig};
pub use error::{Error, ErrorType, Result};
pub use store::{Ledger, Mode, TEST_MODE_ENV};
