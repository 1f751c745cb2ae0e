pub mod backtest;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod server;
pub mod strategy;

pub use error::{Error, Result};
