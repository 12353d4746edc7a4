#![doc = include_str!("../../../README.md")]

pub mod driver;
pub mod error;
pub mod parser;
pub mod run_stats;
pub mod system;
pub mod transfer_simulation;
