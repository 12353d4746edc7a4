#![doc = include_str!("../../../README.md")]

pub mod error;
pub mod network;
pub mod node;
pub mod stats;
pub mod transfer;
