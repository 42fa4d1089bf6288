//! Core domain types and logic.

pub mod analyzer;
pub mod candle;
pub mod error;
pub mod executor;
pub mod interpreter;
pub mod ladder;
pub mod risk;
pub mod settings;
pub mod signal;
pub mod simulator;
