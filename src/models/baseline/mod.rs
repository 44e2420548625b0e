//! Baseline forecasters used as fallbacks.

mod trailing;

pub use trailing::TrailingAverage;
