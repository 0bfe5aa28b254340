//! Mock filesystem for testing without a real `/proc` or `/sys`.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
