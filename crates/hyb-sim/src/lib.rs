//! Command implementations of the `hyb-sim` driver.

pub mod commands;
