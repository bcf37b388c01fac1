//! Fixed-asset register dashboard: load a register, filter it, and chart
//! the result.

pub mod app;
pub mod color;
pub mod data;
pub mod state;
pub mod ui;
