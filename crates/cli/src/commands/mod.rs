//! CLI subcommands

pub mod bmi;
pub mod chat;
pub mod health;
pub mod predict;
pub mod train;
