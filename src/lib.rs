pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod flow;
pub mod ui;
