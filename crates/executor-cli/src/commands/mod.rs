pub mod config;
pub mod exec;
pub mod get;
pub mod list;
pub mod remove;
pub mod run;
