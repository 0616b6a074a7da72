mod config;
mod demo;
pub mod runner;

pub use runner::main;
