pub mod config;
pub mod connectors;
pub mod core;
pub mod errors;
pub mod logging;
pub mod market;
pub mod storage;
pub mod strategies;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testing;
