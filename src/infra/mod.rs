pub mod config;
pub mod evm;
pub mod logging;
