pub mod client;

pub use client::EvmRootPublisher;
