mod client;
mod error;
mod types;

pub use client::EvolutionClient;
pub use error::GatewayError;
pub use types::*;
