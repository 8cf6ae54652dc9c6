pub mod client;
pub mod errors;
pub mod types;

pub use client::HermesClient;
pub use errors::HermesError;
