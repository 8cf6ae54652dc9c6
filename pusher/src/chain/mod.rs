pub mod errors;
pub mod evm;

pub use errors::ChainError;
pub use evm::EvmPythClient;
