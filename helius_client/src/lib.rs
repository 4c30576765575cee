// Helius RPC client - transaction history source and token metadata lookup

pub mod helius_client;
pub mod types;

// Re-export config from config_manager
pub use config_manager::HeliusConfig;

pub use helius_client::{HeliusClient, HeliusError};
pub use types::{
    RpcResponse, RpcTokenBalance, RpcTransaction, RpcUiTokenAmount, SignatureInfo, TokenMetadata,
};
