pub mod balance;
pub mod config;
pub mod contract;
pub mod error;
pub mod forms;
pub mod provider;
pub mod rpc;
pub mod session;
pub mod utils;
pub mod ws;

// ---- Top-level re-exports for ergonomic usage ----

// Config + errors
pub use config::{BalanceSource, BalanceSources, ChainEndpoint, EventSource, GuardConfig};
pub use error::{GuardError, Result};

// Wallet provider
pub use provider::{HttpWalletProvider, MockProvider, ProviderEvent, WalletProvider};

// Session + balances
pub use balance::{BalanceRefresher, BalanceSet, BalanceSlot};
pub use session::{Session, SessionManager};

// Contract
pub use contract::{MintOutcome, NodeRegistry};

// Forms
pub use forms::{LookupForm, LookupRequest, MintForm, MintRequest};

// JSON-RPC
pub use rpc::types::{ChainInfo, TransactionReceipt};
pub use rpc::JsonRpcClient;
