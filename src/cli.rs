use clap::{Parser, Subcommand, ValueEnum};
use geoguard::GuardConfig;

/// geoguard: wallet session, balances and node registry from the terminal.
#[derive(Parser, Debug)]
#[command(name = "geoguard", version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Wallet JSON-RPC endpoint
    #[arg(
        long,
        env = "GEOGUARD_WALLET_URL",
        default_value = "http://127.0.0.1:8545",
        global = true
    )]
    pub wallet_url: String,

    /// WebSocket bridge pushing accountsChanged/chainChanged (polls the wallet when unset)
    #[arg(long, env = "GEOGUARD_EVENTS_URL", global = true)]
    pub events_url: Option<String>,

    /// Network the registry lives on
    #[arg(
        long,
        env = "GEOGUARD_NETWORK",
        value_enum,
        default_value_t = Network::Fuji,
        global = true
    )]
    pub network: Network,

    /// Output as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect the wallet and print the session with its balances
    Status,

    /// Follow session and balance changes until interrupted
    Watch,

    /// Mint a node token
    Mint(MintArgs),

    /// Look up the node id stored for a token
    Lookup(LookupArgs),

    /// Print the highest token id minted so far
    LastTokenId,
}

/// Arguments for the `mint` subcommand.
#[derive(Parser, Debug)]
pub struct MintArgs {
    /// Node id to tie to the token (e.g. NodeID-7Xhw2mDxuDS44j42TCB6U5579esbSt3Lg)
    #[arg(long)]
    pub node_id: Option<String>,

    /// Token id to mint (defaults to the last minted id + 1)
    #[arg(long)]
    pub token_id: Option<String>,

    /// Recipient (defaults to the connected account)
    #[arg(long)]
    pub to: Option<String>,

    /// Blocks that must include the mint before it is reported
    #[arg(long, default_value = "1")]
    pub confirmations: u64,
}

/// Arguments for the `lookup` subcommand.
#[derive(Parser, Debug)]
pub struct LookupArgs {
    /// Token id to look up
    #[arg(long)]
    pub token_id: Option<String>,

    /// Account the node id was registered for (defaults to the connected account)
    #[arg(long)]
    pub account: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Network {
    /// Avalanche Fuji testnet (43113)
    Fuji,
    /// Avalanche C-Chain (43114)
    Mainnet,
}

impl Network {
    pub fn chain_id(self) -> u64 {
        match self {
            Network::Fuji => 43113,
            Network::Mainnet => 43114,
        }
    }

    pub fn config(self, wallet_url: &str) -> GuardConfig {
        match self {
            Network::Fuji => GuardConfig::fuji(wallet_url),
            Network::Mainnet => GuardConfig::mainnet(wallet_url),
        }
    }
}
