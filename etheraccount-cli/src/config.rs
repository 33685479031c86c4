//! Command-line configuration

use alloy::primitives::Address;
use anyhow::{bail, Context};
use antelope_session::{ChainDefinition, ChainId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wallet_plugin_etheraccount::{EtherAccountOptions, EOS_MAINNET, KYLIN_TESTNET};

/// Log into Antelope chains with an Ethereum account
#[derive(Parser, Debug)]
#[command(name = "etheraccount", version)]
#[command(about = "Log into Antelope chains and relay transactions with an Ethereum account")]
pub struct Cli {
    /// JSON-RPC endpoint of the EVM network that manages the account
    #[arg(long, env = "ETHERACCOUNT_EVM_RPC", default_value = "http://127.0.0.1:8545")]
    pub evm_rpc: String,

    /// Antelope chain API endpoint
    #[arg(long, env = "ETHERACCOUNT_LEDGER_URL", default_value = "https://eos.greymass.com")]
    pub ledger_url: String,

    /// Ethereum account to act as; defaults to the node's first account
    #[arg(long, env = "ETHERACCOUNT_ADDRESS")]
    pub address: Option<Address>,

    /// JSON file with plugin options
    #[arg(long, env = "ETHERACCOUNT_OPTIONS")]
    pub options: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the chain to network bindings
    Networks,

    /// Resolve the ledger account bound to an address
    Resolve {
        /// Address to look up
        address: Address,
    },

    /// Log in and print the permission level
    Login {
        /// `mainnet`, `kylin` or a chain id in hex
        #[arg(long, default_value = "mainnet")]
        chain: String,
    },

    /// Log in, then relay the actions in a JSON file
    Sign {
        /// `mainnet`, `kylin` or a chain id in hex
        #[arg(long, default_value = "mainnet")]
        chain: String,

        /// JSON array of actions
        actions: PathBuf,
    },
}

impl Cli {
    /// Plugin options from `--options`, or the defaults
    pub fn plugin_options(&self) -> anyhow::Result<EtherAccountOptions> {
        let Some(path) = &self.options else {
            return Ok(EtherAccountOptions::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading options from {}", path.display()))?;
        Ok(EtherAccountOptions::from_json(&json)?)
    }

    /// The chain selected by `--chain`
    pub fn chain(&self, chain: &str) -> anyhow::Result<ChainDefinition> {
        Ok(ChainDefinition::new(parse_chain(chain)?, self.ledger_url.clone()))
    }
}

/// `mainnet`, `kylin` or 64 hex digits
pub fn parse_chain(chain: &str) -> anyhow::Result<ChainId> {
    match chain {
        "mainnet" | "eos" => Ok(EOS_MAINNET),
        "kylin" => Ok(KYLIN_TESTNET),
        hex if hex.len() == 64 => Ok(hex.parse()?),
        other => bail!("unknown chain {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain() {
        assert_eq!(parse_chain("mainnet").unwrap(), EOS_MAINNET);
        assert_eq!(parse_chain("kylin").unwrap(), KYLIN_TESTNET);
        assert_eq!(parse_chain(&EOS_MAINNET.to_string()).unwrap(), EOS_MAINNET);
        assert!(parse_chain("jungle").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["etheraccount", "--evm-rpc", "http://localhost:1", "login", "--chain", "kylin"]).unwrap();
        assert_eq!(cli.evm_rpc, "http://localhost:1");
        assert!(matches!(cli.command, Command::Login { ref chain } if chain == "kylin"));
    }
}
