//! etheraccount CLI
//!
//! Drives the etheraccount wallet plugin against HTTP endpoints: an EVM
//! JSON-RPC node that holds the account's keys and an Antelope chain API.

mod config;

use std::sync::Arc;

use antelope_rpc::{ChainApiClient, ProviderConfig};
use antelope_session::{Action, LoginContext, WalletPlugin};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use wallet_plugin_etheraccount::{
    EtherAccountOptions, HttpEthereumProvider, IdentityResolver, StaticDetector, WalletPluginEtherAccount,
};

use config::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let options = cli.plugin_options()?;
    let ledger = Arc::new(ChainApiClient::new(
        ProviderConfig::new(cli.ledger_url.clone()).with_timeout(cli.timeout),
    )?);

    match &cli.command {
        Command::Networks => {
            for binding in options.networks.bindings() {
                println!("{}  {}", binding.target_chain_id, binding.required_network_id);
            }
        }
        Command::Resolve { address } => {
            let identity = IdentityResolver::new(options.account_contract)
                .resolve(ledger.as_ref(), address)
                .await?;
            println!("{}", identity.permission_level());
        }
        Command::Login { chain } => {
            let plugin = plugin(&cli, options)?;
            let context = LoginContext::new(ledger).with_chain(cli.chain(chain)?);
            let response = plugin.login(&context).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Sign { chain, actions } => {
            let actions: Vec<Action> = serde_json::from_str(&std::fs::read_to_string(actions)?)?;
            let plugin = plugin(&cli, options)?;
            let context = LoginContext::new(ledger).with_chain(cli.chain(chain)?);
            let (_, identity) = plugin.login_with(&context).await?;
            tracing::info!(account = %identity.ledger_account(), actions = actions.len(), "relaying");

            let signature = plugin.sign_actions(&actions).await?;
            println!("{}", serde_json::to_string_pretty(&json!({ "signatures": [signature] }))?);
        }
    }

    Ok(())
}

fn plugin(cli: &Cli, options: EtherAccountOptions) -> anyhow::Result<WalletPluginEtherAccount> {
    let config = ProviderConfig::new(cli.evm_rpc.clone()).with_timeout(cli.timeout);
    let mut provider = HttpEthereumProvider::new(&config)?;
    if let Some(address) = cli.address {
        provider = provider.with_account(address);
    }
    let detector = Arc::new(StaticDetector::new(Arc::new(provider)));
    // a JSON-RPC node never identifies as MetaMask
    let options = options.with_must_be_metamask(false);
    Ok(WalletPluginEtherAccount::with_options(detector, options)?)
}
