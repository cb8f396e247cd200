//! Command execution.
//!
//! Every command runs the same path the extension UI does: it builds a
//! [`MessageClient`] bound to a freshly spawned background router and sends
//! one message through it.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;
use vaultlink::protocol::{Configuration, SenderContext};
use vaultlink::{BridgeConfig, FileStore, HttpTransport, MessageClient, MessageRouter};

use crate::cli::{Cli, Commands, ConfigAction, SearchArgs};
use crate::output::{CommandResult, ResultBuilder, describe};

/// Applies command-line overrides on top of the file and environment config.
pub fn resolve_config(cli: &Cli, base: BridgeConfig) -> BridgeConfig {
	let mut config = base;
	if let Some(url) = &cli.desktop_url {
		config.desktop_url = url.clone();
	}
	if let Some(store) = &cli.store {
		config.store_path = Some(store.clone());
	}
	config
}

/// Builds the background runtime and a UI-side client talking to it.
pub fn connect_client(config: &BridgeConfig) -> Result<MessageClient> {
	let store_path = config
		.resolved_store_path()
		.context("no config directory available; pass --store")?;
	debug!(target: "vaultlink.cli", store = %store_path.display(), desktop_url = %config.desktop_url, "starting background context");

	let store = Arc::new(FileStore::new(store_path));
	let transport = Arc::new(HttpTransport::from_config(config)?);
	let handle = MessageRouter::new(transport, store).spawn();
	Ok(MessageClient::new(Arc::new(handle), SenderContext::extension_page()))
}

pub async fn dispatch(cli: &Cli) -> Result<CommandResult> {
	let config = resolve_config(cli, BridgeConfig::load()?);
	let client = connect_client(&config)?;
	run(&client, &cli.command).await
}

pub async fn run(client: &MessageClient, command: &Commands) -> Result<CommandResult> {
	let result = match command {
		Commands::Connect => {
			client.initiate_desktop_connection().await?;
			ResultBuilder::new("connect")
				.line("Pairing requested. Enter the code shown by the desktop app with `vaultlink authenticate <CODE>`.")
				.build()
		}
		Commands::Authenticate { code } => {
			client.authenticate_desktop_connection(code).await?;
			ResultBuilder::new("authenticate").line("Connected to desktop.").build()
		}
		Commands::Status => {
			let available = client.check_desktop_connection().await?;
			ResultBuilder::new("status")
				.data(serde_json::json!({ "available": available }))
				.line(if available { "connected" } else { "not connected" })
				.build()
		}
		Commands::Disconnect => {
			client.clear_desktop_authentication().await?;
			ResultBuilder::new("disconnect").line("Desktop session cleared.").build()
		}
		Commands::Otps => {
			let otps = client.get_otps().await?;
			let lines = otps.iter().map(|otp| describe(&otp.0)).collect::<Vec<_>>();
			ResultBuilder::new("otps").data(&otps).lines(lines).build()
		}
		Commands::Vaults => {
			let sources = client.get_desktop_vault_sources().await?;
			let lines = sources.iter().map(|source| describe(&source.0)).collect::<Vec<_>>();
			ResultBuilder::new("vaults").data(&sources).lines(lines).build()
		}
		Commands::Search(args) => search(client, args).await?,
		Commands::Lock { source } => {
			let locked = client.prompt_lock_source(source).await?;
			ResultBuilder::new("lock")
				.data(serde_json::json!({ "locked": locked }))
				.line(if locked { format!("{source}: locked") } else { format!("{source}: still unlocked") })
				.build()
		}
		Commands::Unlock { source } => {
			client.prompt_unlock_source(source).await?;
			ResultBuilder::new("unlock").line(format!("{source}: unlock requested")).build()
		}
		Commands::Config(ConfigAction::Get) => {
			let config = client.get_configuration().await?;
			ResultBuilder::new("config get")
				.lines(config_lines(&config)?)
				.data(&config)
				.build()
		}
		Commands::Config(ConfigAction::Set { key, value }) => {
			client.set_configuration_value(key, parse_config_value(value)).await?;
			let config = client.get_configuration().await?;
			ResultBuilder::new("config set")
				.lines(config_lines(&config)?)
				.data(&config)
				.build()
		}
		Commands::Domains => {
			let domains = client.get_disabled_domains().await?;
			ResultBuilder::new("domains").data(&domains).lines(domains.iter().cloned()).build()
		}
	};
	Ok(result)
}

async fn search(client: &MessageClient, args: &SearchArgs) -> Result<CommandResult> {
	let results = match (&args.term, &args.url) {
		(Some(term), _) => client.search_entries_by_term(term).await?,
		(None, Some(url)) => client.search_entries_by_url(url).await?,
		(None, None) => anyhow::bail!("search needs --term or --url"),
	};
	let lines = results.iter().map(|result| describe(&result.0)).collect::<Vec<_>>();
	Ok(ResultBuilder::new("search").data(&results).lines(lines).build())
}

/// JSON if it parses, otherwise the raw text as a string.
fn parse_config_value(raw: &str) -> Value {
	serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn config_lines(config: &Configuration) -> Result<Vec<String>> {
	let Value::Object(fields) = serde_json::to_value(config)? else {
		return Ok(Vec::new());
	};
	Ok(fields.into_iter().map(|(key, value)| format!("{key} = {value}")).collect())
}
