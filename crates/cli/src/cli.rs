use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "vaultlink")]
#[command(about = "Talk to the vault desktop companion the way the browser extension does")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info and error causes, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Base URL of the desktop companion API
	#[arg(long, global = true, value_name = "URL")]
	pub desktop_url: Option<String>,

	/// Key-value store holding the session token and settings
	#[arg(long, global = true, value_name = "FILE")]
	pub store: Option<PathBuf>,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Ask the desktop companion to start pairing
	Connect,

	/// Finish pairing with the one-time code shown by the desktop companion
	Authenticate {
		/// One-time code
		code: String,
	},

	/// Report whether a desktop session exists and is still accepted
	Status,

	/// Forget the desktop session token
	Disconnect,

	/// List one-time password records
	Otps,

	/// List vault sources known to the desktop companion
	Vaults,

	/// Search vault entries
	Search(SearchArgs),

	/// Prompt the user to lock a vault source
	Lock {
		/// Vault source id
		source: String,
	},

	/// Prompt the user to unlock a vault source
	Unlock {
		/// Vault source id
		source: String,
	},

	/// Read or change extension settings
	#[command(subcommand)]
	Config(ConfigAction),

	/// List domains autofill is disabled on
	Domains,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("query").required(true).args(["term", "url"])))]
pub struct SearchArgs {
	/// Free-text search term
	#[arg(long, value_name = "TERM")]
	pub term: Option<String>,

	/// Page URL to find matching entries for
	#[arg(long, value_name = "URL")]
	pub url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
	/// Print the current configuration
	Get,

	/// Set one configuration key
	Set {
		/// Configuration key, e.g. `theme`
		key: String,
		/// JSON value; a bare word is taken as a string
		value: String,
	},
}

/// Help colors in cargo's style.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}
