//! Command result envelope and its text/JSON renderings.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use vaultlink::BridgeError;

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope (`ok`, `command`, `data`, `error`)
	Json,
}

/// Why a command failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	/// Text for the user, free of internal causes.
	pub message: String,
	/// Localization key, when the UI would translate this error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub i18n_key: Option<&'static str>,
	/// Full cause chain. Only filled in at `-v` and above.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cause: Option<String>,
}

impl CommandError {
	pub fn from_error(err: &anyhow::Error, verbose: bool) -> Self {
		let (message, i18n_key) = match err.downcast_ref::<BridgeError>() {
			Some(bridge) => (bridge.user_message(), bridge.i18n_key()),
			None => (err.to_string(), None),
		};
		let cause = format!("{err:#}");
		Self {
			cause: (verbose && cause != message).then_some(cause),
			message,
			i18n_key,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
	pub ok: bool,
	pub command: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	/// Text rendering, one entry per line.
	#[serde(skip)]
	pub lines: Vec<String>,
}

/// Builder for [`CommandResult`].
#[derive(Debug)]
pub struct ResultBuilder {
	result: CommandResult,
}

impl ResultBuilder {
	pub fn new(command: &'static str) -> Self {
		Self {
			result: CommandResult {
				ok: true,
				command,
				data: None,
				error: None,
				lines: Vec::new(),
			},
		}
	}

	pub fn data(mut self, data: impl Serialize) -> Self {
		self.result.data = serde_json::to_value(data).ok();
		self
	}

	pub fn line(mut self, line: impl Into<String>) -> Self {
		self.result.lines.push(line.into());
		self
	}

	pub fn lines(mut self, lines: impl IntoIterator<Item = String>) -> Self {
		self.result.lines.extend(lines);
		self
	}

	pub fn error(mut self, error: CommandError) -> Self {
		self.result.ok = false;
		self.result.error = Some(error);
		self
	}

	pub fn build(self) -> CommandResult {
		self.result
	}
}

pub fn print_result(result: &CommandResult, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => {
			let mut stdout = io::stdout().lock();
			for line in &result.lines {
				let _ = writeln!(stdout, "{line}");
			}
		}
	}
}

pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error: {}", error.message);
	if let Some(cause) = &error.cause {
		eprintln!("  caused by: {cause}");
	}
}

/// One-line label for an opaque desktop record.
pub fn describe(record: &Value) -> String {
	const LABEL_KEYS: [&str; 4] = ["title", "name", "label", "id"];

	LABEL_KEYS
		.iter()
		.find_map(|key| record.get(key).and_then(Value::as_str))
		.map(str::to_string)
		.unwrap_or_else(|| record.to_string())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn describe_prefers_human_labels() {
		assert_eq!(describe(&json!({"id": "1", "title": "GitHub"})), "GitHub");
		assert_eq!(describe(&json!({"id": "s1"})), "s1");
		assert_eq!(describe(&json!({"secret": "x"})), r#"{"secret":"x"}"#);
	}

	#[test]
	fn bridge_errors_use_user_message() {
		let err = anyhow::Error::new(BridgeError::Remote {
			message: "Background task failed: Desktop connection not authorised".into(),
			code: Some(vaultlink::error::I18N_NOT_AUTHORISED.into()),
		});

		let quiet = CommandError::from_error(&err, false);
		assert_eq!(quiet.message, "Desktop connection not authorised");
		assert_eq!(quiet.i18n_key, Some(vaultlink::error::I18N_NOT_AUTHORISED));
		assert!(quiet.cause.is_none());

		let verbose = CommandError::from_error(&err, true);
		assert_eq!(
			verbose.cause.as_deref(),
			Some("Background task failed: Desktop connection not authorised")
		);
	}

	#[test]
	fn failed_result_serializes_error_envelope() {
		let result = ResultBuilder::new("otps")
			.error(CommandError {
				message: "boom".into(),
				i18n_key: None,
				cause: None,
			})
			.build();
		assert_eq!(
			serde_json::to_value(&result).unwrap(),
			json!({"ok": false, "command": "otps", "error": {"message": "boom"}})
		);
	}
}
