use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;
use vaultlink_protocol::storage_keys;

use crate::error::{BridgeError, Result};
use crate::storage::{LocalStore, get_json, set_json};

/// Domains on which autofill prompts are suppressed.
///
/// Stored as a sorted, lowercase, duplicate-free JSON array.
#[derive(Clone)]
pub struct DisabledDomains {
	store: Arc<dyn LocalStore>,
}

impl DisabledDomains {
	pub fn new(store: Arc<dyn LocalStore>) -> Self {
		Self { store }
	}

	pub async fn list(&self) -> Result<Vec<String>> {
		Ok(get_json(self.store.as_ref(), storage_keys::DISABLED_DOMAINS)
			.await?
			.unwrap_or_default())
	}

	pub async fn disable(&self, domain: &str) -> Result<Vec<String>> {
		let domain = normalise(domain)?;
		self.update(|domains| {
			domains.insert(domain);
		})
		.await
	}

	pub async fn enable(&self, domain: &str) -> Result<Vec<String>> {
		let domain = normalise(domain)?;
		self.update(|domains| {
			domains.remove(&domain);
		})
		.await
	}

	async fn update(&self, change: impl FnOnce(&mut BTreeSet<String>)) -> Result<Vec<String>> {
		let mut domains: BTreeSet<String> = self.list().await?.into_iter().collect();
		change(&mut domains);
		let domains: Vec<String> = domains.into_iter().collect();
		set_json(self.store.as_ref(), storage_keys::DISABLED_DOMAINS, &domains).await?;
		debug!(target: "vaultlink.domains", count = domains.len(), "disabled domains updated");
		Ok(domains)
	}
}

fn normalise(domain: &str) -> Result<String> {
	let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
	if domain.is_empty() {
		return Err(BridgeError::Dispatch("domain must not be empty".to_string()));
	}
	Ok(domain)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::MemoryStore;

	#[tokio::test]
	async fn nothing_disabled_by_default() {
		let domains = DisabledDomains::new(Arc::new(MemoryStore::new()));
		assert!(domains.list().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn disable_normalises_and_deduplicates() {
		let domains = DisabledDomains::new(Arc::new(MemoryStore::new()));
		domains.disable("Example.COM.").await.unwrap();
		domains.disable("example.com").await.unwrap();
		domains.disable("bank.test").await.unwrap();

		assert_eq!(domains.list().await.unwrap(), vec!["bank.test", "example.com"]);
	}

	#[tokio::test]
	async fn enable_removes_domain() {
		let domains = DisabledDomains::new(Arc::new(MemoryStore::new()));
		domains.disable("example.com").await.unwrap();
		assert!(domains.enable("EXAMPLE.com").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn blank_domain_is_rejected() {
		let domains = DisabledDomains::new(Arc::new(MemoryStore::new()));
		assert!(matches!(domains.disable("  ").await, Err(BridgeError::Dispatch(_))));
	}
}
