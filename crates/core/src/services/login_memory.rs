use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;
use vaultlink_protocol::UsedCredentials;

/// Tabs remembered at once; the least recently written tab is evicted first.
const MAX_TRACKED_TABS: usize = 32;
/// Logins remembered per tab; the oldest is dropped first.
const MAX_ENTRIES_PER_TAB: usize = 16;

#[derive(Debug, Default)]
struct TabEntries {
	last_write: u64,
	entries: Vec<UsedCredentials>,
}

#[derive(Debug, Default)]
struct Inner {
	writes: u64,
	by_tab: HashMap<i64, TabEntries>,
}

/// Credentials recently submitted in each tab, kept in memory only.
///
/// The save-login prompt reads these after a form submission navigates the
/// tab away. Entries for the same `(url, username)` replace each other, and
/// both the number of tabs and the entries per tab are bounded.
#[derive(Debug, Default)]
pub struct LoginMemory {
	inner: Mutex<Inner>,
}

impl LoginMemory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records credentials seen in `tab_id`. Entries without a password are
	/// ignored. Returns how many were kept.
	pub fn record(&self, credentials: Vec<UsedCredentials>, tab_id: i64) -> usize {
		let mut inner = self.inner.lock();
		inner.writes += 1;
		let write = inner.writes;

		let tab = inner.by_tab.entry(tab_id).or_default();
		tab.last_write = write;
		let mut kept = 0;
		for mut creds in credentials.into_iter().filter(|creds| !creds.password.is_empty()) {
			creds.timestamp.get_or_insert_with(now_ms);
			tab.entries
				.retain(|existing| !(existing.url == creds.url && existing.username == creds.username));
			tab.entries.push(creds);
			kept += 1;
		}
		if tab.entries.len() > MAX_ENTRIES_PER_TAB {
			let excess = tab.entries.len() - MAX_ENTRIES_PER_TAB;
			tab.entries.drain(..excess);
		}

		if inner.by_tab.len() > MAX_TRACKED_TABS {
			let stalest = inner
				.by_tab
				.iter()
				.min_by_key(|(_, tab)| tab.last_write)
				.map(|(id, _)| *id);
			if let Some(evicted) = stalest {
				inner.by_tab.remove(&evicted);
				debug!(target: "vaultlink.login_memory", evicted, "tab evicted from login memory");
			}
		}
		debug!(target: "vaultlink.login_memory", tab_id, kept, "used credentials recorded");
		kept
	}

	pub fn for_tab(&self, tab_id: i64) -> Vec<UsedCredentials> {
		self.inner
			.lock()
			.by_tab
			.get(&tab_id)
			.map(|tab| tab.entries.clone())
			.unwrap_or_default()
	}

	/// Most recently recorded credentials for a tab.
	pub fn last_for_tab(&self, tab_id: i64) -> Option<UsedCredentials> {
		self.inner
			.lock()
			.by_tab
			.get(&tab_id)
			.and_then(|tab| tab.entries.last().cloned())
	}
}

fn now_ms() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as u64
}

#[cfg(test)]
mod tests {
	use super::*;

	fn creds(url: &str, username: &str, password: &str) -> UsedCredentials {
		UsedCredentials {
			url: url.into(),
			title: String::new(),
			username: username.into(),
			password: password.into(),
			entry_id: None,
			timestamp: None,
		}
	}

	#[test]
	fn record_stamps_and_scopes_by_tab() {
		let memory = LoginMemory::new();
		assert_eq!(memory.record(vec![creds("https://a.test", "alice", "pw")], 7), 1);

		let last = memory.last_for_tab(7).unwrap();
		assert_eq!(last.username, "alice");
		assert!(last.timestamp.is_some());
		assert!(memory.last_for_tab(8).is_none());
	}

	#[test]
	fn same_login_replaces_previous_entry() {
		let memory = LoginMemory::new();
		memory.record(vec![creds("https://a.test", "alice", "old")], 1);
		memory.record(vec![creds("https://a.test", "alice", "new")], 1);

		let entries = memory.for_tab(1);
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].password, "new");
	}

	#[test]
	fn empty_passwords_are_ignored() {
		let memory = LoginMemory::new();
		assert_eq!(memory.record(vec![creds("https://a.test", "alice", "")], 1), 0);
		assert!(memory.for_tab(1).is_empty());
	}

	#[test]
	fn least_recently_written_tab_is_evicted() {
		let memory = LoginMemory::new();
		for tab in 0..MAX_TRACKED_TABS as i64 {
			memory.record(vec![creds("https://a.test", "alice", "pw")], tab);
		}
		// Touch tab 0 so tab 1 becomes the stalest.
		memory.record(vec![creds("https://b.test", "alice", "pw")], 0);
		memory.record(vec![creds("https://a.test", "alice", "pw")], 1000);

		assert!(memory.last_for_tab(1).is_none());
		assert_eq!(memory.for_tab(0).len(), 2);
		assert!(memory.last_for_tab(1000).is_some());
		assert_eq!(memory.inner.lock().by_tab.len(), MAX_TRACKED_TABS);
	}

	#[test]
	fn entries_per_tab_are_capped() {
		let memory = LoginMemory::new();
		let logins = (0..MAX_ENTRIES_PER_TAB + 3)
			.map(|n| creds(&format!("https://site{n}.test"), "alice", "pw"))
			.collect();
		memory.record(logins, 1);

		let entries = memory.for_tab(1);
		assert_eq!(entries.len(), MAX_ENTRIES_PER_TAB);
		assert_eq!(entries[0].url, "https://site3.test");
	}
}
