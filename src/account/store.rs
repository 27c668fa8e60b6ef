//! Config-backed account store
//!
//! Serves the `[[accounts]]` tables from the loaded configuration. Accounts
//! are immutable for the lifetime of the process.

use super::{Account, AccountLookup};
use crate::probe::ProbeError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Read-only account store keyed by account id
#[derive(Debug, Clone, Default)]
pub struct ConfigAccountStore {
    accounts: HashMap<String, Account>,
}

impl ConfigAccountStore {
    /// Build a store from account records
    ///
    /// Later duplicates overwrite earlier ones; `Config::validate` rejects
    /// duplicate ids before this point.
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|account| (account.id().to_string(), account))
            .collect();
        Self { accounts }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountLookup for ConfigAccountStore {
    async fn get(&self, account_id: &str) -> Result<Account, ProbeError> {
        self.accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| ProbeError::AccountLookup {
                account_id: account_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_returns_known_account() {
        let store = ConfigAccountStore::new(vec![
            Account::new("a1", "A1", "https://a1.example.com", "k1"),
            Account::new("a2", "A2", "https://a2.example.com", "k2"),
        ]);

        let account = store.get("a2").await.expect("a2 should resolve");
        assert_eq!(account.name(), "A2");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_get_unknown_account_is_lookup_error() {
        let store = ConfigAccountStore::default();
        assert!(store.is_empty());

        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, ProbeError::AccountLookup { ref account_id } if account_id == "missing"));
    }
}
