//! services/api/src/adapters/memory.rs
//!
//! An in-process `UserRepository`, used when no database is configured and in tests.
//! Accounts are lost when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use sage_core::domain::Account;
use sage_core::ports::{PortError, PortResult, UserRepository};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryUserRepository {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> PortResult<Option<Account>> {
        Ok(self.accounts.read().await.get(email).cloned())
    }

    async fn insert(&self, account: Account) -> PortResult<Account> {
        // Check and insert under one write lock so concurrent signups cannot both win.
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.email) {
            return Err(PortError::Conflict("Email already exists.".to_string()));
        }
        accounts.insert(account.email.clone(), account.clone());
        Ok(account)
    }
}
