//! In-memory, append-only wallet store.
//!
//! Wallets live in insertion order and are identified by position: the n-th
//! wallet created has id `n`. Nothing is ever removed, so ids stay unique for
//! the lifetime of the store.

use std::sync::RwLock;

use wallets_core::{NewWallet, StoreError, Wallet, WalletId, WalletStore};

pub struct InMemoryWalletStore {
    wallets: RwLock<Vec<Wallet>>,
}

impl Default for InMemoryWalletStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self {
            wallets: RwLock::new(Vec::new()),
        }
    }

    /// Builds a store pre-populated with `seed`, assigning ids in order.
    pub fn with_seed(seed: impl IntoIterator<Item = NewWallet>) -> Self {
        let wallets = seed
            .into_iter()
            .enumerate()
            .map(|(idx, wallet)| wallet.into_wallet(idx as WalletId + 1))
            .collect();
        Self {
            wallets: RwLock::new(wallets),
        }
    }
}

impl WalletStore for InMemoryWalletStore {
    fn create(&self, wallet: NewWallet) -> Result<Wallet, StoreError> {
        let mut wallets = self.wallets.write().map_err(|_| StoreError::Poisoned)?;
        let id = wallets.len() as WalletId + 1;
        let wallet = wallet.into_wallet(id);
        wallets.push(wallet.clone());
        tracing::debug!(id, "wallet appended");
        Ok(wallet)
    }

    fn get_by_id(&self, id: WalletId) -> Result<Wallet, StoreError> {
        let wallets = self.wallets.read().map_err(|_| StoreError::Poisoned)?;
        wallets
            .iter()
            .find(|wallet| wallet.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Result<Vec<Wallet>, StoreError> {
        Ok(self.wallets.read().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.wallets.read().map_err(|_| StoreError::Poisoned)?.len())
    }
}
