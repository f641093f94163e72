use thiserror::Error;

use crate::models::{NewWallet, Wallet, WalletId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wallet not found: {0}")]
    NotFound(WalletId),
    #[error("wallet store lock poisoned")]
    Poisoned,
}

pub trait WalletStore: Send + Sync {
    /// Appends a wallet, assigning it the next positional id.
    fn create(&self, wallet: NewWallet) -> Result<Wallet, StoreError>;
    fn get_by_id(&self, id: WalletId) -> Result<Wallet, StoreError>;
    fn list(&self) -> Result<Vec<Wallet>, StoreError>;
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
