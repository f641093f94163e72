use serde::{Deserialize, Serialize};

pub type WalletId = u64;

/// A stored wallet. `wallet_type` travels as `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub name: String,
    #[serde(rename = "type")]
    pub wallet_type: String,
    pub colour_code: String,
}

/// Payload accepted by `POST /wallets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWallet {
    pub name: String,
    #[serde(rename = "type")]
    pub wallet_type: String,
    pub colour_code: String,
}

impl NewWallet {
    pub fn new(name: impl Into<String>, wallet_type: impl Into<String>, colour_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wallet_type: wallet_type.into(),
            colour_code: colour_code.into(),
        }
    }

    pub fn into_wallet(self, id: WalletId) -> Wallet {
        Wallet {
            id,
            name: self.name,
            wallet_type: self.wallet_type,
            colour_code: self.colour_code,
        }
    }
}

/// Body of `GET /wallets/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEnvelope {
    pub wallet: Wallet,
}
