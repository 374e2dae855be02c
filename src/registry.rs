use crate::error::RegistryError;
use crate::models::{OwnerId, WatchEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Watch-list collaborator. The engine only calls `list_all` once per
/// cycle; mutations come from the conversational UI out-of-band and are
/// picked up on the next listing.
#[async_trait]
pub trait AddressRegistry: Send + Sync {
    async fn list_all(&self) -> Result<HashMap<OwnerId, Vec<WatchEntry>>, RegistryError>;

    async fn add(
        &self,
        owner: OwnerId,
        address: &str,
        nickname: &str,
    ) -> Result<WatchEntry, RegistryError>;

    /// Remove by nickname; returns the removed entry.
    async fn remove(&self, owner: OwnerId, nickname: &str) -> Result<WatchEntry, RegistryError>;
}

/// Canonicalize a user-supplied EVM address: 0x prefix plus 40 hex
/// digits, lowercased.
pub fn canonical_address(raw: &str) -> Result<String, RegistryError> {
    let hex = raw
        .strip_prefix("0x")
        .ok_or_else(|| RegistryError::InvalidAddress(raw.to_string()))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RegistryError::InvalidAddress(raw.to_string()));
    }
    Ok(raw.to_lowercase())
}

/// In-memory registry with the per-owner uniqueness rules of the watch
/// UI: an address may be watched once per owner and nicknames are unique
/// per owner.
#[derive(Default)]
pub struct InMemoryRegistry {
    entries: RwLock<HashMap<OwnerId, Vec<WatchEntry>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AddressRegistry for InMemoryRegistry {
    async fn list_all(&self) -> Result<HashMap<OwnerId, Vec<WatchEntry>>, RegistryError> {
        Ok(self.entries.read().await.clone())
    }

    async fn add(
        &self,
        owner: OwnerId,
        address: &str,
        nickname: &str,
    ) -> Result<WatchEntry, RegistryError> {
        let address = canonical_address(address)?;
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(RegistryError::EmptyNickname);
        }

        let mut entries = self.entries.write().await;
        let list = entries.entry(owner).or_default();

        if list.iter().any(|e| e.address == address) {
            return Err(RegistryError::AddressTaken(address));
        }
        if list.iter().any(|e| e.nickname == nickname) {
            return Err(RegistryError::NicknameTaken(nickname.to_string()));
        }

        let entry = WatchEntry {
            owner_id: owner,
            address,
            nickname: nickname.to_string(),
        };
        list.push(entry.clone());
        Ok(entry)
    }

    async fn remove(&self, owner: OwnerId, nickname: &str) -> Result<WatchEntry, RegistryError> {
        let mut entries = self.entries.write().await;
        let list = entries
            .get_mut(&owner)
            .ok_or_else(|| RegistryError::UnknownNickname(nickname.to_string()))?;

        let position = list
            .iter()
            .position(|e| e.nickname == nickname)
            .ok_or_else(|| RegistryError::UnknownNickname(nickname.to_string()))?;
        Ok(list.remove(position))
    }
}
