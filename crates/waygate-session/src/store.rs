//! The account store: who is signed in on which local slot.
//!
//! Two maps kept in sync:
//!
//! ```text
//! slots:    LocalSlot ──→ UniquePlayerId
//! accounts: UniquePlayerId ──→ AccountRecord
//! ```
//!
//! Entries are created when a login completes and removed on logout.
//! Nothing here outlives the process.
//!
//! # Concurrency note
//!
//! Plain `HashMap`s, no locking. The store is owned by the identity
//! service, which is only ever touched from its owning thread.

use std::collections::HashMap;

use waygate_protocol::{AccountRecord, LocalSlot, UniquePlayerId};

/// In-memory registry of signed-in accounts.
#[derive(Debug, Default)]
pub struct AccountStore {
    /// At most one identity per slot.
    slots: HashMap<LocalSlot, UniquePlayerId>,

    /// At most one record per identity. Re-login overwrites.
    accounts: HashMap<UniquePlayerId, AccountRecord>,
}

impl AccountStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed login for `slot`.
    ///
    /// Overwrites whatever the slot held before. If the same identity was
    /// signed in on another slot, it moves here: an identity maps to one
    /// record, so two slots must never share it.
    ///
    /// Returns the identity now mapped to `slot`.
    pub fn register(&mut self, slot: LocalSlot, account: AccountRecord) -> UniquePlayerId {
        let player_id = account.player_id().clone();

        if let Some(previous) = self.slots.remove(&slot) {
            if previous != player_id {
                self.accounts.remove(&previous);
            }
        }
        self.slots.retain(|other_slot, id| {
            if *id == player_id {
                tracing::debug!(from = %other_slot, to = %slot, "identity moved to a new slot");
                false
            } else {
                true
            }
        });

        self.slots.insert(slot, player_id.clone());
        self.accounts.insert(player_id.clone(), account);
        player_id
    }

    /// Removes the account signed in on `slot`.
    ///
    /// Returns the removed record, or `None` if the slot was empty.
    pub fn remove(&mut self, slot: LocalSlot) -> Option<AccountRecord> {
        let player_id = self.slots.remove(&slot)?;
        self.accounts.remove(&player_id)
    }

    /// Looks up an account by identity.
    pub fn account(&self, player_id: &UniquePlayerId) -> Option<&AccountRecord> {
        self.accounts.get(player_id)
    }

    /// Looks up the account signed in on `slot`.
    pub fn account_for_slot(&self, slot: LocalSlot) -> Option<&AccountRecord> {
        self.slots
            .get(&slot)
            .and_then(|player_id| self.accounts.get(player_id))
    }

    /// The identity signed in on `slot`, if any.
    pub fn player_id(&self, slot: LocalSlot) -> Option<&UniquePlayerId> {
        self.slots.get(&slot)
    }

    /// Reverse lookup: which slot an identity is signed in on.
    pub fn slot_of(&self, player_id: &UniquePlayerId) -> Option<LocalSlot> {
        self.slots
            .iter()
            .find(|(_, id)| *id == player_id)
            .map(|(slot, _)| *slot)
    }

    /// A snapshot copy of every stored account. Order is unspecified.
    pub fn accounts(&self) -> Vec<AccountRecord> {
        self.accounts.values().cloned().collect()
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if nobody is signed in.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
