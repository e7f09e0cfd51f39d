//! Bookkeeping for transfers currently under supervision.
//!
//! An entry lives exactly from admission (start or attach requested) until
//! its driver observes a terminal outcome. Pause/resume/cancel look
//! transfers up here, so admission must happen before the engine call is
//! issued.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::engine::{TransferHandle, TransferId};

/// A handle for this identity is already being supervised.
///
/// Identities are engine-assigned and unique, so this should not occur;
/// the check stays as an invariant guard against double supervision.
#[derive(Debug)]
pub struct DuplicateIdentity(pub TransferId);

impl fmt::Display for DuplicateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transfer {} is already tracked", self.0)
    }
}

impl std::error::Error for DuplicateIdentity {}

/// Identity → handle map of transfers under supervision.
#[derive(Default)]
pub struct ActiveRegistry {
    entries: RwLock<HashMap<TransferId, Arc<dyn TransferHandle>>>,
}

impl ActiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a handle under its identity. Refuses duplicates.
    pub fn admit(
        &self,
        id: TransferId,
        handle: Arc<dyn TransferHandle>,
    ) -> Result<(), DuplicateIdentity> {
        match self.entries.write().unwrap().entry(id) {
            Entry::Occupied(_) => Err(DuplicateIdentity(id)),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    /// Remove an entry. Idempotent: a driver from a previous epoch finishing
    /// after a cancel-all reset removes against the fresh map, which is a
    /// deliberate no-op.
    pub fn remove(&self, id: TransferId) {
        self.entries.write().unwrap().remove(&id);
    }

    /// The handle registered under `id`, if any.
    pub fn lookup(&self, id: TransferId) -> Option<Arc<dyn TransferHandle>> {
        self.entries.read().unwrap().get(&id).cloned()
    }

    /// Copy-on-read snapshot of the registered handles. Safe to iterate
    /// while admits and removes continue on other transfers.
    pub fn snapshot(&self) -> Vec<Arc<dyn TransferHandle>> {
        self.entries.read().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Swap in an empty table, orphaning entries from the previous epoch.
    pub(crate) fn reset(&self) {
        self.entries.write().unwrap().clear();
    }
}
