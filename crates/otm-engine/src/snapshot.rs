//! Document snapshots: the entry list as it is stored and shipped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use otm_types::{Entry, EntryKey, Operation};

use crate::engine::MergeEngine;
use crate::error::{MergeError, MergeResult};

/// Entries of one document in list order.
///
/// Serialises as a bare JSON array of `{id, v}` records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSnapshot<I, O> {
    pub entries: Vec<Entry<I, O>>,
}

impl<I: EntryKey, O: Operation> DocumentSnapshot<I, O> {
    /// Copy the engine's entries.
    pub fn capture(engine: &MergeEngine<I, O>) -> Self {
        Self {
            entries: engine.entries().cloned().collect(),
        }
    }

    /// Hydrate an engine by replaying every entry.
    ///
    /// Ownership is not part of a snapshot; see
    /// [`MergeEngine::with_own_ids`].
    pub fn restore(self) -> MergeResult<MergeEngine<I, O>> {
        MergeEngine::from_entries(self.entries)
    }

    /// The document text this snapshot describes.
    pub fn text(&self) -> MergeResult<String> {
        self.clone().restore()?.text()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I, O> DocumentSnapshot<I, O>
where
    I: Serialize + DeserializeOwned,
    O: Serialize + DeserializeOwned,
{
    pub fn to_json(&self) -> MergeResult<String> {
        serde_json::to_string(self).map_err(|e| MergeError::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> MergeResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| MergeError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> MergeResult<Self> {
        serde_json::from_str(json).map_err(|e| MergeError::Serialization(e.to_string()))
    }
}

impl<I, O> From<Vec<Entry<I, O>>> for DocumentSnapshot<I, O> {
    fn from(entries: Vec<Entry<I, O>>) -> Self {
        Self { entries }
    }
}
