//! The merge engine.
//!
//! [`MergeEngine`] keeps entries in the order the ordered-list store
//! converged on. Each slot carries the entry itself, the operation currently
//! effective at that position (`applied`), and an optional pending
//! `residue`: transform work against entries that landed between the entry's
//! declared parent and its real position.
//!
//! # Invariants
//!
//! - Entry ids are unique within the list.
//! - Every parent link resolves to an entry earlier in the list.
//! - Composing the applied operations in list order yields the document.
//! - Revision histories only grow; `rebased` may append but never rewrite.

use std::collections::HashSet;

use tracing::{debug, warn};

use otm_types::{Entry, EntryKey, Operation, ParentLink, Revision, TypeError};

use crate::error::{MergeError, MergeResult};

/// A revision minted by [`MergeEngine::rebase`], with the list index of the
/// entry it belongs to.
pub type Minted<I, O> = (usize, Revision<I, O>);

#[derive(Clone, Debug)]
struct Slot<I, O> {
    entry: Entry<I, O>,
    applied: O,
    residue: Option<O>,
}

/// Result of catching an operation up with its parent's history.
struct CatchUp<O> {
    op: O,
    residue: Option<O>,
    parent_index: Option<usize>,
}

/// Position-indexed ledger of operation entries.
///
/// All methods run to completion synchronously. Callers serialise access to
/// one engine per open document.
#[derive(Clone, Debug)]
pub struct MergeEngine<I, O> {
    /// Entries with their derived state, in list order.
    slots: Vec<Slot<I, O>>,
    /// Entries created locally; only these gain revisions in `rebase`.
    own_ids: HashSet<I>,
}

impl<I: EntryKey, O: Operation> Default for MergeEngine<I, O> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            own_ids: HashSet::new(),
        }
    }
}

impl<I: EntryKey, O: Operation> MergeEngine<I, O> {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine by replaying [`insert`](Self::insert) for each entry
    /// at successive indices.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry<I, O>>) -> MergeResult<Self> {
        let mut engine = Self::new();
        for (index, entry) in entries.into_iter().enumerate() {
            engine.insert(index, entry)?;
        }
        Ok(engine)
    }

    /// Mark `ids` as created locally.
    pub fn with_own_ids(mut self, ids: impl IntoIterator<Item = I>) -> Self {
        self.own_ids.extend(ids);
        self
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no entry has been recorded.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entries in list order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry<I, O>> + '_ {
        self.slots.iter().map(|slot| &slot.entry)
    }

    /// Consume the engine, returning its entries in list order.
    pub fn into_entries(self) -> Vec<Entry<I, O>> {
        self.slots.into_iter().map(|slot| slot.entry).collect()
    }

    /// Position of `id` in list order.
    pub fn index_of(&self, id: &I) -> Option<usize> {
        self.slots.iter().position(|slot| &slot.entry.id == id)
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &I) -> Option<&Entry<I, O>> {
        self.slot(id).map(|slot| &slot.entry)
    }

    /// The operation currently effective at `id`'s position.
    pub fn applied(&self, id: &I) -> Option<&O> {
        self.slot(id).map(|slot| &slot.applied)
    }

    /// The residue `id` is carrying, if any.
    pub fn residue(&self, id: &I) -> Option<&O> {
        self.slot(id).and_then(|slot| slot.residue.as_ref())
    }

    /// Returns `true` if `id` was created by this writer.
    pub fn is_owned(&self, id: &I) -> bool {
        self.own_ids.contains(id)
    }

    /// Ids created by this writer.
    pub fn own_ids(&self) -> &HashSet<I> {
        &self.own_ids
    }

    /// Newest-revision operations, unadjusted, in list order.
    pub fn raw(&self) -> Vec<&O> {
        self.slots
            .iter()
            .filter_map(|slot| slot.entry.latest().map(|r| &r.op))
            .collect()
    }

    /// Currently effective operations in list order.
    pub fn seq(&self) -> Vec<&O> {
        self.slots.iter().map(|slot| &slot.applied).collect()
    }

    fn slot(&self, id: &I) -> Option<&Slot<I, O>> {
        self.slots.iter().find(|slot| &slot.entry.id == id)
    }

    fn tail_link(&self) -> Option<ParentLink<I>> {
        self.slots.last().and_then(|slot| slot.entry.link())
    }

    // ---------------------------------------------------------------
    // Local authoring
    // ---------------------------------------------------------------

    /// Build, without recording, a first revision for a new local entry. Its
    /// parent is the current tail.
    ///
    /// Other replicas read `op` against the tail's newest revision. While the
    /// tail still carries a residue the local view is ahead of that revision
    /// and the entry will fail their `insert`; rebase the tail first.
    pub fn new_operation(&self, op: O, id: I) -> Entry<I, O> {
        if let Some(tail) = self.slots.last().filter(|slot| slot.residue.is_some()) {
            warn!(
                tail = %tail.entry.id,
                id = %id,
                "authoring on a tail with a pending residue"
            );
        }
        Entry::new(id, op, self.tail_link())
    }

    /// Returns `true` if the tail carries a residue, so that entries from
    /// [`new_operation`](Self::new_operation) would not apply elsewhere.
    pub fn tail_pending(&self) -> bool {
        self.slots.last().is_some_and(|slot| slot.residue.is_some())
    }

    /// Record a durable local entry at the tail and mark it owned.
    ///
    /// The entry must continue from the current tail, as produced by
    /// [`new_operation`](Self::new_operation). An `insert` that lands at the
    /// tail while the caller waits for a durable id makes the entry stale
    /// ([`MergeError::StaleParent`]); build it again with `new_operation`
    /// after any such insert.
    pub fn push(&mut self, entry: Entry<I, O>) -> MergeResult<()> {
        self.try_push(entry)
            .inspect_err(|err| warn!(error = %err, "push rejected"))
    }

    fn try_push(&mut self, entry: Entry<I, O>) -> MergeResult<()> {
        let latest = newest(&entry)?;
        if self.index_of(&entry.id).is_some() {
            return Err(MergeError::DuplicateEntry(entry.id.to_string()));
        }
        let tail = self.tail_link();
        if latest.parent != tail {
            return Err(MergeError::StaleParent {
                id: entry.id.to_string(),
                expected: describe(tail.as_ref()),
                found: describe(latest.parent.as_ref()),
            });
        }

        let applied = latest.op.clone();
        debug!(index = self.slots.len(), id = %entry.id, "pushed local entry");
        self.own_ids.insert(entry.id.clone());
        self.slots.push(Slot {
            entry,
            applied,
            residue: None,
        });
        Ok(())
    }

    // ---------------------------------------------------------------
    // Remote entries
    // ---------------------------------------------------------------

    /// Insert a newly observed entry at `index` in list order.
    ///
    /// Returns the operation to apply to the local view now. Either every
    /// slot is updated or, on error, none is.
    pub fn insert(&mut self, index: usize, entry: Entry<I, O>) -> MergeResult<O> {
        self.try_insert(index, entry)
            .inspect_err(|err| warn!(index, error = %err, "insert rejected"))
    }

    fn try_insert(&mut self, index: usize, entry: Entry<I, O>) -> MergeResult<O> {
        let latest = newest(&entry)?;
        if index > self.slots.len() {
            return Err(MergeError::IndexOutOfBounds {
                index,
                len: self.slots.len(),
            });
        }
        if self.index_of(&entry.id).is_some() {
            return Err(MergeError::DuplicateEntry(entry.id.to_string()));
        }

        let CatchUp {
            mut op,
            mut residue,
            parent_index,
        } = self.catch_up(&entry.id, latest)?;

        let start = match parent_index {
            Some(parent_index) if parent_index >= index => {
                return Err(MergeError::ParentAfterEntry {
                    id: entry.id.to_string(),
                    parent: describe(latest.parent.as_ref()),
                    index,
                    parent_index,
                });
            }
            Some(parent_index) => parent_index + 1,
            None => 0,
        };

        // Siblings between the parent and the insertion point were unknown
        // to the author.
        for sibling in &self.slots[start..index] {
            let (left, right) = transform(&sibling.applied, &op)?;
            residue = compose_opt(residue, left)?;
            op = right;
        }

        // Successors now have to make room for the new entry.
        let mut incoming = op.clone();
        let mut staged = Vec::with_capacity(self.slots.len() - index);
        for successor in &self.slots[index..] {
            let (left, right) = transform(&incoming, &successor.applied)?;
            let successor_residue = compose_opt(successor.residue.clone(), left.clone())?;
            staged.push((right, successor_residue));
            incoming = left;
        }

        debug!(
            index,
            id = %entry.id,
            successors = staged.len(),
            pending = residue.is_some(),
            "inserted entry"
        );
        for (slot, (applied, residue)) in self.slots[index..].iter_mut().zip(staged) {
            slot.applied = applied;
            slot.residue = residue;
        }
        self.slots.insert(
            index,
            Slot {
                entry,
                applied: op,
                residue,
            },
        );
        Ok(incoming)
    }

    /// Accept an owner's rebase output for the entry at `index`.
    ///
    /// The new history must extend the stored one, and replaying its newest
    /// revision must reproduce the tracked applied operation.
    pub fn rebased(&mut self, index: usize, entry: Entry<I, O>) -> MergeResult<()> {
        self.try_rebased(index, entry)
            .inspect_err(|err| warn!(index, error = %err, "rebased entry rejected"))
    }

    fn try_rebased(&mut self, index: usize, entry: Entry<I, O>) -> MergeResult<()> {
        let latest = newest(&entry)?;
        let current = self.slots.get(index).ok_or(MergeError::IndexOutOfBounds {
            index,
            len: self.slots.len(),
        })?;
        if current.entry.id != entry.id {
            return Err(MergeError::EntryMismatch {
                index,
                expected: current.entry.id.to_string(),
                found: entry.id.to_string(),
            });
        }
        let known = &current.entry.revisions;
        if entry.revisions.len() < known.len() || entry.revisions[..known.len()] != known[..] {
            return Err(MergeError::HistoryRewritten(entry.id.to_string()));
        }

        let CatchUp {
            op,
            residue,
            parent_index,
        } = self.catch_up(&entry.id, latest)?;
        if let Some(parent_index) = parent_index.filter(|&p| p >= index) {
            return Err(MergeError::ParentAfterEntry {
                id: entry.id.to_string(),
                parent: describe(latest.parent.as_ref()),
                index,
                parent_index,
            });
        }
        if op != current.applied {
            return Err(MergeError::DivergentApplied(entry.id.to_string()));
        }

        debug!(
            index,
            id = %entry.id,
            revisions = entry.revisions.len(),
            pending = residue.is_some(),
            "applied rebased entry"
        );
        if let Some(slot) = self.slots.get_mut(index) {
            slot.entry = entry;
            slot.residue = residue;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Rebase
    // ---------------------------------------------------------------

    /// Fold pending residues of this writer's entries into new revisions.
    pub fn rebase(&mut self) -> Vec<Minted<I, O>> {
        let own = std::mem::take(&mut self.own_ids);
        let minted = self.rebase_with(&own);
        self.own_ids = own;
        minted
    }

    /// Fold pending residues of the entries in `own` into new revisions.
    ///
    /// Scans in list order and stops at the first entry whose newest parent
    /// is not its predecessor. Returns the minted revisions, which the caller
    /// records durably and broadcasts for other writers' `rebased`.
    pub fn rebase_with(&mut self, own: &HashSet<I>) -> Vec<Minted<I, O>> {
        let mut minted = Vec::new();
        let mut last: Option<ParentLink<I>> = None;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if own.contains(&slot.entry.id) {
                if let Some(residue) = slot.residue.take() {
                    let revision = Revision::rebased(slot.applied.clone(), last.clone(), residue);
                    slot.entry.revisions.push(revision.clone());
                    debug!(
                        index,
                        id = %slot.entry.id,
                        revision = slot.entry.revisions.len() - 1,
                        "minted revision"
                    );
                    minted.push((index, revision));
                }
            }

            let parent = slot.entry.latest().and_then(|r| r.parent.as_ref());
            if parent != last.as_ref() {
                debug!(index, id = %slot.entry.id, "rebase stopped at non-linear entry");
                break;
            }
            last = slot.entry.link();
        }

        minted
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Returns `true` if list order matches causal order: every entry's
    /// newest parent is the entry right before it.
    pub fn is_linear(&self) -> bool {
        let mut last: Option<ParentLink<I>> = None;
        for slot in &self.slots {
            let parent = slot.entry.latest().and_then(|r| r.parent.as_ref());
            if parent != last.as_ref() {
                return false;
            }
            last = slot.entry.link();
        }
        true
    }

    /// Compose the applied operations in list order.
    pub fn recompose(&self) -> MergeResult<O> {
        let mut doc: Option<O> = None;
        for slot in &self.slots {
            doc = compose_opt(doc, slot.applied.clone())?;
        }
        Ok(doc.unwrap_or_default())
    }

    /// The document text.
    pub fn text(&self) -> MergeResult<String> {
        let doc = self.recompose()?;
        doc.inserted_text()
            .map(str::to_owned)
            .ok_or(MergeError::NotAnInsertion)
    }

    // ---------------------------------------------------------------
    // Transform propagation
    // ---------------------------------------------------------------

    /// Bring `revision`'s operation forward from its declared parent revision
    /// to the parent's current state.
    fn catch_up(&self, id: &I, revision: &Revision<I, O>) -> MergeResult<CatchUp<O>> {
        let mut op = revision.op.clone();
        let Some(link) = &revision.parent else {
            return Ok(CatchUp {
                op,
                residue: None,
                parent_index: None,
            });
        };

        let parent_index = self
            .index_of(&link.id)
            .ok_or_else(|| MergeError::MissingParent {
                id: id.to_string(),
                parent: link.id.to_string(),
            })?;
        let parent = &self.slots[parent_index];
        let available = parent.entry.revisions.len();
        if link.revision >= available {
            return Err(MergeError::ParentRevisionOutOfRange {
                id: id.to_string(),
                parent: link.id.to_string(),
                revision: link.revision,
                available,
            });
        }

        // The left outputs pair with work already folded into the parent's
        // later revisions.
        for later in &parent.entry.revisions[link.revision + 1..] {
            if let Some(residue) = &later.residue {
                let (_, right) = transform(residue, &op)?;
                op = right;
            }
        }

        let mut residue = None;
        if let Some(pending) = &parent.residue {
            let (left, right) = transform(pending, &op)?;
            residue = Some(left);
            op = right;
        }

        Ok(CatchUp {
            op,
            residue,
            parent_index: Some(parent_index),
        })
    }
}

impl<I: EntryKey, O: Operation> TryFrom<Vec<Entry<I, O>>> for MergeEngine<I, O> {
    type Error = MergeError;

    fn try_from(entries: Vec<Entry<I, O>>) -> MergeResult<Self> {
        Self::from_entries(entries)
    }
}

/// The newest revision of a structurally valid entry.
fn newest<I: EntryKey, O>(entry: &Entry<I, O>) -> MergeResult<&Revision<I, O>> {
    entry.validate()?;
    entry.latest().ok_or_else(|| {
        MergeError::MalformedEntry(TypeError::EmptyHistory {
            id: entry.id.to_string(),
        })
    })
}

fn describe<I: EntryKey>(link: Option<&ParentLink<I>>) -> String {
    link.map_or_else(|| "none".to_string(), ToString::to_string)
}

fn transform<O: Operation>(left: &O, right: &O) -> MergeResult<(O, O)> {
    left.transform(right).map_err(MergeError::algebra)
}

/// Compose with `None` as the identity.
fn compose_opt<O: Operation>(acc: Option<O>, next: O) -> MergeResult<Option<O>> {
    match acc {
        None => Ok(Some(next)),
        Some(acc) => acc.compose(&next).map(Some).map_err(MergeError::algebra),
    }
}
