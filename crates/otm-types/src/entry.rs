//! Entry and revision records.
//!
//! These are the persisted and transported shapes. Field names on the wire
//! are fixed for interop: an entry is `{id, v: [revision, ...]}` and a
//! revision is `{o, p?: [parentId, parentRevisionIndex], r?}`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// The entry revision a new revision was causally derived from.
///
/// Serialised as the two-element array `[id, revision]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParentLink<I> {
    /// Identity of the parent entry.
    pub id: I,
    /// Index into the parent entry's revision list.
    pub revision: usize,
}

impl<I> ParentLink<I> {
    pub fn new(id: I, revision: usize) -> Self {
        Self { id, revision }
    }
}

impl<I: Serialize> Serialize for ParentLink<I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.id, self.revision).serialize(serializer)
    }
}

impl<'de, I: Deserialize<'de>> Deserialize<'de> for ParentLink<I> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (id, revision) = <(I, usize)>::deserialize(deserializer)?;
        Ok(Self { id, revision })
    }
}

impl<I: fmt::Display> fmt::Display for ParentLink<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.revision)
    }
}

/// One version of an entry's operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Revision<I, O> {
    /// The operation as understood when this revision was authored, relative
    /// to the declared parent.
    #[serde(rename = "o")]
    pub op: O,
    /// Causal parent. Absent only for a document's very first operation.
    #[serde(rename = "p", skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink<I>>,
    /// Transform remainder between the previous revision's context and this
    /// one's. Present on every revision after the first.
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub residue: Option<O>,
}

impl<I, O> Revision<I, O> {
    /// A first revision: no residue.
    pub fn initial(op: O, parent: Option<ParentLink<I>>) -> Self {
        Self {
            op,
            parent,
            residue: None,
        }
    }

    /// A follow-up revision produced by a rebase.
    pub fn rebased(op: O, parent: Option<ParentLink<I>>, residue: O) -> Self {
        Self {
            op,
            parent,
            residue: Some(residue),
        }
    }
}

/// A writer-authored logical edit with its append-only revision history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry<I, O> {
    /// Identity assigned by the ordered-list storage; never reused.
    pub id: I,
    /// Revisions, oldest first.
    #[serde(rename = "v")]
    pub revisions: Vec<Revision<I, O>>,
}

impl<I: Clone, O> Entry<I, O> {
    /// A fresh entry with a single revision.
    pub fn new(id: I, op: O, parent: Option<ParentLink<I>>) -> Self {
        Self {
            id,
            revisions: vec![Revision::initial(op, parent)],
        }
    }

    /// The newest revision.
    pub fn latest(&self) -> Option<&Revision<I, O>> {
        self.revisions.last()
    }

    /// Index of the newest revision.
    pub fn latest_index(&self) -> Option<usize> {
        self.revisions.len().checked_sub(1)
    }

    /// Link naming this entry's newest revision, as a child would declare it.
    pub fn link(&self) -> Option<ParentLink<I>> {
        self.latest_index()
            .map(|revision| ParentLink::new(self.id.clone(), revision))
    }
}

impl<I: Clone + fmt::Display, O> Entry<I, O> {
    /// Check the structural rules every recorded entry satisfies: at least one
    /// revision, no residue on revision 0, a residue on every later one.
    pub fn validate(&self) -> Result<(), TypeError> {
        let Some(first) = self.revisions.first() else {
            return Err(TypeError::EmptyHistory {
                id: self.id.to_string(),
            });
        };
        if first.residue.is_some() {
            return Err(TypeError::UnexpectedResidue {
                id: self.id.to_string(),
            });
        }
        if let Some(revision) = self
            .revisions
            .iter()
            .skip(1)
            .position(|r| r.residue.is_none())
        {
            return Err(TypeError::MissingResidue {
                id: self.id.to_string(),
                revision: revision + 1,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntryId;

    type TestEntry = Entry<EntryId, String>;

    #[test]
    fn first_entry_has_no_parent_on_the_wire() {
        let entry = TestEntry::new(EntryId::from(0), "a".into(), None);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"id": 0, "v": [{"o": "a"}]}));
    }

    #[test]
    fn parent_link_is_a_pair() {
        let entry = TestEntry::new(
            EntryId::from(1),
            "b".into(),
            Some(ParentLink::new(EntryId::from(0), 0)),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["v"][0]["p"], serde_json::json!([0, 0]));

        let back: TestEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn decodes_residue_and_string_ids() {
        let entry: TestEntry = serde_json::from_str(
            r#"{"id":"w:2","v":[{"o":"x"},{"o":"y","p":["w:1",0],"r":"z"}]}"#,
        )
        .unwrap();
        assert_eq!(entry.id, EntryId::from("w:2"));
        assert_eq!(entry.latest_index(), Some(1));
        let latest = entry.latest().unwrap();
        assert_eq!(latest.residue.as_deref(), Some("z"));
        assert_eq!(
            latest.parent,
            Some(ParentLink::new(EntryId::from("w:1"), 0))
        );
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn link_names_newest_revision() {
        let mut entry = TestEntry::new(EntryId::from(4), "a".into(), None);
        entry
            .revisions
            .push(Revision::rebased("b".into(), None, "r".into()));
        assert_eq!(entry.link(), Some(ParentLink::new(EntryId::from(4), 1)));
    }

    #[test]
    fn validate_rejects_empty_history() {
        let entry = TestEntry {
            id: EntryId::from(9),
            revisions: vec![],
        };
        assert_eq!(
            entry.validate(),
            Err(TypeError::EmptyHistory { id: "9".into() })
        );
        assert!(entry.link().is_none());
    }

    #[test]
    fn validate_checks_residue_placement() {
        let mut entry = TestEntry::new(EntryId::from(1), "a".into(), None);
        entry.revisions[0].residue = Some("r".into());
        assert!(matches!(
            entry.validate(),
            Err(TypeError::UnexpectedResidue { .. })
        ));

        let mut entry = TestEntry::new(EntryId::from(1), "a".into(), None);
        entry.revisions.push(Revision::initial("b".into(), None));
        assert_eq!(
            entry.validate(),
            Err(TypeError::MissingResidue {
                id: "1".into(),
                revision: 1
            })
        );
    }

    #[test]
    fn parent_link_display() {
        let link = ParentLink::new(EntryId::from("a"), 3);
        assert_eq!(link.to_string(), "a@3");
    }
}
