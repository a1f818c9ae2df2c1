//! Replicas that see the same entries in different arrival orders must end
//! up with the same document.

use std::collections::HashSet;

use proptest::prelude::*;

use otm_engine::{DocumentSnapshot, MergeEngine};
use otm_text::TextOp;
use otm_types::{Entry, EntryId, ParentLink};

type Engine = MergeEngine<EntryId, TextOp>;
type TextEntry = Entry<EntryId, TextOp>;

fn id(index: usize) -> EntryId {
    EntryId::from(index as u64)
}

/// Author entries in their final list order.
///
/// Each step `(parent, pos, seed)` asks `edit` for an operation on the
/// document its writer had seen, the list up to its parent. Parents are drawn
/// from the linear prefix of the list, the only entries whose document a
/// writer can have observed without pending residues.
fn author(
    steps: &[(usize, usize, u8)],
    edit: impl Fn(usize, usize, u8) -> TextOp,
) -> Vec<TextEntry> {
    let mut engine = Engine::new();
    let root = Entry::new(id(0), TextOp::new().insert("_"), None);
    engine.insert(0, root.clone()).unwrap();

    let mut entries = vec![root];
    // (index, document length after that entry)
    let mut linear: Vec<(usize, usize)> = vec![(0, 1)];

    for &(parent, pos, seed) in steps {
        let index = entries.len();
        let (parent, len) = linear[parent % linear.len()];
        let entry = Entry::new(
            id(index),
            edit(len, pos, seed),
            Some(ParentLink::new(id(parent), 0)),
        );

        engine.insert(index, entry.clone()).unwrap();
        if engine.residue(&entry.id).is_none() {
            linear.push((index, engine.text().unwrap().chars().count()));
        }
        entries.push(entry);
    }
    entries
}

fn letter(seed: u8) -> String {
    char::from(b'a' + seed % 26).to_string()
}

/// A single-char insertion anywhere in the document.
fn insert_anywhere(len: usize, pos: usize, seed: u8) -> TextOp {
    TextOp::insert_at(len, pos % (len + 1), letter(seed)).unwrap()
}

/// A deletion of up to three chars, or a single-char append.
///
/// Inserts at arbitrary positions mixed with deletions are left out: the
/// transform pair only guarantees convergence for two concurrent operations,
/// and an insert tie reached through a deletion on one path but not the other
/// can order the two inserts differently.
fn delete_or_append(len: usize, pos: usize, seed: u8) -> TextOp {
    if len > 0 && seed % 2 == 0 {
        let at = pos % len;
        let count = 1 + usize::from(seed / 2) % (len - at).min(3);
        TextOp::delete_at(len, at, count).unwrap()
    } else {
        TextOp::insert_at(len, len, letter(seed)).unwrap()
    }
}

/// A delivery order in which every parent arrives before its children.
fn arrival(entries: &[TextEntry], picks: &[usize]) -> Vec<usize> {
    let parents: Vec<Option<usize>> = entries
        .iter()
        .map(|e| {
            e.latest()
                .and_then(|r| r.parent.as_ref())
                .and_then(|link| link.id.as_number())
                .map(|n| n as usize)
        })
        .collect();

    let mut delivered = vec![false; entries.len()];
    let mut order = Vec::with_capacity(entries.len());
    for step in 0..entries.len() {
        let ready: Vec<usize> = (0..entries.len())
            .filter(|&i| !delivered[i] && parents[i].map_or(true, |p| delivered[p]))
            .collect();
        let pick = ready[picks.get(step).copied().unwrap_or(0) % ready.len()];
        delivered[pick] = true;
        order.push(pick);
    }
    order
}

/// Feed entries to a fresh replica, checking that each returned effect keeps
/// the local view in step with the engine.
fn replay(entries: &[TextEntry], order: &[usize]) -> Engine {
    let mut engine = Engine::new();
    let mut present = vec![false; entries.len()];
    let mut view = String::new();

    for &i in order {
        let index = present[..i].iter().filter(|&&p| p).count();
        let effect = engine.insert(index, entries[i].clone()).unwrap();
        view = effect.apply(&view).unwrap();
        present[i] = true;
        assert_eq!(view, engine.text().unwrap());
    }
    engine
}

fn steps() -> impl Strategy<Value = Vec<(usize, usize, u8)>> {
    prop::collection::vec((any::<usize>(), any::<usize>(), any::<u8>()), 0..10)
}

fn picks() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<usize>(), 0..12)
}

proptest! {
    #[test]
    fn arrival_order_does_not_change_the_document(
        steps in steps(),
        picks_a in picks(),
        picks_b in picks(),
    ) {
        let entries = author(&steps, insert_anywhere);
        let expected = Engine::from_entries(entries.clone()).unwrap().text().unwrap();

        let a = replay(&entries, &arrival(&entries, &picks_a));
        let b = replay(&entries, &arrival(&entries, &picks_b));

        prop_assert_eq!(a.text().unwrap(), expected.clone());
        prop_assert_eq!(b.text().unwrap(), expected);
        prop_assert_eq!(a.recompose().unwrap(), b.recompose().unwrap());
        prop_assert_eq!(a.len(), entries.len());
    }

    #[test]
    fn deletes_and_appends_converge(
        steps in steps(),
        picks_a in picks(),
        picks_b in picks(),
    ) {
        let entries = author(&steps, delete_or_append);
        let expected = Engine::from_entries(entries.clone()).unwrap().text().unwrap();

        let a = replay(&entries, &arrival(&entries, &picks_a));
        let b = replay(&entries, &arrival(&entries, &picks_b));

        prop_assert_eq!(a.text().unwrap(), expected.clone());
        prop_assert_eq!(b.text().unwrap(), expected);
        prop_assert_eq!(a.len(), entries.len());
    }

    #[test]
    fn owner_rebase_linearises(steps in steps(), picks in picks()) {
        let entries = author(&steps, insert_anywhere);
        let mut engine = replay(&entries, &arrival(&entries, &picks))
            .with_own_ids(entries.iter().map(|e| e.id.clone()));
        let text = engine.text().unwrap();

        let mut passes = 0;
        while !engine.rebase().is_empty() {
            passes += 1;
            prop_assert!(passes <= entries.len());
        }

        prop_assert!(engine.is_linear());
        prop_assert!(entries.iter().all(|e| engine.residue(&e.id).is_none()));
        prop_assert_eq!(engine.text().unwrap(), text.clone());

        let restored = DocumentSnapshot::capture(&engine).restore().unwrap();
        prop_assert!(restored.is_linear());
        prop_assert_eq!(restored.text().unwrap(), text);
    }

    #[test]
    fn rebase_without_owned_entries_changes_nothing(steps in steps(), picks in picks()) {
        let entries = author(&steps, insert_anywhere);
        let mut engine = replay(&entries, &arrival(&entries, &picks));
        let before = DocumentSnapshot::capture(&engine);

        prop_assert!(engine.rebase().is_empty());
        prop_assert!(engine.rebase_with(&HashSet::new()).is_empty());
        prop_assert_eq!(DocumentSnapshot::capture(&engine), before);
    }
}
