//! The text operation type and its algebra.
//!
//! A [`TextOp`] walks the whole base document: retains and deletes consume
//! base characters, inserts produce new ones. Components are kept normalised
//! (no empty segments, same-kind neighbours merged, inserts ahead of deletes)
//! so that operations describing the same edit compare equal.

use otm_types::Operation;

use crate::error::{OtError, OtResult};

/// One segment of a text operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Component {
    /// Keep the next `n` characters.
    Retain(usize),
    /// Insert text at the current position.
    Insert(String),
    /// Remove the next `n` characters.
    Delete(usize),
}

impl Component {
    /// Characters consumed from the base document.
    pub fn base_len(&self) -> usize {
        match self {
            Self::Retain(n) | Self::Delete(n) => *n,
            Self::Insert(_) => 0,
        }
    }

    /// Characters produced in the target document.
    pub fn target_len(&self) -> usize {
        match self {
            Self::Retain(n) => *n,
            Self::Insert(s) => s.chars().count(),
            Self::Delete(_) => 0,
        }
    }
}

/// A normalised retain / insert / delete operation over a text document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextOp {
    components: Vec<Component>,
    base_len: usize,
    target_len: usize,
}

impl TextOp {
    /// The empty operation over an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an operation from raw components, normalising as it goes.
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        let mut op = Self::new();
        for component in components {
            op.push(component);
        }
        op
    }

    /// Builder: keep `n` characters.
    pub fn retain(mut self, n: usize) -> Self {
        self.push_retain(n);
        self
    }

    /// Builder: insert `text`.
    pub fn insert(mut self, text: impl Into<String>) -> Self {
        self.push_insert(text.into());
        self
    }

    /// Builder: remove `n` characters.
    pub fn delete(mut self, n: usize) -> Self {
        self.push_delete(n);
        self
    }

    /// Insert `text` at `pos` in a document of `doc_len` characters.
    pub fn insert_at(doc_len: usize, pos: usize, text: impl Into<String>) -> OtResult<Self> {
        if pos > doc_len {
            return Err(OtError::OutOfRange {
                pos,
                end: pos,
                len: doc_len,
            });
        }
        Ok(Self::new()
            .retain(pos)
            .insert(text)
            .retain(doc_len - pos))
    }

    /// Remove `count` characters starting at `pos` in a document of
    /// `doc_len` characters.
    pub fn delete_at(doc_len: usize, pos: usize, count: usize) -> OtResult<Self> {
        let end = pos + count;
        if end > doc_len {
            return Err(OtError::OutOfRange {
                pos,
                end,
                len: doc_len,
            });
        }
        Ok(Self::new().retain(pos).delete(count).retain(doc_len - end))
    }

    /// The normalised components.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Length of the document this operation applies to.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Length of the document this operation produces.
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Returns `true` if applying this operation changes nothing.
    pub fn is_noop(&self) -> bool {
        self.components
            .iter()
            .all(|c| matches!(c, Component::Retain(_)))
    }

    pub(crate) fn push(&mut self, component: Component) {
        match component {
            Component::Retain(n) => self.push_retain(n),
            Component::Insert(s) => self.push_insert(s),
            Component::Delete(n) => self.push_delete(n),
        }
    }

    pub(crate) fn push_retain(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.base_len += n;
        self.target_len += n;
        match self.components.last_mut() {
            Some(Component::Retain(last)) => *last += n,
            _ => self.components.push(Component::Retain(n)),
        }
    }

    pub(crate) fn push_insert(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.target_len += text.chars().count();
        match self.components.last_mut() {
            Some(Component::Insert(last)) => {
                last.push_str(&text);
                return;
            }
            Some(Component::Delete(_)) => {}
            _ => {
                self.components.push(Component::Insert(text));
                return;
            }
        }
        // Insert-after-delete and delete-after-insert are the same edit;
        // keep the insert first.
        let at = self.components.len() - 1;
        match at.checked_sub(1).and_then(|i| self.components.get_mut(i)) {
            Some(Component::Insert(prev)) => prev.push_str(&text),
            _ => self.components.insert(at, Component::Insert(text)),
        }
    }

    pub(crate) fn push_delete(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.base_len += n;
        match self.components.last_mut() {
            Some(Component::Delete(last)) => *last += n,
            _ => self.components.push(Component::Delete(n)),
        }
    }

    /// Apply this operation to `text`.
    pub fn apply(&self, text: &str) -> OtResult<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() != self.base_len {
            return Err(OtError::ApplyLengthMismatch {
                expected: self.base_len,
                actual: chars.len(),
            });
        }

        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        for component in &self.components {
            match component {
                Component::Retain(n) => {
                    out.extend(&chars[pos..pos + n]);
                    pos += n;
                }
                Component::Insert(s) => out.push_str(s),
                Component::Delete(n) => pos += n,
            }
        }
        Ok(out)
    }

    /// Sequential composition: `self` followed by `other`.
    pub fn compose(&self, other: &TextOp) -> OtResult<TextOp> {
        if self.target_len != other.base_len {
            return Err(OtError::ComposeLengthMismatch {
                first_target: self.target_len,
                second_base: other.base_len,
            });
        }

        let mut result = TextOp::new();
        let mut left = self.components.iter().cloned();
        let mut right = other.components.iter().cloned();
        let mut a = left.next();
        let mut b = right.next();

        loop {
            match (a.take(), b.take()) {
                (None, None) => break,
                (Some(Component::Delete(n)), rest) => {
                    result.push_delete(n);
                    a = left.next();
                    b = rest;
                }
                (rest, Some(Component::Insert(s))) => {
                    result.push_insert(s);
                    a = rest;
                    b = right.next();
                }
                (Some(Component::Retain(x)), Some(Component::Retain(y))) => {
                    let n = x.min(y);
                    result.push_retain(n);
                    a = remainder(Component::Retain, x, n, &mut left);
                    b = remainder(Component::Retain, y, n, &mut right);
                }
                (Some(Component::Retain(x)), Some(Component::Delete(y))) => {
                    let n = x.min(y);
                    result.push_delete(n);
                    a = remainder(Component::Retain, x, n, &mut left);
                    b = remainder(Component::Delete, y, n, &mut right);
                }
                (Some(Component::Insert(s)), Some(Component::Retain(y))) => {
                    let len = s.chars().count();
                    if len <= y {
                        result.push_insert(s);
                        a = left.next();
                        b = remainder(Component::Retain, y, len, &mut right);
                    } else {
                        let (head, tail) = split_chars(&s, y);
                        result.push_insert(head);
                        a = Some(Component::Insert(tail));
                        b = right.next();
                    }
                }
                (Some(Component::Insert(s)), Some(Component::Delete(y))) => {
                    // Inserted then removed: neither survives.
                    let len = s.chars().count();
                    if len <= y {
                        a = left.next();
                        b = remainder(Component::Delete, y, len, &mut right);
                    } else {
                        let (_, tail) = split_chars(&s, y);
                        a = Some(Component::Insert(tail));
                        b = right.next();
                    }
                }
                (Some(_), None) | (None, Some(_)) => {
                    return Err(OtError::ComposeLengthMismatch {
                        first_target: self.target_len,
                        second_base: other.base_len,
                    });
                }
            }
        }

        Ok(result)
    }

    /// Inclusion transform of two operations authored against the same
    /// document.
    ///
    /// Returns `(self', other')` where `self'` applies after `other` and
    /// `other'` applies after `self`. Insertions at the same position are
    /// ordered with `self`'s text first.
    pub fn transform(&self, other: &TextOp) -> OtResult<(TextOp, TextOp)> {
        if self.base_len != other.base_len {
            return Err(OtError::TransformLengthMismatch {
                left_base: self.base_len,
                right_base: other.base_len,
            });
        }

        let mut left_prime = TextOp::new();
        let mut right_prime = TextOp::new();
        let mut left = self.components.iter().cloned();
        let mut right = other.components.iter().cloned();
        let mut a = left.next();
        let mut b = right.next();

        loop {
            match (a.take(), b.take()) {
                (None, None) => break,
                (Some(Component::Insert(s)), rest) => {
                    right_prime.push_retain(s.chars().count());
                    left_prime.push_insert(s);
                    a = left.next();
                    b = rest;
                }
                (rest, Some(Component::Insert(s))) => {
                    left_prime.push_retain(s.chars().count());
                    right_prime.push_insert(s);
                    a = rest;
                    b = right.next();
                }
                (Some(Component::Retain(x)), Some(Component::Retain(y))) => {
                    let n = x.min(y);
                    left_prime.push_retain(n);
                    right_prime.push_retain(n);
                    a = remainder(Component::Retain, x, n, &mut left);
                    b = remainder(Component::Retain, y, n, &mut right);
                }
                (Some(Component::Delete(x)), Some(Component::Delete(y))) => {
                    // Both removed the same characters.
                    let n = x.min(y);
                    a = remainder(Component::Delete, x, n, &mut left);
                    b = remainder(Component::Delete, y, n, &mut right);
                }
                (Some(Component::Delete(x)), Some(Component::Retain(y))) => {
                    let n = x.min(y);
                    left_prime.push_delete(n);
                    a = remainder(Component::Delete, x, n, &mut left);
                    b = remainder(Component::Retain, y, n, &mut right);
                }
                (Some(Component::Retain(x)), Some(Component::Delete(y))) => {
                    let n = x.min(y);
                    right_prime.push_delete(n);
                    a = remainder(Component::Retain, x, n, &mut left);
                    b = remainder(Component::Delete, y, n, &mut right);
                }
                (Some(_), None) | (None, Some(_)) => {
                    return Err(OtError::TransformLengthMismatch {
                        left_base: self.base_len,
                        right_base: other.base_len,
                    });
                }
            }
        }

        Ok((left_prime, right_prime))
    }
}

impl Operation for TextOp {
    type Error = OtError;

    fn transform(&self, other: &Self) -> Result<(Self, Self), Self::Error> {
        TextOp::transform(self, other)
    }

    fn compose(&self, other: &Self) -> Result<Self, Self::Error> {
        TextOp::compose(self, other)
    }

    fn inserted_text(&self) -> Option<&str> {
        if self.base_len != 0 {
            return None;
        }
        match self.components.as_slice() {
            [] => Some(""),
            [Component::Insert(s)] => Some(s),
            _ => None,
        }
    }
}

/// The unconsumed part of a counted component, or the next component once
/// it is exhausted.
fn remainder(
    kind: fn(usize) -> Component,
    total: usize,
    used: usize,
    rest: &mut impl Iterator<Item = Component>,
) -> Option<Component> {
    if total > used {
        Some(kind(total - used))
    } else {
        rest.next()
    }
}

/// Split `s` after its first `n` chars.
fn split_chars(s: &str, n: usize) -> (String, String) {
    let at = s.char_indices().nth(n).map_or(s.len(), |(i, _)| i);
    (s[..at].to_string(), s[at..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn apply_insert_and_delete() {
        let op = TextOp::new().retain(5).insert(" world");
        assert_eq!(op.apply("hello").unwrap(), "hello world");

        let op = TextOp::delete_at(11, 5, 6).unwrap();
        assert_eq!(op.apply("hello world").unwrap(), "hello");
    }

    #[test]
    fn apply_rejects_wrong_length() {
        let op = TextOp::new().retain(3);
        assert_eq!(
            op.apply("hello"),
            Err(OtError::ApplyLengthMismatch {
                expected: 3,
                actual: 5
            })
        );
    }

    #[test]
    fn lengths_count_chars() {
        let op = TextOp::new().retain(2).insert("é✓");
        assert_eq!(op.base_len(), 2);
        assert_eq!(op.target_len(), 4);
        assert_eq!(op.apply("aß").unwrap(), "aßé✓");
    }

    #[test]
    fn builder_merges_and_drops_empty_segments() {
        let op = TextOp::new()
            .retain(2)
            .retain(0)
            .retain(3)
            .insert("")
            .insert("x")
            .insert("y");
        assert_eq!(
            op.components(),
            &[Component::Retain(5), Component::Insert("xy".into())]
        );
    }

    #[test]
    fn insert_moves_ahead_of_delete() {
        let a = TextOp::new().retain(1).delete(2).insert("z");
        let b = TextOp::new().retain(1).insert("z").delete(2);
        assert_eq!(a, b);
        assert_eq!(
            a.components(),
            &[
                Component::Retain(1),
                Component::Insert("z".into()),
                Component::Delete(2)
            ]
        );
    }

    #[test]
    fn insert_at_bounds() {
        assert!(TextOp::insert_at(3, 4, "x").is_err());
        let op = TextOp::insert_at(3, 3, "x").unwrap();
        assert_eq!(op.apply("abc").unwrap(), "abcx");
    }

    #[test]
    fn compose_insert_then_delete_cancels() {
        let insert = TextOp::insert_at(0, 0, "X").unwrap();
        let delete = TextOp::delete_at(1, 0, 1).unwrap();
        let composed = insert.compose(&delete).unwrap();
        assert_eq!(composed, TextOp::new());
        assert!(composed.is_noop());
    }

    #[test]
    fn compose_builds_document() {
        let a = TextOp::new().insert("a");
        let f = TextOp::new().retain(1).insert("f");
        let b = TextOp::new().retain(1).insert("b").retain(1);
        let doc = a.compose(&f).unwrap().compose(&b).unwrap();
        assert_eq!(doc.inserted_text(), Some("abf"));
    }

    #[test]
    fn compose_rejects_misaligned_operands() {
        let a = TextOp::new().insert("ab");
        let b = TextOp::new().retain(1);
        assert_eq!(
            a.compose(&b),
            Err(OtError::ComposeLengthMismatch {
                first_target: 2,
                second_base: 1
            })
        );
    }

    #[test]
    fn transform_places_left_insert_first() {
        let b = TextOp::new().retain(1).insert("b");
        let f = TextOp::new().retain(1).insert("f");
        let (b_prime, f_prime) = b.transform(&f).unwrap();
        assert_eq!(b_prime, TextOp::new().retain(1).insert("b").retain(1));
        assert_eq!(f_prime, TextOp::new().retain(2).insert("f"));

        let via_b = f_prime.apply(&b.apply("a").unwrap()).unwrap();
        let via_f = b_prime.apply(&f.apply("a").unwrap()).unwrap();
        assert_eq!(via_b, "abf");
        assert_eq!(via_f, "abf");
    }

    #[test]
    fn transform_overlapping_deletes() {
        let a = TextOp::delete_at(5, 1, 3).unwrap();
        let b = TextOp::delete_at(5, 2, 3).unwrap();
        let (a_prime, b_prime) = a.transform(&b).unwrap();
        let left = b_prime.apply(&a.apply("abcde").unwrap()).unwrap();
        let right = a_prime.apply(&b.apply("abcde").unwrap()).unwrap();
        assert_eq!(left, "a");
        assert_eq!(left, right);
    }

    #[test]
    fn transform_rejects_different_bases() {
        let a = TextOp::new().retain(2);
        let b = TextOp::new().retain(3);
        assert!(matches!(
            a.transform(&b),
            Err(OtError::TransformLengthMismatch { .. })
        ));
    }

    #[test]
    fn inserted_text_only_for_pure_insertions() {
        assert_eq!(TextOp::new().inserted_text(), Some(""));
        assert_eq!(TextOp::new().insert("hi").inserted_text(), Some("hi"));
        assert_eq!(TextOp::new().retain(1).insert("x").inserted_text(), None);
    }

    /// Build an operation over a document of `len` chars from a random script.
    fn scripted(len: usize, script: &[(u8, u8)]) -> TextOp {
        let mut op = TextOp::new();
        let mut remaining = len;
        for &(kind, amount) in script {
            let n = usize::from(amount % 4) + 1;
            match kind % 3 {
                0 => {
                    let n = n.min(remaining);
                    op.push_retain(n);
                    remaining -= n;
                }
                1 => op.push_insert(char::from(b'a' + amount % 26).to_string()),
                _ => {
                    let n = n.min(remaining);
                    op.push_delete(n);
                    remaining -= n;
                }
            }
        }
        op.retain(remaining)
    }

    proptest! {
        #[test]
        fn transform_converges(
            doc in "[a-z]{0,12}",
            left in proptest::collection::vec(any::<(u8, u8)>(), 0..8),
            right in proptest::collection::vec(any::<(u8, u8)>(), 0..8),
        ) {
            let len = doc.chars().count();
            let a = scripted(len, &left);
            let b = scripted(len, &right);
            let (a_prime, b_prime) = a.transform(&b).unwrap();

            let via_a = b_prime.apply(&a.apply(&doc).unwrap()).unwrap();
            let via_b = a_prime.apply(&b.apply(&doc).unwrap()).unwrap();
            prop_assert_eq!(&via_a, &via_b);

            let composed = a.compose(&b_prime).unwrap();
            prop_assert_eq!(composed.apply(&doc).unwrap(), via_a);
        }
    }
}
