//! Deriving operations from two document states.

use similar::{DiffOp, TextDiff};

use crate::op::TextOp;

impl TextOp {
    /// The operation turning `old` into `new`, computed with a char-level
    /// Myers diff.
    pub fn diff(old: &str, new: &str) -> TextOp {
        let new_chars: Vec<char> = new.chars().collect();
        let diff = TextDiff::from_chars(old, new);

        let mut op = TextOp::new();
        for change in diff.ops() {
            match *change {
                DiffOp::Equal { len, .. } => op.push_retain(len),
                DiffOp::Delete { old_len, .. } => op.push_delete(old_len),
                DiffOp::Insert {
                    new_index, new_len, ..
                } => op.push_insert(new_chars[new_index..new_index + new_len].iter().collect()),
                DiffOp::Replace {
                    old_len,
                    new_index,
                    new_len,
                    ..
                } => {
                    op.push_delete(old_len);
                    op.push_insert(new_chars[new_index..new_index + new_len].iter().collect());
                }
            }
        }
        op
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_reproduces_target() {
        let cases = [
            ("", "hello"),
            ("hello", ""),
            ("abc", "abc"),
            ("the cat sat", "the hat sat down"),
            ("naïve café", "naive cafés"),
        ];
        for (old, new) in cases {
            let op = TextOp::diff(old, new);
            assert_eq!(op.base_len(), old.chars().count());
            assert_eq!(op.apply(old).unwrap(), new, "{old:?} -> {new:?}");
        }
    }

    #[test]
    fn identical_texts_give_a_noop() {
        assert!(TextOp::diff("same", "same").is_noop());
    }

    #[test]
    fn appended_text_is_a_single_insert() {
        let op = TextOp::diff("ab", "abc");
        assert_eq!(op, TextOp::new().retain(2).insert("c"));
    }
}
