//! Module: index::range
//! Responsibility: bounded scans over single and compound index keys.

use super::{Index, IndexError, IndexNode, RecordRef, Slot};
use crate::value::Value;

///
/// BetweenOptions
///
/// Inclusivity applies to the last key component; interior components of a
/// compound bound are always inclusive. `limit` stops the scan early,
/// `offset` drops entries from the front of the scanned result.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BetweenOptions {
    pub left_inclusive: bool,
    pub right_inclusive: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Default for BetweenOptions {
    fn default() -> Self {
        Self {
            left_inclusive: true,
            right_inclusive: false,
            limit: None,
            offset: None,
        }
    }
}

impl BetweenOptions {
    #[must_use]
    pub const fn left_inclusive(mut self, inclusive: bool) -> Self {
        self.left_inclusive = inclusive;
        self
    }

    #[must_use]
    pub const fn right_inclusive(mut self, inclusive: bool) -> Self {
        self.right_inclusive = inclusive;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    // Number of entries the scan needs before it may stop.
    fn scan_cap(&self) -> Option<usize> {
        self.limit
            .map(|limit| limit.saturating_add(self.offset.unwrap_or(0)))
    }
}

impl Index {
    /// Entries whose key lies between `left` and `right`.
    pub fn between(
        &self,
        left: &[Value],
        right: &[Value],
        opts: &BetweenOptions,
    ) -> Result<Vec<&RecordRef>, IndexError> {
        if left.len() != right.len() {
            return Err(IndexError::BoundArityMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        if left.len() > self.fields.len() {
            return Err(IndexError::KeyArity {
                expected: self.fields.len(),
                found: left.len(),
            });
        }

        let left: Vec<Option<&Value>> = left.iter().map(Some).collect();
        let right: Vec<Option<&Value>> = right.iter().map(Some).collect();

        let mut out = Vec::new();
        self.root.between(&left, &right, opts, &mut out);

        let offset = opts.offset.unwrap_or(0);
        let limit = opts.limit.unwrap_or(usize::MAX);

        Ok(out.into_iter().skip(offset).take(limit).collect())
    }
}

impl IndexNode {
    // `None` bounds are open. Both bound slices always have equal length.
    pub(super) fn between<'a>(
        &'a self,
        left: &[Option<&Value>],
        right: &[Option<&Value>],
        opts: &BetweenOptions,
        out: &mut Vec<&'a RecordRef>,
    ) {
        let (left_key, left_rest) = left.split_first().map_or((None, &[][..]), |(k, r)| (*k, r));
        let right_key = right.first().copied().flatten();
        let right_rest = right.get(1..).unwrap_or(&[]);
        let cap = opts.scan_cap();

        let (start, matched) = match left_key {
            Some(key) => match self.keys.binary_search(key) {
                Ok(pos) => (pos, true),
                Err(pos) => (pos, false),
            },
            None => (0, false),
        };

        // Phase 1: last key component, apply inclusivity flags.
        if left_rest.is_empty() {
            let start = if matched && !opts.left_inclusive {
                start + 1
            } else {
                start
            };

            for pos in start..self.keys.len() {
                if let Some(right_key) = right_key {
                    let key = &self.keys[pos];
                    let past = if opts.right_inclusive {
                        key > right_key
                    } else {
                        key >= right_key
                    };
                    if past {
                        break;
                    }
                }
                self.values[pos].collect_all(out);
                if cap.is_some_and(|cap| out.len() >= cap) {
                    break;
                }
            }

            return;
        }

        // Phase 2: interior component; boundary keys recurse, inner keys are
        // taken whole.
        let open: Vec<Option<&Value>> = vec![None; left_rest.len()];
        for pos in start..self.keys.len() {
            let key = &self.keys[pos];
            if right_key.is_some_and(|right_key| key > right_key) {
                break;
            }

            match &self.values[pos] {
                Slot::Nested(node) => {
                    let on_left = left_key == Some(key);
                    let on_right = right_key == Some(key);
                    match (on_left, on_right) {
                        (true, true) => node.between(left_rest, right_rest, opts, out),
                        (true, false) => node.between(left_rest, &open, opts, out),
                        (false, true) => node.between(&open, right_rest, opts, out),
                        (false, false) => node.collect_all(out),
                    }
                }
                slot @ Slot::Bucket(_) => slot.collect_all(out),
            }
            if cap.is_some_and(|cap| out.len() >= cap) {
                break;
            }
        }
    }
}
