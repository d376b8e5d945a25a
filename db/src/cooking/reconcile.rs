//! Diffing of a recipe's current associations against the requested ones, so
//! an update only touches the rows that actually change.

use std::collections::{BTreeMap, BTreeSet};

use itertools::{EitherOrBoth, Itertools};

/// Writes needed to turn one `ingredient_id -> amount` map into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountChanges {
    pub insert: Vec<(i64, i32)>,
    pub update: Vec<(i64, i32)>,
    pub delete: Vec<i64>,
}

impl AmountChanges {
    pub fn between(current: &BTreeMap<i64, i32>, desired: &BTreeMap<i64, i32>) -> Self {
        let mut changes = Self::default();

        for entry in current
            .iter()
            .merge_join_by(desired.iter(), |(a, _), (b, _)| a.cmp(b))
        {
            match entry {
                EitherOrBoth::Left((&id, _)) => changes.delete.push(id),
                EitherOrBoth::Right((&id, &amount)) => changes.insert.push((id, amount)),
                EitherOrBoth::Both((&id, &old), (_, &new)) if old != new => {
                    changes.update.push((id, new));
                }
                EitherOrBoth::Both(..) => {}
            }
        }

        changes
    }

    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Writes needed to turn one id set into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetChanges {
    pub insert: Vec<i64>,
    pub delete: Vec<i64>,
}

impl SetChanges {
    pub fn between(current: &BTreeSet<i64>, desired: &BTreeSet<i64>) -> Self {
        Self {
            insert: desired.difference(current).copied().collect(),
            delete: current.difference(desired).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty()
    }
}
