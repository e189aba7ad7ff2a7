use std::collections::HashMap;

/// Votes per claimed value for one aggregation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VoteTally {
    counts: HashMap<i64, u32>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, value: i64) {
        *self.counts.entry(value).or_insert(0) += 1;
    }

    pub fn count(&self, value: i64) -> u32 {
        self.counts.get(&value).copied().unwrap_or(0)
    }

    /// Votes recorded across all values.
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The winning value and its count: most votes first, then the smallest
    /// value among equals.
    pub fn leader(&self) -> Option<(i64, u32)> {
        self.counts
            .iter()
            .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
            .map(|(v, c)| (*v, *c))
    }
}

impl FromIterator<i64> for VoteTally {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut tally = Self::new();
        for v in iter {
            tally.record(v);
        }
        tally
    }
}
