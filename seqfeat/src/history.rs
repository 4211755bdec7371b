use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::escape::escape;
use crate::extractor::{Feature, LABEL_FEATURE};
use crate::BOUNDARY;

/// Labels read backward from a position, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryTuple {
    labels: Vec<String>,
}

impl HistoryTuple {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HistoryTuple {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Lookback depth of the tuple, one less than its length.
    pub fn order(&self) -> usize {
        self.labels.len().saturating_sub(1)
    }
}

/// Named order-set configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPreset {
    Standard,
    Alternate,
}

/// Per-template lookback depths.
///
/// Entry `n` lists the orders at which the feature in slot `n` of a row is
/// paired with label history. Slots past the end use `{0}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSets(Vec<Vec<usize>>);

const DEFAULT_ORDERS: &[usize] = &[0];

impl OrderSets {
    pub fn new(orders: Vec<Vec<usize>>) -> Self {
        OrderSets(orders)
    }

    pub fn preset(preset: OrderPreset) -> Self {
        match preset {
            OrderPreset::Standard => OrderSets(vec![
                vec![0, 1],
                vec![0, 1],
                vec![0, 1, 2],
                vec![0, 2],
                vec![0],
                vec![0],
                vec![0],
            ]),
            // Slots 4 and 8 (1-based) swap their orders.
            OrderPreset::Alternate => OrderSets(vec![
                vec![0, 1],
                vec![0, 1],
                vec![0, 1, 2],
                vec![0],
                vec![0],
                vec![0],
                vec![0],
                vec![0, 2],
            ]),
        }
    }

    /// Orders for the feature in slot `attr_num`.
    pub fn get(&self, attr_num: usize) -> &[usize] {
        self.0.get(attr_num).map_or(DEFAULT_ORDERS, Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for OrderSets {
    fn default() -> Self {
        Self::preset(OrderPreset::Standard)
    }
}

impl From<OrderPreset> for OrderSets {
    fn from(preset: OrderPreset) -> Self {
        Self::preset(preset)
    }
}

/// Rolling label history of one sentence.
///
/// Starts with a single boundary label and gains the label of every position
/// as the sentence is walked.
#[derive(Debug, Clone)]
pub struct LabelHistory {
    labels: Vec<String>,
}

impl Default for LabelHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelHistory {
    pub fn new() -> Self {
        LabelHistory {
            labels: vec![BOUNDARY.to_string()],
        }
    }

    pub fn push<S: Into<String>>(&mut self, label: S) {
        self.labels.push(label.into());
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The last `n` labels, most recent first, or `None` if fewer exist.
    pub fn recent(&self, n: usize) -> Option<HistoryTuple> {
        if n > self.labels.len() {
            return None;
        }
        Some(HistoryTuple::new(self.labels.iter().rev().take(n).cloned()))
    }
}

/// History Aggregator.
///
/// Owns the feature-to-history table of one corpus split while it is being
/// built. Call [`update`](Self::update) for every row and
/// [`finalize`](Self::finalize) once after the last sentence.
#[derive(Debug, Default)]
pub struct HistoryAggregator {
    orders: OrderSets,
    table: HashMap<Feature, HashSet<HistoryTuple>>,
}

impl HistoryAggregator {
    pub fn new(orders: OrderSets) -> Self {
        HistoryAggregator {
            orders,
            table: HashMap::new(),
        }
    }

    /// Records the history tuples of one row.
    ///
    /// `position` is the index of the row among the real positions of its
    /// sentence, and `history` must already hold the row's own label. A
    /// tuple of order `k` is recorded when `position - k >= -1`.
    ///
    /// # Example
    /// ```
    /// use seqfeat::extractor::Feature;
    /// use seqfeat::history::{HistoryAggregator, LabelHistory, OrderSets};
    ///
    /// let mut aggregator = HistoryAggregator::new(OrderSets::new(vec![vec![0, 1]]));
    /// let mut history = LabelHistory::new();
    /// history.push("NN");
    /// aggregator.update(&history, 0, &[Feature::new("LABEL")]);
    ///
    /// assert_eq!(aggregator.num_entries(), 2);
    /// ```
    pub fn update(&mut self, history: &LabelHistory, position: usize, features: &[Feature]) {
        for (attr_num, feature) in features.iter().enumerate() {
            let tuples = self.table.entry(feature.clone()).or_default();
            for &k in self.orders.get(attr_num) {
                if k > position + 1 {
                    continue;
                }
                if let Some(tuple) = history.recent(k + 1) {
                    tuples.insert(tuple);
                }
            }
        }
    }

    /// Number of distinct features seen so far.
    pub fn num_features(&self) -> usize {
        self.table.len()
    }

    /// Number of (feature, history tuple) pairs recorded so far.
    pub fn num_entries(&self) -> usize {
        self.table.values().map(HashSet::len).sum()
    }

    /// Adds the boundary transitions of every label in `labels` to `LABEL`
    /// and returns the finished table.
    pub fn finalize<'a, I>(mut self, labels: I) -> HistoryTable
    where
        I: IntoIterator<Item = &'a String>,
    {
        let tuples = self
            .table
            .entry(Feature::new(LABEL_FEATURE))
            .or_default();
        for label in labels {
            tuples.insert(HistoryTuple::new([BOUNDARY, label.as_str()]));
            tuples.insert(HistoryTuple::new([label.as_str(), BOUNDARY]));
        }
        HistoryTable { table: self.table }
    }
}

/// Finalized feature-to-history table of a split.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HistoryTable {
    table: HashMap<Feature, HashSet<HistoryTuple>>,
}

impl HistoryTable {
    /// History tuples recorded for `feature`.
    pub fn get(&self, feature: &str) -> Option<&HashSet<HistoryTuple>> {
        self.table.get(feature)
    }

    pub fn num_features(&self) -> usize {
        self.table.len()
    }

    pub fn num_entries(&self) -> usize {
        self.table.values().map(HashSet::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Feature, &HashSet<HistoryTuple>)> {
        self.table.iter()
    }

    /// Writes one `feature<TAB>label...` line per history tuple.
    ///
    /// Lines are sorted so that repeated runs produce identical files.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        let mut num_lines = 0;
        let mut entries: Vec<_> = self.table.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (feature, tuples) in entries {
            let tuples: BTreeSet<&HistoryTuple> = tuples.iter().collect();
            let name = escape(feature.name());
            for tuple in tuples {
                write!(writer, "{}", name)?;
                for label in tuple.labels() {
                    write!(writer, "\t{}", escape(label))?;
                }
                writeln!(writer)?;
                num_lines += 1;
            }
        }
        Ok(num_lines)
    }
}
