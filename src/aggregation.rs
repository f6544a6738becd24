use crate::schema::{ClassifiedTransaction, EconomicType, Head};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-head rollup: one total per subhead, the head total, and the number
/// of contributing transactions. `sum(subhead_totals) == total` always.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HeadAggregation {
    pub head: Head,
    pub subhead_totals: BTreeMap<String, f64>,
    pub total: f64,
    pub transaction_count: usize,
}

impl HeadAggregation {
    pub fn empty(head: Head) -> Self {
        Self {
            head,
            subhead_totals: BTreeMap::new(),
            total: 0.0,
            transaction_count: 0,
        }
    }

    fn add(&mut self, subhead: &str, amount: f64) {
        *self.subhead_totals.entry(subhead.to_string()).or_default() += amount;
        self.total += amount;
        self.transaction_count += 1;
    }

    pub fn subhead_total(&self, subhead: &str) -> f64 {
        self.subhead_totals.get(subhead).copied().unwrap_or(0.0)
    }
}

/// The full aggregation across all heads for one scope (state x period, or
/// any combination of them).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AggregationSet {
    pub heads: BTreeMap<Head, HeadAggregation>,
}

impl AggregationSet {
    pub fn head_total(&self, head: Head) -> f64 {
        self.heads.get(&head).map(|a| a.total).unwrap_or(0.0)
    }

    pub fn subhead_total(&self, head: Head, subhead: &str) -> f64 {
        self.heads
            .get(&head)
            .map(|a| a.subhead_total(subhead))
            .unwrap_or(0.0)
    }

    pub fn transaction_count(&self) -> usize {
        self.heads.values().map(|a| a.transaction_count).sum()
    }

    /// Field-by-field sum of several aggregation sets. Used by the
    /// cross-state and cross-period rollups; everything in here is additive.
    pub fn merge(sets: &[&AggregationSet]) -> AggregationSet {
        let mut merged = AggregationSet::default();
        for set in sets {
            for (head, aggregation) in &set.heads {
                let target = merged
                    .heads
                    .entry(*head)
                    .or_insert_with(|| HeadAggregation::empty(*head));
                for (subhead, amount) in &aggregation.subhead_totals {
                    *target.subhead_totals.entry(subhead.clone()).or_default() += amount;
                }
                target.total += aggregation.total;
                target.transaction_count += aggregation.transaction_count;
            }
        }
        merged
    }
}

/// The amount a classified transaction contributes to its head, under the
/// sign convention: expense heads take the debit side, revenue heads the
/// credit side, ignore heads both (audit visibility only).
pub fn signed_amount(classified: &ClassifiedTransaction) -> f64 {
    let tx = &classified.transaction;
    match classified.head.economic_type() {
        EconomicType::Revenue => tx.credit,
        EconomicType::Expense => tx.debit,
        EconomicType::Ignore => tx.debit + tx.credit,
    }
}

/// Single reduction over the classified set into per-head rollups.
pub fn aggregate(classified: &[ClassifiedTransaction]) -> AggregationSet {
    let mut set = AggregationSet::default();
    for item in classified {
        let aggregation = set
            .heads
            .entry(item.head)
            .or_insert_with(|| HeadAggregation::empty(item.head));
        aggregation.add(&item.subhead, signed_amount(item));
    }
    set
}
