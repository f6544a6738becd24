use crate::aggregation::{aggregate, AggregationSet};
use crate::classifier::{classify_batch, Classifier};
use crate::error::{Result, WaterfallError};
use crate::period::Period;
use crate::reconciliation::ReconciliationOutcome;
use crate::rules::RuleSnapshot;
use crate::schema::{
    ClassificationEvent, ClassifiedTransaction, StateBalanceSheet, Transaction,
};
use crate::waterfall::{
    ChannelRevenue, CogmBreakdown, MarginWaterfall, WaterfallInputs,
};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The complete MIS record for one period and one set of contributing
/// states. Immutable after assembly except through [`PeriodRecord::reclassify`],
/// which recomputes every derived figure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PeriodRecord {
    pub period: Period,
    pub states: Vec<String>,

    #[schemars(description = "The state whose opening/closing stock figures are authoritative")]
    pub primary_state: String,

    pub channel_revenue: ChannelRevenue,
    pub cogm: CogmBreakdown,
    pub waterfall: MarginWaterfall,
    pub aggregations: AggregationSet,

    pub classified: Vec<ClassifiedTransaction>,
    pub unclassified: Vec<Transaction>,
    pub unclassified_count: usize,

    pub balance_sheets: Vec<StateBalanceSheet>,
    pub reconciliation: ReconciliationOutcome,
}

impl PeriodRecord {
    /// Assembles a record from an already-classified transaction set,
    /// deriving the aggregations, breakdowns, waterfall and reconciliation.
    pub fn assemble(
        period: Period,
        states: Vec<String>,
        primary_state: String,
        classified: Vec<ClassifiedTransaction>,
        unclassified: Vec<Transaction>,
        balance_sheets: Vec<StateBalanceSheet>,
    ) -> Self {
        let unclassified_count = unclassified.len();
        let mut record = Self {
            period,
            states,
            primary_state,
            channel_revenue: ChannelRevenue::default(),
            cogm: CogmBreakdown::default(),
            waterfall: MarginWaterfall::default(),
            aggregations: AggregationSet::default(),
            classified,
            unclassified,
            unclassified_count,
            balance_sheets,
            reconciliation: ReconciliationOutcome::NotAvailable,
        };
        record.recompute();
        record
    }

    /// Recomputes every derived figure from the classified set. Opening and
    /// closing stock come only from the primary state's balance sheet;
    /// purchases sum across all states.
    fn recompute(&mut self) {
        self.aggregations = aggregate(&self.classified);
        self.channel_revenue = ChannelRevenue::from_aggregations(&self.aggregations);
        self.unclassified_count = self.unclassified.len();

        let total_purchases: f64 = self.balance_sheets.iter().map(|bs| bs.purchases).sum();
        let stock = self
            .balance_sheets
            .iter()
            .find(|bs| bs.state == self.primary_state)
            .map(|bs| (bs.opening_stock, total_purchases, bs.closing_stock));
        self.cogm = CogmBreakdown::from_aggregations(&self.aggregations, stock);

        let inputs =
            WaterfallInputs::from_parts(&self.channel_revenue, &self.cogm, &self.aggregations);
        self.waterfall = MarginWaterfall::compute(&inputs);

        self.reconciliation = ReconciliationOutcome::check(
            self.waterfall.net_revenue,
            self.waterfall.net_income.amount,
            self.channel_revenue.stock_transfers,
            &self.balance_sheets,
        );
    }

    /// Re-runs classification against a new snapshot and recomputes all
    /// derived figures. User-confirmed assignments are kept as-is; every
    /// other transaction (previously classified or not) is re-decided.
    /// Section-scoped transactions go back through the section mapper.
    pub fn reclassify(&mut self, snapshot: &RuleSnapshot) {
        let classifier = Classifier::new(snapshot);

        let mut kept: Vec<ClassifiedTransaction> = Vec::new();
        let mut pending: Vec<Transaction> = Vec::new();

        for item in self.classified.drain(..) {
            if item.user_confirmed {
                kept.push(item);
            } else {
                pending.push(item.transaction);
            }
        }
        pending.extend(self.unclassified.drain(..));

        let (reclassified, unclassified) = classify_batch(pending, &classifier);
        kept.extend(reclassified);

        debug!(
            "reclassified period {}: {} classified, {} unclassified",
            self.period,
            kept.len(),
            unclassified.len()
        );

        self.classified = kept;
        self.unclassified = unclassified;
        self.recompute();
    }

    /// The applied-classification events for this record, for the
    /// surrounding system to persist as user-authored rules if it chooses.
    pub fn classification_events(&self) -> Vec<ClassificationEvent> {
        self.classified
            .iter()
            .filter(|c| c.matched_rule_id.is_some())
            .map(|c| ClassificationEvent {
                account: c.transaction.account.clone(),
                head: c.head,
                subhead: c.subhead.clone(),
                rule_id: c.matched_rule_id.clone(),
                pattern: c.matched_pattern.clone(),
            })
            .collect()
    }

    /// Combines per-state records for one period into a single record.
    /// Every additive field sums; opening/closing stock are taken from the
    /// designated primary state only.
    pub fn combine(records: &[PeriodRecord], primary_state: &str) -> Result<Option<PeriodRecord>> {
        let Some(first) = records.first() else {
            return Ok(None);
        };

        for record in records.iter().skip(1) {
            if record.period != first.period {
                return Err(WaterfallError::MixedPeriods(
                    first.period.key(),
                    record.period.key(),
                ));
            }
        }

        let mut states = Vec::new();
        let mut classified = Vec::new();
        let mut unclassified = Vec::new();
        let mut balance_sheets = Vec::new();
        for record in records {
            for state in &record.states {
                if !states.contains(state) {
                    states.push(state.clone());
                }
            }
            classified.extend(record.classified.iter().cloned());
            unclassified.extend(record.unclassified.iter().cloned());
            balance_sheets.extend(record.balance_sheets.iter().cloned());
        }

        Ok(Some(PeriodRecord::assemble(
            first.period,
            states,
            primary_state.to_string(),
            classified,
            unclassified,
            balance_sheets,
        )))
    }
}

/// An aggregation of consecutive period records over an arbitrary start/end
/// boundary. Flows sum across the range; opening stock comes from the first
/// period and closing stock from the last, never a sum.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RangeRecord {
    pub start: Period,
    pub end: Period,
    pub states: Vec<String>,

    pub channel_revenue: ChannelRevenue,
    pub cogm: CogmBreakdown,
    pub waterfall: MarginWaterfall,
    pub aggregations: AggregationSet,
    pub unclassified_count: usize,
}

impl RangeRecord {
    /// Builds a range record from period records. Returns `Ok(None)` for an
    /// empty input; errors when the periods do not form a gap-free run.
    pub fn from_periods(records: &[PeriodRecord]) -> Result<Option<RangeRecord>> {
        if records.is_empty() {
            return Ok(None);
        }

        let mut ordered: Vec<&PeriodRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.period);

        for pair in ordered.windows(2) {
            if pair[1].period != pair[0].period.next() {
                return Err(WaterfallError::NonConsecutiveRange(pair[0].period.key()));
            }
        }

        let first = ordered.first().unwrap();
        let last = ordered.last().unwrap();

        let mut states = Vec::new();
        for record in &ordered {
            for state in &record.states {
                if !states.contains(state) {
                    states.push(state.clone());
                }
            }
        }

        let aggregations = AggregationSet::merge(
            &ordered.iter().map(|r| &r.aggregations).collect::<Vec<_>>(),
        );
        let channel_revenue = ChannelRevenue::merge(
            &ordered.iter().map(|r| &r.channel_revenue).collect::<Vec<_>>(),
        );

        // Flows sum; stock boundaries come from the range edges.
        let mut direct_expenses: BTreeMap<String, f64> = BTreeMap::new();
        let mut purchases = 0.0;
        let mut journal_raw_materials = 0.0;
        for record in &ordered {
            for (subhead, amount) in &record.cogm.direct_expenses {
                *direct_expenses.entry(subhead.clone()).or_default() += amount;
            }
            purchases += record.cogm.purchases;
            journal_raw_materials += record.cogm.journal_raw_materials;
        }
        let cogm = CogmBreakdown {
            opening_stock: first.cogm.opening_stock,
            closing_stock: last.cogm.closing_stock,
            purchases,
            direct_expenses,
            journal_raw_materials,
            stock_derived: first.cogm.stock_derived && last.cogm.stock_derived,
        };

        let inputs = WaterfallInputs::from_parts(&channel_revenue, &cogm, &aggregations);
        let waterfall = MarginWaterfall::compute(&inputs);
        let unclassified_count = ordered.iter().map(|r| r.unclassified_count).sum();

        Ok(Some(RangeRecord {
            start: first.period,
            end: last.period,
            states,
            channel_revenue,
            cogm,
            waterfall,
            aggregations,
            unclassified_count,
        }))
    }
}

/// Explicit store for period records, keyed by the `(period, scope)`
/// composite. The scope is a state tag for per-state records; callers that
/// store combined records pick their own scope label.
#[derive(Debug, Clone, Default)]
pub struct PeriodStore {
    records: BTreeMap<(Period, String), PeriodRecord>,
}

impl PeriodStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scope: &str, record: PeriodRecord) {
        let key = (record.period, scope.to_string());
        if self.records.insert(key, record).is_some() {
            info!("replaced stored record for scope '{}'", scope);
        }
    }

    pub fn get(&self, period: Period, scope: &str) -> Option<&PeriodRecord> {
        self.records.get(&(period, scope.to_string()))
    }

    pub fn records_for_period(&self, period: Period) -> Vec<&PeriodRecord> {
        self.records
            .range((period, String::new())..(period.next(), String::new()))
            .map(|(_, record)| record)
            .collect()
    }

    /// Records for one scope across an inclusive period range, ascending.
    pub fn records_in_range(&self, start: Period, end: Period, scope: &str) -> Vec<&PeriodRecord> {
        self.records
            .iter()
            .filter(|((period, s), _)| *period >= start && *period <= end && s == scope)
            .map(|(_, record)| record)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
