//! # P&L Waterfall Builder
//!
//! A library for turning raw accounting ledger lines (journal and
//! sales-register entries tagged with free-text account names) into a
//! standardized, period-by-period profit-and-loss waterfall over a fixed
//! two-level category taxonomy.
//!
//! ## Core Concepts
//!
//! - **Heads and subheads**: a closed taxonomy (Revenue, Cost of Goods,
//!   Channel & Fulfillment, ...) with a fixed set of subheads per head
//! - **Rules**: externally owned classification rules (exact / contains /
//!   regex patterns) read through an immutable, priority-ordered snapshot
//! - **Sections**: pre-scoped ledger sections (trading vs general) that take
//!   a keyword-mapping path instead of free-text rule matching
//! - **Waterfall**: the cascading margin chain (gross margin → CM1 → CM2 →
//!   CM3 → EBITDA → EBT → net income), every figure paired with its share
//!   of net revenue
//! - **Scopes**: per-state period records combine into whole-business
//!   records and consecutive-period ranges; opening/closing stock is never
//!   summed across scopes
//! - **Reconciliation**: the waterfall is cross-checked against independently
//!   reported balance-sheet figures; variances are reported, never resolved
//!
//! ## Example
//!
//! ```rust,ignore
//! use pnl_waterfall_builder::*;
//!
//! let mut repo = InMemoryRuleRepository::new();
//! repo.add(ClassificationRule::new(
//!     "amz-fees",
//!     "AMAZON.*LOGISTICS",
//!     MatchType::Regex,
//!     Head::ChannelFulfillment,
//!     "Amazon Fees",
//!     RuleProvenance::User,
//! ))?;
//!
//! let builder = MisBuilder::new("KA");
//! let record = builder.build_period_record(
//!     Period::new(2024, 7)?,
//!     vec![StatePeriodInput {
//!         state: "KA".to_string(),
//!         transactions,
//!         balance_sheet: None,
//!     }],
//!     &repo.list_active(),
//! );
//! ```

pub mod aggregation;
pub mod classifier;
pub mod error;
pub mod period;
pub mod reconciliation;
pub mod record;
pub mod rules;
pub mod schema;
pub mod section;
pub mod waterfall;

pub use aggregation::{aggregate, signed_amount, AggregationSet, HeadAggregation};
pub use classifier::{classify_batch, classify_transaction, Classification, Classifier};
pub use error::{Result, WaterfallError};
pub use period::{last_day_of_month, periods_between, Period};
pub use reconciliation::{ReconciliationOutcome, ReconciliationReport};
pub use record::{PeriodRecord, PeriodStore, RangeRecord};
pub use rules::{
    ClassificationRule, ConfidenceSource, InMemoryRuleRepository, MatchType, RuleProvenance,
    RuleRepository, RuleSnapshot,
};
pub use schema::*;
pub use section::{map_direct_subhead, map_general, map_section_transaction};
pub use waterfall::{
    percent_of_revenue, ChannelRevenue, CogmBreakdown, MarginFigure, MarginWaterfall,
    WaterfallInputs, WaterfallStage,
};

use log::{debug, info};

/// Per-state input for one period, as delivered by the (external) parsing
/// layer.
#[derive(Debug, Clone)]
pub struct StatePeriodInput {
    pub state: String,
    pub transactions: Vec<Transaction>,
    pub balance_sheet: Option<StateBalanceSheet>,
}

/// The pipeline facade: classify → aggregate → waterfall → reconcile, one
/// synchronous pass per period. The rule snapshot is taken once and never
/// changes mid-run.
pub struct MisBuilder {
    primary_state: String,
}

impl MisBuilder {
    /// `primary_state` designates the sub-unit whose opening/closing stock
    /// figures are authoritative; stock is never summed across states.
    pub fn new(primary_state: impl Into<String>) -> Self {
        Self {
            primary_state: primary_state.into(),
        }
    }

    pub fn build_period_record(
        &self,
        period: Period,
        inputs: Vec<StatePeriodInput>,
        snapshot: &RuleSnapshot,
    ) -> PeriodRecord {
        info!(
            "building MIS record for {} across {} states ({} rules active)",
            period,
            inputs.len(),
            snapshot.len()
        );

        let classifier = Classifier::new(snapshot);

        let mut states = Vec::new();
        let mut classified = Vec::new();
        let mut unclassified = Vec::new();
        let mut balance_sheets = Vec::new();

        for input in inputs {
            let outside = input
                .transactions
                .iter()
                .filter(|t| !period.contains(t.date))
                .count();
            if outside > 0 {
                debug!(
                    "state {}: {} transactions dated outside {}",
                    input.state, outside, period
                );
            }

            let (matched, unmatched) = classify_batch(input.transactions, &classifier);
            debug!(
                "state {}: {} classified, {} unclassified",
                input.state,
                matched.len(),
                unmatched.len()
            );

            classified.extend(matched);
            unclassified.extend(unmatched);
            if let Some(balance_sheet) = input.balance_sheet {
                balance_sheets.push(balance_sheet);
            }
            states.push(input.state);
        }

        let record = PeriodRecord::assemble(
            period,
            states,
            self.primary_state.clone(),
            classified,
            unclassified,
            balance_sheets,
        );

        info!(
            "{}: net revenue {:.2}, net income {:.2}, {} unclassified",
            period,
            record.waterfall.net_revenue,
            record.waterfall.net_income.amount,
            record.unclassified_count
        );
        record
    }
}

/// One-shot convenience over [`MisBuilder`].
pub fn build_period_record(
    period: Period,
    inputs: Vec<StatePeriodInput>,
    snapshot: &RuleSnapshot,
    primary_state: &str,
) -> PeriodRecord {
    MisBuilder::new(primary_state).build_period_record(period, inputs, snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(account: &str, debit: f64, credit: f64) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2024, 7, 10).unwrap(),
            account: account.to_string(),
            debit,
            credit,
            state: "KA".to_string(),
            section: None,
            notes: None,
        }
    }

    fn snapshot() -> RuleSnapshot {
        RuleSnapshot::new(vec![
            ClassificationRule::new(
                "sales",
                "amazon sales",
                MatchType::Contains,
                Head::Revenue,
                "Amazon Sales",
                RuleProvenance::User,
            ),
            ClassificationRule::new(
                "wages",
                "wages",
                MatchType::Contains,
                Head::CostOfGoods,
                "Wages",
                RuleProvenance::User,
            ),
        ])
    }

    #[test]
    fn test_end_to_end_period_record() {
        let builder = MisBuilder::new("KA");
        let record = builder.build_period_record(
            Period::new(2024, 7).unwrap(),
            vec![StatePeriodInput {
                state: "KA".to_string(),
                transactions: vec![
                    tx("AMAZON SALES JULY", 0.0, 100_000.0),
                    tx("FACTORY WAGES", 40_000.0, 0.0),
                    tx("XYZ UNKNOWN VENDOR 123", 500.0, 0.0),
                ],
                balance_sheet: None,
            }],
            &snapshot(),
        );

        assert_eq!(record.states, vec!["KA".to_string()]);
        assert_eq!(record.unclassified_count, 1);
        assert!((record.waterfall.net_revenue - 100_000.0).abs() < 1e-9);
        assert!((record.waterfall.gross_margin.amount - 60_000.0).abs() < 1e-9);
        assert!(!record.reconciliation.is_available());
    }

    #[test]
    fn test_section_scoped_transactions_bypass_rules() {
        let mut direct = tx("SOME RANDOM DIRECT EXPENSE", 1_000.0, 0.0);
        direct.section = Some(LedgerSection::Direct);

        let record = build_period_record(
            Period::new(2024, 7).unwrap(),
            vec![StatePeriodInput {
                state: "KA".to_string(),
                transactions: vec![direct],
                balance_sheet: None,
            }],
            &RuleSnapshot::new(vec![]),
            "KA",
        );

        // No rules at all, yet the section-scoped entry still lands in COGS.
        assert_eq!(record.unclassified_count, 0);
        assert_eq!(record.aggregations.head_total(Head::CostOfGoods), 1_000.0);
    }
}
