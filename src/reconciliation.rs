use crate::schema::StateBalanceSheet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Variance between the classification-derived waterfall and independently
/// reported balance-sheet figures. Informational only: the engine reports
/// the disagreement and never adjusts the waterfall to close it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationReport {
    pub mis_net_revenue: f64,
    pub bs_gross_sales: f64,
    pub stock_transfers: f64,
    pub revenue_variance: f64,

    pub mis_net_income: f64,
    pub bs_net_profit_or_loss: f64,
    pub profit_variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "PascalCase")]
pub enum ReconciliationOutcome {
    /// No balance-sheet figures were supplied; nothing to check.
    NotAvailable,
    Checked(ReconciliationReport),
}

impl ReconciliationOutcome {
    /// `revenue_variance = misNetRevenue - (bsGrossSales - stockTransfers)`,
    /// `profit_variance = misNetIncome - bsNetProfitOrLoss`, summed over all
    /// supplied state balance sheets.
    pub fn check(
        mis_net_revenue: f64,
        mis_net_income: f64,
        stock_transfers: f64,
        balance_sheets: &[StateBalanceSheet],
    ) -> Self {
        if balance_sheets.is_empty() {
            return ReconciliationOutcome::NotAvailable;
        }

        let bs_gross_sales: f64 = balance_sheets.iter().map(|bs| bs.gross_sales).sum();
        let bs_net_profit_or_loss: f64 =
            balance_sheets.iter().map(|bs| bs.net_profit_or_loss).sum();

        ReconciliationOutcome::Checked(ReconciliationReport {
            mis_net_revenue,
            bs_gross_sales,
            stock_transfers,
            revenue_variance: mis_net_revenue - (bs_gross_sales - stock_transfers),
            mis_net_income,
            bs_net_profit_or_loss,
            profit_variance: mis_net_income - bs_net_profit_or_loss,
        })
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ReconciliationOutcome::Checked(_))
    }

    pub fn report(&self) -> Option<&ReconciliationReport> {
        match self {
            ReconciliationOutcome::Checked(report) => Some(report),
            ReconciliationOutcome::NotAvailable => None,
        }
    }
}
