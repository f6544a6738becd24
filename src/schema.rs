use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Subheads the engine itself reads by name.
pub const SUBHEAD_RAW_MATERIALS: &str = "Raw Materials";
pub const SUBHEAD_INTEREST: &str = "Interest";
pub const SUBHEAD_DEPRECIATION: &str = "Depreciation";
pub const SUBHEAD_AMORTIZATION: &str = "Amortization";
pub const SUBHEAD_INCOME_TAX: &str = "Income Tax";
pub const SUBHEAD_STOCK_TRANSFER: &str = "Stock Transfer";
pub const SUBHEAD_OTHER_DIRECT: &str = "Other Direct Expense";
pub const SUBHEAD_OTHER_OPEX: &str = "Other Operating Expense";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum EconomicType {
    #[schemars(description = "Credit-side amounts count toward the waterfall")]
    Revenue,

    #[schemars(description = "Debit-side amounts count toward the waterfall")]
    Expense,

    #[schemars(
        description = "Both sides are summed for audit transparency; never enters the waterfall"
    )]
    Ignore,
}

/// The fixed closed set of top-level categories. Every classified
/// transaction lands in exactly one head.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum Head {
    #[schemars(description = "Gross sales, broken down by sales channel (credit balance)")]
    Revenue,

    #[schemars(description = "Sales returns by channel; reduces gross revenue")]
    Returns,

    #[schemars(description = "Trade and cash discounts given; reduces gross revenue")]
    Discounts,

    #[schemars(description = "Output taxes collected on sales; reduces gross revenue")]
    Taxes,

    #[schemars(
        description = "Direct cost of goods manufactured: raw materials, job work, wages, freight and other factory expenses"
    )]
    CostOfGoods,

    #[schemars(
        description = "Marketplace commissions, courier, packaging and payment gateway costs"
    )]
    ChannelFulfillment,

    #[schemars(description = "Advertising and marketing spend")]
    SalesMarketing,

    #[schemars(description = "Software subscriptions and hosting")]
    PlatformCosts,

    #[schemars(description = "Salaries, rent, professional fees and other administrative costs")]
    OperatingExpenses,

    #[schemars(description = "Interest, depreciation, amortization and income tax")]
    NonOperating,

    #[schemars(
        description = "Amounts excluded from the P&L entirely: stock transfers, GST/TDS balances, personal and capital items"
    )]
    Excluded,

    #[schemars(description = "Amounts deliberately ignored but retained for audit")]
    Ignored,
}

impl Head {
    pub fn economic_type(&self) -> EconomicType {
        match self {
            Head::Revenue => EconomicType::Revenue,
            Head::Returns
            | Head::Discounts
            | Head::Taxes
            | Head::CostOfGoods
            | Head::ChannelFulfillment
            | Head::SalesMarketing
            | Head::PlatformCosts
            | Head::OperatingExpenses
            | Head::NonOperating => EconomicType::Expense,
            Head::Excluded | Head::Ignored => EconomicType::Ignore,
        }
    }

    /// The fixed set of valid subheads for this head. Configuration, not
    /// inference: rules naming a subhead outside this set are rejected.
    pub fn subheads(&self) -> &'static [&'static str] {
        match self {
            Head::Revenue => &[
                "Amazon Sales",
                "Flipkart Sales",
                "Website Sales",
                "Offline Sales",
                "Other Sales",
            ],
            Head::Returns => &[
                "Amazon Returns",
                "Flipkart Returns",
                "Website Returns",
                "Offline Returns",
                "Other Returns",
            ],
            Head::Discounts => &["Trade Discounts", "Cash Discounts", "Other Discounts"],
            Head::Taxes => &["GST Output", "TCS", "Other Taxes"],
            Head::CostOfGoods => &[
                SUBHEAD_RAW_MATERIALS,
                "Job Work",
                "Wages",
                "Freight & Transport",
                "Factory Rent",
                "Utilities & Maintenance",
                "Quality & Testing",
                SUBHEAD_OTHER_DIRECT,
            ],
            Head::ChannelFulfillment => &[
                "Amazon Fees",
                "Flipkart Fees",
                "Courier & Shipping",
                "Packaging",
                "Payment Gateway Fees",
                "Other Fulfillment",
            ],
            Head::SalesMarketing => &[
                "Facebook Ads",
                "Google Ads",
                "Marketplace Ads",
                "Agency & Content",
                "Other Marketing",
            ],
            Head::PlatformCosts => &[
                "Software Subscriptions",
                "Server & Hosting",
                "Other Platform",
            ],
            Head::OperatingExpenses => &[
                "Salaries",
                "Office Rent",
                "Legal & Professional",
                "Banking Charges",
                "Travel & Admin",
                SUBHEAD_OTHER_OPEX,
            ],
            Head::NonOperating => &[
                SUBHEAD_INTEREST,
                SUBHEAD_DEPRECIATION,
                SUBHEAD_AMORTIZATION,
                SUBHEAD_INCOME_TAX,
                "Other Non-Operating",
            ],
            Head::Excluded => &[SUBHEAD_STOCK_TRANSFER, "GST & TDS", "Personal & Capital"],
            Head::Ignored => &["Ignored"],
        }
    }

    pub fn is_valid_subhead(&self, subhead: &str) -> bool {
        self.subheads().contains(&subhead)
    }

    pub fn all() -> &'static [Head] {
        &[
            Head::Revenue,
            Head::Returns,
            Head::Discounts,
            Head::Taxes,
            Head::CostOfGoods,
            Head::ChannelFulfillment,
            Head::SalesMarketing,
            Head::PlatformCosts,
            Head::OperatingExpenses,
            Head::NonOperating,
            Head::Excluded,
            Head::Ignored,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Head::Revenue => "Revenue",
            Head::Returns => "Returns",
            Head::Discounts => "Discounts",
            Head::Taxes => "Taxes",
            Head::CostOfGoods => "Cost of Goods",
            Head::ChannelFulfillment => "Channel & Fulfillment",
            Head::SalesMarketing => "Sales & Marketing",
            Head::PlatformCosts => "Platform Costs",
            Head::OperatingExpenses => "Operating Expenses",
            Head::NonOperating => "Non-Operating",
            Head::Excluded => "Excluded",
            Head::Ignored => "Ignored",
        }
    }
}

impl std::fmt::Display for Head {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Sales channels used for the revenue and returns breakdowns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    Amazon,
    Flipkart,
    Website,
    Offline,
    Other,
}

impl Channel {
    pub fn all() -> &'static [Channel] {
        &[
            Channel::Amazon,
            Channel::Flipkart,
            Channel::Website,
            Channel::Offline,
            Channel::Other,
        ]
    }

    pub fn revenue_subhead(&self) -> &'static str {
        match self {
            Channel::Amazon => "Amazon Sales",
            Channel::Flipkart => "Flipkart Sales",
            Channel::Website => "Website Sales",
            Channel::Offline => "Offline Sales",
            Channel::Other => "Other Sales",
        }
    }

    pub fn returns_subhead(&self) -> &'static str {
        match self {
            Channel::Amazon => "Amazon Returns",
            Channel::Flipkart => "Flipkart Returns",
            Channel::Website => "Website Returns",
            Channel::Offline => "Offline Returns",
            Channel::Other => "Other Returns",
        }
    }

    pub fn of_revenue_subhead(subhead: &str) -> Option<Channel> {
        Channel::all()
            .iter()
            .copied()
            .find(|c| c.revenue_subhead() == subhead)
    }

    pub fn of_returns_subhead(subhead: &str) -> Option<Channel> {
        Channel::all()
            .iter()
            .copied()
            .find(|c| c.returns_subhead() == subhead)
    }
}

/// The two ledger sections a transaction may arrive pre-scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum LedgerSection {
    #[schemars(
        description = "Trading/manufacturing section: every entry is a direct cost, only the subhead varies"
    )]
    Direct,

    #[schemars(
        description = "General/administrative section: entries span the full taxonomy and are never left unclassified"
    )]
    General,
}

/// One raw ledger line. Produced by the (external) parsing layer and
/// read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub date: NaiveDate,

    #[schemars(description = "Free-text account/party name as it appears in the ledger")]
    pub account: String,

    pub debit: f64,
    pub credit: f64,

    #[schemars(description = "Originating organizational sub-unit")]
    pub state: String,

    #[serde(default)]
    #[schemars(description = "Ledger section, when the source already scopes the entry")]
    pub section: Option<LedgerSection>,

    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

/// A transaction with its category decision and the evidence for it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassifiedTransaction {
    pub transaction: Transaction,
    pub head: Head,
    pub subhead: String,
    pub tier: ConfidenceTier,

    #[schemars(description = "True once a user has confirmed the assignment; survives re-classification")]
    #[serde(default)]
    pub user_confirmed: bool,

    #[serde(default)]
    pub matched_rule_id: Option<String>,

    #[serde(default)]
    pub matched_pattern: Option<String>,
}

/// Emitted for every applied classification; the surrounding system may
/// persist these as new user-authored rules.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationEvent {
    pub account: String,
    pub head: Head,
    pub subhead: String,
    pub rule_id: Option<String>,
    pub pattern: Option<String>,
}

/// Independently reported balance-sheet figures for one state and period.
/// Source of the stock-derived COGM figure and the reconciliation check.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StateBalanceSheet {
    pub state: String,
    pub opening_stock: f64,
    pub closing_stock: f64,
    pub purchases: f64,
    pub gross_sales: f64,
    pub net_profit_or_loss: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_head_has_subheads() {
        for head in Head::all() {
            assert!(
                !head.subheads().is_empty(),
                "head {} has no subheads",
                head
            );
        }
    }

    #[test]
    fn test_subhead_validation() {
        assert!(Head::ChannelFulfillment.is_valid_subhead("Amazon Fees"));
        assert!(!Head::ChannelFulfillment.is_valid_subhead("Facebook Ads"));
        assert!(Head::CostOfGoods.is_valid_subhead(SUBHEAD_RAW_MATERIALS));
        assert!(Head::NonOperating.is_valid_subhead(SUBHEAD_INCOME_TAX));
    }

    #[test]
    fn test_economic_types() {
        assert_eq!(Head::Revenue.economic_type(), EconomicType::Revenue);
        assert_eq!(Head::Returns.economic_type(), EconomicType::Expense);
        assert_eq!(Head::CostOfGoods.economic_type(), EconomicType::Expense);
        assert_eq!(Head::Excluded.economic_type(), EconomicType::Ignore);
        assert_eq!(Head::Ignored.economic_type(), EconomicType::Ignore);
    }

    #[test]
    fn test_channel_subhead_round_trip() {
        for channel in Channel::all() {
            assert_eq!(
                Channel::of_revenue_subhead(channel.revenue_subhead()),
                Some(*channel)
            );
            assert_eq!(
                Channel::of_returns_subhead(channel.returns_subhead()),
                Some(*channel)
            );
        }
        assert_eq!(Channel::of_revenue_subhead("Amazon Fees"), None);
    }

    #[test]
    fn test_transaction_serialization() {
        let tx = Transaction {
            date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
            account: "AMAZON LOGISTICS EXP".to_string(),
            debit: 5000.0,
            credit: 0.0,
            state: "KA".to_string(),
            section: None,
            notes: None,
        };

        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.account, "AMAZON LOGISTICS EXP");
        assert_eq!(back.debit, 5000.0);
        assert!(back.section.is_none());
    }
}
