use crate::aggregation::AggregationSet;
use crate::schema::{
    Channel, Head, SUBHEAD_AMORTIZATION, SUBHEAD_DEPRECIATION, SUBHEAD_INCOME_TAX,
    SUBHEAD_INTEREST, SUBHEAD_RAW_MATERIALS, SUBHEAD_STOCK_TRANSFER,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Channel-level revenue breakdown. Stock transfers are excluded from
/// revenue entirely (they are not returns).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChannelRevenue {
    pub gross_by_channel: BTreeMap<Channel, f64>,
    pub returns_by_channel: BTreeMap<Channel, f64>,
    pub discounts: f64,
    pub taxes: f64,
    pub stock_transfers: f64,
}

impl ChannelRevenue {
    pub fn from_aggregations(set: &AggregationSet) -> Self {
        let mut breakdown = ChannelRevenue::default();

        if let Some(revenue) = set.heads.get(&Head::Revenue) {
            for (subhead, amount) in &revenue.subhead_totals {
                let channel = Channel::of_revenue_subhead(subhead).unwrap_or(Channel::Other);
                *breakdown.gross_by_channel.entry(channel).or_default() += amount;
            }
        }

        if let Some(returns) = set.heads.get(&Head::Returns) {
            for (subhead, amount) in &returns.subhead_totals {
                let channel = Channel::of_returns_subhead(subhead).unwrap_or(Channel::Other);
                *breakdown.returns_by_channel.entry(channel).or_default() += amount;
            }
        }

        breakdown.discounts = set.head_total(Head::Discounts);
        breakdown.taxes = set.head_total(Head::Taxes);
        breakdown.stock_transfers = set.subhead_total(Head::Excluded, SUBHEAD_STOCK_TRANSFER);
        breakdown
    }

    pub fn gross_sales(&self) -> f64 {
        self.gross_by_channel.values().sum()
    }

    pub fn total_returns(&self) -> f64 {
        self.returns_by_channel.values().sum()
    }

    /// Net revenue = gross - returns - discounts - taxes.
    pub fn net_revenue(&self) -> f64 {
        self.gross_sales() - self.total_returns() - self.discounts - self.taxes
    }

    pub fn merge(parts: &[&ChannelRevenue]) -> ChannelRevenue {
        let mut merged = ChannelRevenue::default();
        for part in parts {
            for (channel, amount) in &part.gross_by_channel {
                *merged.gross_by_channel.entry(*channel).or_default() += amount;
            }
            for (channel, amount) in &part.returns_by_channel {
                *merged.returns_by_channel.entry(*channel).or_default() += amount;
            }
            merged.discounts += part.discounts;
            merged.taxes += part.taxes;
            merged.stock_transfers += part.stock_transfers;
        }
        merged
    }
}

/// Cost-of-goods-manufactured breakdown. When stock figures are available
/// the raw-material cost is derived as opening + purchases - closing and
/// that derivation wins over the journal-classified Raw Materials subhead;
/// the journal figure stays visible for audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CogmBreakdown {
    pub opening_stock: f64,
    pub closing_stock: f64,
    pub purchases: f64,

    #[schemars(description = "CostOfGoods subhead totals other than Raw Materials")]
    pub direct_expenses: BTreeMap<String, f64>,

    #[schemars(description = "Journal-classified Raw Materials figure, used only when no stock figures exist")]
    pub journal_raw_materials: f64,

    pub stock_derived: bool,
}

impl CogmBreakdown {
    /// `stock` is (opening, purchases, closing) from the reported balance
    /// sheet, when present.
    pub fn from_aggregations(set: &AggregationSet, stock: Option<(f64, f64, f64)>) -> Self {
        let mut direct_expenses = BTreeMap::new();
        let mut journal_raw_materials = 0.0;

        if let Some(cogs) = set.heads.get(&Head::CostOfGoods) {
            for (subhead, amount) in &cogs.subhead_totals {
                if subhead == SUBHEAD_RAW_MATERIALS {
                    journal_raw_materials += amount;
                } else {
                    *direct_expenses.entry(subhead.clone()).or_default() += amount;
                }
            }
        }

        match stock {
            Some((opening, purchases, closing)) => Self {
                opening_stock: opening,
                closing_stock: closing,
                purchases,
                direct_expenses,
                journal_raw_materials,
                stock_derived: true,
            },
            None => Self {
                opening_stock: 0.0,
                closing_stock: 0.0,
                purchases: 0.0,
                direct_expenses,
                journal_raw_materials,
                stock_derived: false,
            },
        }
    }

    pub fn raw_material_consumed(&self) -> f64 {
        if self.stock_derived {
            self.opening_stock + self.purchases - self.closing_stock
        } else {
            self.journal_raw_materials
        }
    }

    pub fn total(&self) -> f64 {
        self.raw_material_consumed() + self.direct_expenses.values().sum::<f64>()
    }
}

/// One amount in the waterfall together with its share of net revenue.
/// The percent is 0 whenever net revenue is not positive, never NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarginFigure {
    pub amount: f64,
    pub percent: f64,
}

impl MarginFigure {
    pub fn of(amount: f64, net_revenue: f64) -> Self {
        Self {
            amount,
            percent: percent_of_revenue(amount, net_revenue),
        }
    }
}

pub fn percent_of_revenue(amount: f64, net_revenue: f64) -> f64 {
    if net_revenue > 0.0 {
        amount / net_revenue * 100.0
    } else {
        0.0
    }
}

/// Everything the staged pipeline reads. Each figure comes strictly from
/// the head aggregation (or COGM breakdown) named for it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaterfallInputs {
    pub net_revenue: f64,
    pub total_cogm: f64,
    pub channel_fulfillment: f64,
    pub sales_marketing: f64,
    pub platform_costs: f64,
    pub operating_expenses: f64,
    pub interest: f64,
    pub depreciation: f64,
    pub amortization: f64,
    pub income_tax: f64,
}

impl WaterfallInputs {
    pub fn from_parts(
        channel_revenue: &ChannelRevenue,
        cogm: &CogmBreakdown,
        set: &AggregationSet,
    ) -> Self {
        Self {
            net_revenue: channel_revenue.net_revenue(),
            total_cogm: cogm.total(),
            channel_fulfillment: set.head_total(Head::ChannelFulfillment),
            sales_marketing: set.head_total(Head::SalesMarketing),
            platform_costs: set.head_total(Head::PlatformCosts),
            operating_expenses: set.head_total(Head::OperatingExpenses),
            interest: set.subhead_total(Head::NonOperating, SUBHEAD_INTEREST),
            depreciation: set.subhead_total(Head::NonOperating, SUBHEAD_DEPRECIATION),
            amortization: set.subhead_total(Head::NonOperating, SUBHEAD_AMORTIZATION),
            income_tax: set.subhead_total(Head::NonOperating, SUBHEAD_INCOME_TAX),
        }
    }
}

/// The ordered stages of the margin cascade. Each stage deducts exactly one
/// figure from the running margin, so every formula is testable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum WaterfallStage {
    GrossMargin,
    Cm1,
    Cm2,
    Cm3,
    Ebitda,
    Ebt,
    NetIncome,
}

impl WaterfallStage {
    pub const ORDER: [WaterfallStage; 7] = [
        WaterfallStage::GrossMargin,
        WaterfallStage::Cm1,
        WaterfallStage::Cm2,
        WaterfallStage::Cm3,
        WaterfallStage::Ebitda,
        WaterfallStage::Ebt,
        WaterfallStage::NetIncome,
    ];

    /// The amount this stage subtracts from the previous margin.
    pub fn deduction(&self, inputs: &WaterfallInputs) -> f64 {
        match self {
            WaterfallStage::GrossMargin => inputs.total_cogm,
            WaterfallStage::Cm1 => inputs.channel_fulfillment,
            WaterfallStage::Cm2 => inputs.sales_marketing,
            WaterfallStage::Cm3 => inputs.platform_costs,
            WaterfallStage::Ebitda => inputs.operating_expenses,
            WaterfallStage::Ebt => inputs.interest + inputs.depreciation + inputs.amortization,
            WaterfallStage::NetIncome => inputs.income_tax,
        }
    }
}

/// The seven cascading margin figures for one scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarginWaterfall {
    pub net_revenue: f64,
    pub gross_margin: MarginFigure,
    pub cm1: MarginFigure,
    pub cm2: MarginFigure,
    pub cm3: MarginFigure,
    pub ebitda: MarginFigure,
    pub ebt: MarginFigure,
    pub net_income: MarginFigure,
}

impl MarginWaterfall {
    pub fn compute(inputs: &WaterfallInputs) -> Self {
        let net_revenue = inputs.net_revenue;
        let mut running = net_revenue;
        let figures: Vec<MarginFigure> = WaterfallStage::ORDER
            .iter()
            .map(|stage| {
                running -= stage.deduction(inputs);
                MarginFigure::of(running, net_revenue)
            })
            .collect();

        Self {
            net_revenue,
            gross_margin: figures[0],
            cm1: figures[1],
            cm2: figures[2],
            cm3: figures[3],
            ebitda: figures[4],
            ebt: figures[5],
            net_income: figures[6],
        }
    }
}
