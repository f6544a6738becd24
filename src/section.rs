use crate::schema::{
    ClassifiedTransaction, ConfidenceTier, Head, LedgerSection, Transaction, SUBHEAD_OTHER_DIRECT,
    SUBHEAD_OTHER_OPEX,
};

/// Keyword table for the trading/manufacturing section. Every entry in that
/// section is a direct cost; only the subhead varies. First hit wins.
const DIRECT_KEYWORDS: &[(&[&str], &str)] = &[
    (&["job work", "jobwork"], "Job Work"),
    (&["wage", "labour", "labor"], "Wages"),
    (
        &["transport", "freight", "cartage", "carriage"],
        "Freight & Transport",
    ),
    (&["rent"], "Factory Rent"),
    (
        &["electric", "power", "utilit", "maintenance", "repair", "water"],
        "Utilities & Maintenance",
    ),
    (&["quality", "testing", "inspection"], "Quality & Testing"),
    (&["purchase", "raw material", "material"], "Raw Materials"),
];

/// Keyword table for the general/administrative section. Entries span the
/// full taxonomy. Exclusions come first so a GST or personal ledger never
/// lands in an expense head. First hit wins.
const GENERAL_KEYWORDS: &[(&[&str], Head, &str)] = &[
    (&["gst", "tds", "tcs"], Head::Excluded, "GST & TDS"),
    (
        &["drawings", "personal", "capital account"],
        Head::Excluded,
        "Personal & Capital",
    ),
    (
        &["income tax"],
        Head::NonOperating,
        "Income Tax",
    ),
    (&["interest"], Head::NonOperating, "Interest"),
    (&["depreciation"], Head::NonOperating, "Depreciation"),
    (
        &["amortization", "amortisation"],
        Head::NonOperating,
        "Amortization",
    ),
    (&["amazon"], Head::ChannelFulfillment, "Amazon Fees"),
    (&["flipkart"], Head::ChannelFulfillment, "Flipkart Fees"),
    (
        &["courier", "shipping", "delhivery", "bluedart", "shiprocket"],
        Head::ChannelFulfillment,
        "Courier & Shipping",
    ),
    (&["packaging", "packing"], Head::ChannelFulfillment, "Packaging"),
    (
        &["razorpay", "payment gateway", "gateway charges"],
        Head::ChannelFulfillment,
        "Payment Gateway Fees",
    ),
    (&["facebook", "meta ads"], Head::SalesMarketing, "Facebook Ads"),
    (&["google ads", "adwords"], Head::SalesMarketing, "Google Ads"),
    (
        &["agency", "content", "influencer"],
        Head::SalesMarketing,
        "Agency & Content",
    ),
    (
        &["marketing", "advertis", "promotion"],
        Head::SalesMarketing,
        "Other Marketing",
    ),
    (
        &["subscription", "software", "shopify", "saas"],
        Head::PlatformCosts,
        "Software Subscriptions",
    ),
    (
        &["server", "hosting", "domain", "aws"],
        Head::PlatformCosts,
        "Server & Hosting",
    ),
    (&["salary", "salaries", "payroll"], Head::OperatingExpenses, "Salaries"),
    (
        &["legal", "professional", "audit", "consultancy"],
        Head::OperatingExpenses,
        "Legal & Professional",
    ),
    (&["bank"], Head::OperatingExpenses, "Banking Charges"),
    (
        &["travel", "conveyance", "stationery", "printing", "office expense"],
        Head::OperatingExpenses,
        "Travel & Admin",
    ),
    (&["rent"], Head::OperatingExpenses, "Office Rent"),
];

/// Subhead for a trading/manufacturing-section entry. The head is always
/// CostOfGoods; unmatched names fall through to the other-direct bucket.
pub fn map_direct_subhead(account: &str) -> &'static str {
    let name = account.to_lowercase();
    for (keywords, subhead) in DIRECT_KEYWORDS {
        if keywords.iter().any(|k| name.contains(k)) {
            return subhead;
        }
    }
    SUBHEAD_OTHER_DIRECT
}

/// Head and subhead for a general/administrative-section entry. Nothing in
/// this section is allowed to remain unclassified: an unmatched name is an
/// operating expense, not an unknown.
pub fn map_general(account: &str) -> (Head, &'static str) {
    let name = account.to_lowercase();
    for (keywords, head, subhead) in GENERAL_KEYWORDS {
        if keywords.iter().any(|k| name.contains(k)) {
            return (*head, subhead);
        }
    }
    (Head::OperatingExpenses, SUBHEAD_OTHER_OPEX)
}

/// Classifies a section-scoped transaction. A keyword hit is a Medium-tier
/// decision; the fallback buckets are Low.
pub fn map_section_transaction(
    transaction: Transaction,
    section: LedgerSection,
) -> ClassifiedTransaction {
    let (head, subhead) = match section {
        LedgerSection::Direct => (Head::CostOfGoods, map_direct_subhead(&transaction.account)),
        LedgerSection::General => map_general(&transaction.account),
    };

    let fallback = subhead == SUBHEAD_OTHER_DIRECT || subhead == SUBHEAD_OTHER_OPEX;
    ClassifiedTransaction {
        transaction,
        head,
        subhead: subhead.to_string(),
        tier: if fallback {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::Medium
        },
        user_confirmed: false,
        matched_rule_id: None,
        matched_pattern: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(account: &str, section: LedgerSection) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            account: account.to_string(),
            debit: 1000.0,
            credit: 0.0,
            state: "KA".to_string(),
            section: Some(section),
            notes: None,
        }
    }

    #[test]
    fn test_direct_section_always_cost_of_goods() {
        for account in [
            "JOB WORK CHARGES",
            "FACTORY WAGES",
            "FREIGHT INWARD",
            "GODOWN RENT",
            "ELECTRICITY CHARGES",
            "FABRIC TESTING LAB",
            "YARN PURCHASE",
            "MISC FACTORY EXP",
        ] {
            let classified =
                map_section_transaction(tx(account, LedgerSection::Direct), LedgerSection::Direct);
            assert_eq!(classified.head, Head::CostOfGoods, "account {}", account);
            assert!(
                Head::CostOfGoods.is_valid_subhead(&classified.subhead),
                "subhead {} not in CostOfGoods",
                classified.subhead
            );
        }
    }

    #[test]
    fn test_direct_subhead_keywords() {
        assert_eq!(map_direct_subhead("JOB WORK CHARGES"), "Job Work");
        assert_eq!(map_direct_subhead("FACTORY WAGES"), "Wages");
        assert_eq!(map_direct_subhead("FREIGHT INWARD"), "Freight & Transport");
        assert_eq!(map_direct_subhead("GODOWN RENT"), "Factory Rent");
        assert_eq!(
            map_direct_subhead("MACHINE REPAIR"),
            "Utilities & Maintenance"
        );
        assert_eq!(map_direct_subhead("QUALITY INSPECTION"), "Quality & Testing");
        assert_eq!(map_direct_subhead("YARN PURCHASE"), "Raw Materials");
        assert_eq!(map_direct_subhead("SUNDRY EXP"), SUBHEAD_OTHER_DIRECT);
    }

    #[test]
    fn test_general_keywords_assign_head_and_subhead() {
        assert_eq!(
            map_general("AMAZON SELLER FEES"),
            (Head::ChannelFulfillment, "Amazon Fees")
        );
        assert_eq!(
            map_general("FACEBOOK ADS"),
            (Head::SalesMarketing, "Facebook Ads")
        );
        assert_eq!(
            map_general("SHOPIFY SUBSCRIPTION"),
            (Head::PlatformCosts, "Software Subscriptions")
        );
        assert_eq!(map_general("STAFF SALARY"), (Head::OperatingExpenses, "Salaries"));
        assert_eq!(
            map_general("INTEREST ON TERM LOAN"),
            (Head::NonOperating, "Interest")
        );
        assert_eq!(
            map_general("DEPRECIATION A/C"),
            (Head::NonOperating, "Depreciation")
        );
        assert_eq!(map_general("GST PAYABLE"), (Head::Excluded, "GST & TDS"));
        assert_eq!(
            map_general("PROPRIETOR DRAWINGS"),
            (Head::Excluded, "Personal & Capital")
        );
    }

    #[test]
    fn test_general_rent_is_office_rent_not_factory_rent() {
        assert_eq!(map_general("OFFICE RENT"), (Head::OperatingExpenses, "Office Rent"));
    }

    #[test]
    fn test_general_section_never_unclassified() {
        let (head, subhead) = map_general("COMPLETELY UNKNOWN LEDGER 42");
        assert_eq!(head, Head::OperatingExpenses);
        assert_eq!(subhead, SUBHEAD_OTHER_OPEX);

        let classified = map_section_transaction(
            tx("COMPLETELY UNKNOWN LEDGER 42", LedgerSection::General),
            LedgerSection::General,
        );
        assert_eq!(classified.tier, ConfidenceTier::Low);
    }

    #[test]
    fn test_exclusions_beat_expense_keywords() {
        // "INTEREST ON GST" carries both an exclusion and an expense keyword;
        // the exclusion row comes first in the table.
        assert_eq!(map_general("INTEREST ON GST"), (Head::Excluded, "GST & TDS"));
    }

    #[test]
    fn test_mapped_subheads_are_valid() {
        for account in [
            "AMAZON SELLER FEES",
            "RAZORPAY GATEWAY CHARGES",
            "GOOGLE ADS",
            "AWS HOSTING",
            "STAFF SALARY",
            "CA AUDIT FEES",
            "HDFC BANK CHARGES",
            "TRAIN TRAVEL",
            "OFFICE RENT",
            "UNKNOWN LEDGER",
        ] {
            let (head, subhead) = map_general(account);
            assert!(
                head.is_valid_subhead(subhead),
                "{} -> {}/{} invalid",
                account,
                head,
                subhead
            );
        }
    }
}
