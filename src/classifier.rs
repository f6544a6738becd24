use crate::rules::{ClassificationRule, RuleSnapshot};
use crate::schema::{ClassificationEvent, ClassifiedTransaction, ConfidenceTier, Head, Transaction};
use log::debug;
use regex::{Regex, RegexBuilder};

/// The category decision for one transaction, with the evidence needed to
/// justify it downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub head: Head,
    pub subhead: String,
    pub tier: ConfidenceTier,
    pub rule_id: String,
    pub pattern: String,
}

impl Classification {
    pub fn into_classified(self, transaction: Transaction) -> ClassifiedTransaction {
        ClassifiedTransaction {
            transaction,
            head: self.head,
            subhead: self.subhead,
            tier: self.tier,
            user_confirmed: false,
            matched_rule_id: Some(self.rule_id),
            matched_pattern: Some(self.pattern),
        }
    }

    pub fn to_event(&self, account: &str) -> ClassificationEvent {
        ClassificationEvent {
            account: account.to_string(),
            head: self.head,
            subhead: self.subhead.clone(),
            rule_id: Some(self.rule_id.clone()),
            pattern: Some(self.pattern.clone()),
        }
    }
}

enum Matcher {
    Exact(String),
    Contains(String),
    Regex(Regex),
}

impl Matcher {
    fn matches(&self, account: &str) -> bool {
        match self {
            Matcher::Exact(pattern) => account.trim().to_lowercase() == *pattern,
            Matcher::Contains(pattern) => account.to_lowercase().contains(pattern),
            Matcher::Regex(regex) => regex.is_match(account),
        }
    }
}

struct CompiledRule {
    rule: ClassificationRule,
    matcher: Matcher,
}

/// First-match classifier over one immutable rule snapshot. Patterns are
/// compiled once at construction; `classify` is then a pure function of the
/// transaction, so identical inputs always yield identical decisions.
pub struct Classifier {
    compiled: Vec<CompiledRule>,
}

impl Classifier {
    pub fn new(snapshot: &RuleSnapshot) -> Self {
        let compiled = snapshot
            .iter()
            .map(|rule| CompiledRule {
                matcher: compile_matcher(rule),
                rule: rule.clone(),
            })
            .collect();
        Self { compiled }
    }

    /// Returns the decision of the first matching rule, or `None` when no
    /// rule matches. An unmatched transaction is data, not an error: the
    /// caller keeps it in the unclassified bucket.
    pub fn classify(&self, transaction: &Transaction) -> Option<Classification> {
        for compiled in &self.compiled {
            if compiled.matcher.matches(&transaction.account) {
                let rule = &compiled.rule;
                return Some(Classification {
                    head: rule.head,
                    subhead: rule.subhead.clone(),
                    tier: rule.confidence_source().tier(),
                    rule_id: rule.id.clone(),
                    pattern: rule.pattern.clone(),
                });
            }
        }
        None
    }
}

fn compile_matcher(rule: &ClassificationRule) -> Matcher {
    use crate::rules::MatchType;

    match rule.match_type {
        MatchType::Exact => Matcher::Exact(rule.pattern.trim().to_lowercase()),
        MatchType::Contains => Matcher::Contains(rule.pattern.to_lowercase()),
        MatchType::Regex => match RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => Matcher::Regex(regex),
            Err(_) => {
                // Invalid pattern degrades to a substring test, never an error.
                debug!(
                    "rule {}: pattern '{}' is not a valid regex, matching as substring",
                    rule.id, rule.pattern
                );
                Matcher::Contains(rule.pattern.to_lowercase())
            }
        },
    }
}

/// One-shot convenience over [`Classifier`].
pub fn classify_transaction(
    transaction: &Transaction,
    snapshot: &RuleSnapshot,
) -> Option<Classification> {
    Classifier::new(snapshot).classify(transaction)
}

/// Routes a batch of transactions: section-scoped entries take the keyword
/// mapping path, everything else goes through the rule classifier. Returns
/// the classified set and the retained unclassified bucket.
pub fn classify_batch(
    transactions: Vec<Transaction>,
    classifier: &Classifier,
) -> (Vec<ClassifiedTransaction>, Vec<Transaction>) {
    let mut classified = Vec::new();
    let mut unclassified = Vec::new();

    for transaction in transactions {
        if let Some(section) = transaction.section {
            classified.push(crate::section::map_section_transaction(transaction, section));
        } else if let Some(decision) = classifier.classify(&transaction) {
            classified.push(decision.into_classified(transaction));
        } else {
            unclassified.push(transaction);
        }
    }

    (classified, unclassified)
}
