use crate::error::{Result, WaterfallError};
use crate::schema::{ConfidenceTier, Head};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum MatchType {
    #[schemars(description = "Case-insensitive, whitespace-trimmed full-string equality")]
    Exact,

    #[schemars(description = "Case-insensitive substring test")]
    Contains,

    #[schemars(
        description = "Regular expression compiled case-insensitively; an invalid pattern degrades to a Contains test"
    )]
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum RuleProvenance {
    User,
    System,
    Ai,
}

impl RuleProvenance {
    /// Default priority band. User-authored rules outrank system rules,
    /// which outrank AI suggestions, unless a caller numbers them otherwise.
    pub fn default_priority(&self) -> i32 {
        match self {
            RuleProvenance::User => 0,
            RuleProvenance::System => 100,
            RuleProvenance::Ai => 200,
        }
    }
}

/// One classification rule. Rules are owned by the surrounding system and
/// reach the engine only through an immutable [`RuleSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationRule {
    #[schemars(description = "Stable identifier the CRUD interface is keyed by")]
    pub id: String,

    #[schemars(description = "Pattern text, interpreted per match_type")]
    pub pattern: String,

    pub match_type: MatchType,
    pub head: Head,
    pub subhead: String,

    #[schemars(description = "Numeric confidence in [0, 1]; absent means tier derives from provenance")]
    #[serde(default)]
    pub confidence: Option<f64>,

    #[schemars(description = "Lower numbers are evaluated first")]
    pub priority: i32,

    pub active: bool,
    pub provenance: RuleProvenance,
}

impl ClassificationRule {
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        match_type: MatchType,
        head: Head,
        subhead: impl Into<String>,
        provenance: RuleProvenance,
    ) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            match_type,
            head,
            subhead: subhead.into(),
            confidence: None,
            priority: provenance.default_priority(),
            active: true,
            provenance,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn confidence_source(&self) -> ConfidenceSource {
        match self.confidence {
            Some(value) => ConfidenceSource::Numeric(value),
            None => ConfidenceSource::ProvenanceOnly(self.provenance),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.head.is_valid_subhead(&self.subhead) {
            return Err(WaterfallError::UnknownSubhead {
                head: self.head.to_string(),
                subhead: self.subhead.clone(),
            });
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(WaterfallError::InvalidConfidence(confidence));
            }
        }
        Ok(())
    }

    /// JSON Schema for the rule shape, exported for the external
    /// rule-authoring surface and the AI fallback suggester.
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ClassificationRule)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

/// Where a rule's confidence tier comes from: a numeric figure when the
/// rule carries one, otherwise its provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfidenceSource {
    Numeric(f64),
    ProvenanceOnly(RuleProvenance),
}

impl ConfidenceSource {
    pub fn tier(&self) -> ConfidenceTier {
        match self {
            ConfidenceSource::Numeric(value) if *value >= 0.8 => ConfidenceTier::High,
            ConfidenceSource::Numeric(value) if *value >= 0.5 => ConfidenceTier::Medium,
            ConfidenceSource::Numeric(_) => ConfidenceTier::Low,
            ConfidenceSource::ProvenanceOnly(RuleProvenance::User) => ConfidenceTier::High,
            ConfidenceSource::ProvenanceOnly(_) => ConfidenceTier::Medium,
        }
    }
}

/// An immutable, ordered view of the rule set taken once per pipeline run:
/// active rules only, ascending by priority, with the original insertion
/// order breaking ties. One run classifies every transaction against the
/// same snapshot.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    rules: Vec<ClassificationRule>,
}

impl RuleSnapshot {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        let mut rules: Vec<ClassificationRule> =
            rules.into_iter().filter(|r| r.active).collect();
        // Stable sort: equal priorities keep insertion order.
        rules.sort_by_key(|r| r.priority);
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassificationRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The storage seam for rules. The engine only ever reads a snapshot; the
/// mutating operations exist for the surrounding system that owns the rules.
pub trait RuleRepository {
    fn list_active(&self) -> RuleSnapshot;
    fn add(&mut self, rule: ClassificationRule) -> Result<()>;
    fn update(&mut self, rule: ClassificationRule) -> Result<()>;
    fn delete(&mut self, id: &str) -> Result<()>;
}

/// Insertion-ordered in-memory store, the reference implementation used in
/// tests and by callers without an external backing store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleRepository {
    rules: Vec<ClassificationRule>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<ClassificationRule>) -> Result<Self> {
        let mut repo = Self::new();
        for rule in rules {
            repo.add(rule)?;
        }
        Ok(repo)
    }

    pub fn get(&self, id: &str) -> Option<&ClassificationRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleRepository for InMemoryRuleRepository {
    fn list_active(&self) -> RuleSnapshot {
        RuleSnapshot::new(self.rules.clone())
    }

    fn add(&mut self, rule: ClassificationRule) -> Result<()> {
        rule.validate()?;
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(WaterfallError::DuplicateRuleId(rule.id));
        }
        self.rules.push(rule);
        Ok(())
    }

    fn update(&mut self, rule: ClassificationRule) -> Result<()> {
        rule.validate()?;
        let existing = self
            .rules
            .iter_mut()
            .find(|r| r.id == rule.id)
            .ok_or_else(|| WaterfallError::UnknownRuleId(rule.id.clone()))?;
        *existing = rule;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        if self.rules.len() == before {
            return Err(WaterfallError::UnknownRuleId(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, priority: i32) -> ClassificationRule {
        ClassificationRule::new(
            id,
            "amazon",
            MatchType::Contains,
            Head::ChannelFulfillment,
            "Amazon Fees",
            RuleProvenance::System,
        )
        .with_priority(priority)
    }

    #[test]
    fn test_snapshot_sorts_by_priority() {
        let snapshot = RuleSnapshot::new(vec![rule("b", 5), rule("a", 1), rule("c", 3)]);
        let ids: Vec<&str> = snapshot.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_snapshot_tie_break_is_insertion_order() {
        let snapshot = RuleSnapshot::new(vec![rule("first", 5), rule("second", 5)]);
        let ids: Vec<&str> = snapshot.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_snapshot_filters_inactive() {
        let mut inactive = rule("off", 0);
        inactive.active = false;
        let snapshot = RuleSnapshot::new(vec![inactive, rule("on", 1)]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.iter().next().unwrap().id, "on");
    }

    #[test]
    fn test_confidence_decision_table() {
        assert_eq!(ConfidenceSource::Numeric(0.95).tier(), ConfidenceTier::High);
        assert_eq!(ConfidenceSource::Numeric(0.8).tier(), ConfidenceTier::High);
        assert_eq!(ConfidenceSource::Numeric(0.5).tier(), ConfidenceTier::Medium);
        assert_eq!(ConfidenceSource::Numeric(0.49).tier(), ConfidenceTier::Low);
        assert_eq!(
            ConfidenceSource::ProvenanceOnly(RuleProvenance::User).tier(),
            ConfidenceTier::High
        );
        assert_eq!(
            ConfidenceSource::ProvenanceOnly(RuleProvenance::System).tier(),
            ConfidenceTier::Medium
        );
        assert_eq!(
            ConfidenceSource::ProvenanceOnly(RuleProvenance::Ai).tier(),
            ConfidenceTier::Medium
        );
    }

    #[test]
    fn test_provenance_priority_bands() {
        assert!(
            RuleProvenance::User.default_priority() < RuleProvenance::System.default_priority()
        );
        assert!(RuleProvenance::System.default_priority() < RuleProvenance::Ai.default_priority());
    }

    #[test]
    fn test_repository_crud() {
        let mut repo = InMemoryRuleRepository::new();
        repo.add(rule("r1", 1)).unwrap();
        repo.add(rule("r2", 2)).unwrap();

        assert!(matches!(
            repo.add(rule("r1", 9)),
            Err(WaterfallError::DuplicateRuleId(_))
        ));

        let mut updated = rule("r2", 0);
        updated.pattern = "flipkart".to_string();
        updated.subhead = "Flipkart Fees".to_string();
        repo.update(updated).unwrap();
        assert_eq!(repo.get("r2").unwrap().pattern, "flipkart");

        assert!(matches!(
            repo.update(rule("missing", 1)),
            Err(WaterfallError::UnknownRuleId(_))
        ));

        repo.delete("r1").unwrap();
        assert!(repo.get("r1").is_none());
        assert!(matches!(
            repo.delete("r1"),
            Err(WaterfallError::UnknownRuleId(_))
        ));
    }

    #[test]
    fn test_repository_rejects_unknown_subhead() {
        let mut repo = InMemoryRuleRepository::new();
        let mut bad = rule("bad", 1);
        bad.subhead = "Facebook Ads".to_string();
        assert!(matches!(
            repo.add(bad),
            Err(WaterfallError::UnknownSubhead { .. })
        ));
    }

    #[test]
    fn test_repository_rejects_out_of_range_confidence() {
        let mut repo = InMemoryRuleRepository::new();
        let bad = rule("bad", 1).with_confidence(1.5);
        assert!(matches!(
            repo.add(bad),
            Err(WaterfallError::InvalidConfidence(_))
        ));
    }

    #[test]
    fn test_rule_schema_generation() {
        let schema_json = ClassificationRule::schema_as_json().unwrap();
        assert!(schema_json.contains("pattern"));
        assert!(schema_json.contains("match_type"));
        assert!(schema_json.contains("priority"));
    }
}
