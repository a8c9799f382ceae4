use serde::{Deserialize, Serialize};

use concorda_core::CanonicalTransaction;

use crate::util::levenshtein_distance;

/// A merchant-categorization rule: pattern over the transaction
/// description plus an optional amount band, mapping to a category label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub priority: i32,
    pub pattern: String,
    #[serde(default)]
    pub match_type: RuleMatch,
    pub category: String,
    pub amount_min_cents: Option<i64>,
    pub amount_max_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum RuleMatch {
    #[default]
    Contains,
    Exact,
    Regex,
    Fuzzy {
        threshold: f32,
    },
}

impl std::str::FromStr for RuleMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(RuleMatch::Contains),
            "exact" => Ok(RuleMatch::Exact),
            "regex" => Ok(RuleMatch::Regex),
            s if s.starts_with("fuzzy:") => {
                let threshold = s[6..]
                    .parse::<f32>()
                    .map_err(|_| "Invalid fuzzy threshold".to_string())?;
                Ok(RuleMatch::Fuzzy { threshold })
            }
            other => Err(format!("Unknown match type: '{other}'")),
        }
    }
}

/// Internal pairing of a rule with its precompiled regex (if applicable).
struct CompiledRule {
    rule: CategoryRule,
    compiled_regex: Option<regex::Regex>,
}

/// Process-wide immutable rule table: compiled once, shared read-only
/// across concurrent matching runs, never mutated afterwards.
pub struct CategoryRuleEngine {
    rules: Vec<CompiledRule>,
}

impl CategoryRuleEngine {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = if let RuleMatch::Regex = &rule.match_type {
                    regex::Regex::new(&rule.pattern).ok()
                } else {
                    None
                };
                CompiledRule { rule, compiled_regex }
            })
            .collect();
        // Highest priority first.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Self { rules: compiled }
    }

    /// Load rules from a TOML document holding a `[[rules]]` array of
    /// tables.
    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        #[derive(Deserialize)]
        struct RuleFile {
            #[serde(default)]
            rules: Vec<CategoryRule>,
        }
        let file: RuleFile =
            toml::from_str(toml_content).map_err(|e| format!("Failed to parse TOML: {e}"))?;
        Ok(Self::new(file.rules))
    }

    pub fn find_matching_rule(&self, tx: &CanonicalTransaction) -> Option<&CategoryRule> {
        self.rules
            .iter()
            .find(|cr| self.rule_matches(cr, tx))
            .map(|cr| &cr.rule)
    }

    /// Returns indices + matched rules for all transactions, in order.
    pub fn apply_rules<'a>(
        &'a self,
        transactions: &[CanonicalTransaction],
    ) -> Vec<(usize, &'a CategoryRule)> {
        transactions
            .iter()
            .enumerate()
            .filter_map(|(idx, tx)| self.find_matching_rule(tx).map(|r| (idx, r)))
            .collect()
    }

    fn rule_matches(&self, cr: &CompiledRule, tx: &CanonicalTransaction) -> bool {
        let rule = &cr.rule;
        let amount_cents = tx.amount.to_cents();

        // Optional amount band filter.
        if let Some(min) = rule.amount_min_cents {
            if amount_cents < min {
                return false;
            }
        }
        if let Some(max) = rule.amount_max_cents {
            if amount_cents > max {
                return false;
            }
        }

        let text = tx.description.to_lowercase();
        let pattern = rule.pattern.to_lowercase();

        match &rule.match_type {
            RuleMatch::Contains => text.contains(&pattern),
            RuleMatch::Exact => text == pattern,
            RuleMatch::Regex => cr
                .compiled_regex
                .as_ref()
                .is_some_and(|re| re.is_match(&tx.description)),
            RuleMatch::Fuzzy { threshold } => fuzzy_score(&text, &pattern) >= *threshold,
        }
    }
}

fn fuzzy_score(s1: &str, s2: &str) -> f32 {
    let max_len = s1.chars().count().max(s2.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(s1, s2) as f32 / max_len as f32)
}
