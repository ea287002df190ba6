//! Model vs. heuristic decision policy
//!
//! The application also flags users with a rule of thumb (low net savings or
//! a weak credit score). Which signal wins when both are available is a
//! configuration choice, not something inferred from call order.

use serde::{Deserialize, Serialize};

use crate::models::FraudVerdict;

/// How the model verdict and the heuristic are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Model decides when it has scored; heuristic only when untrained
    #[default]
    ModelFirst,
    /// Heuristic decides; the model verdict is advisory
    HeuristicFirst,
    /// Flag when either signal flags
    Either,
}

impl DecisionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionPolicy::ModelFirst => "model_first",
            DecisionPolicy::HeuristicFirst => "heuristic_first",
            DecisionPolicy::Either => "either",
        }
    }
}

impl std::fmt::Display for DecisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DecisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "model_first" => Ok(DecisionPolicy::ModelFirst),
            "heuristic_first" => Ok(DecisionPolicy::HeuristicFirst),
            "either" => Ok(DecisionPolicy::Either),
            _ => Err(format!(
                "Unknown decision policy: {} (expected model_first, heuristic_first or either)",
                s
            )),
        }
    }
}

/// A user's finances as supplied by the surrounding application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub income: f64,
    pub expenses: f64,
    pub credit_score: f64,
    pub debts: f64,
    pub monthly_investment: f64,
}

impl FinancialSnapshot {
    pub fn net_savings(&self) -> f64 {
        self.income - self.expenses
    }
}

/// Threshold rule used when the model is unavailable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistanceHeuristic {
    /// Net savings at or below this need attention
    pub max_net_savings: f64,
    /// Credit scores below this need attention
    pub min_credit_score: f64,
}

impl Default for AssistanceHeuristic {
    fn default() -> Self {
        Self {
            max_net_savings: 10_000.0,
            min_credit_score: 700.0,
        }
    }
}

impl AssistanceHeuristic {
    pub fn requires_assistance(&self, snapshot: &FinancialSnapshot) -> bool {
        snapshot.net_savings() <= self.max_net_savings
            || snapshot.credit_score < self.min_credit_score
    }
}

/// Which signal produced a [`Decision`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Model,
    Heuristic,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub flagged: bool,
    pub source: DecisionSource,
}

/// Combine a model verdict with the heuristic under `policy`
pub fn resolve(
    policy: DecisionPolicy,
    heuristic: &AssistanceHeuristic,
    verdict: &FraudVerdict,
    snapshot: &FinancialSnapshot,
) -> Decision {
    let rule = heuristic.requires_assistance(snapshot);

    let Some(model) = verdict.is_fraud() else {
        return Decision {
            flagged: rule,
            source: DecisionSource::Heuristic,
        };
    };

    match policy {
        DecisionPolicy::ModelFirst => Decision {
            flagged: model,
            source: DecisionSource::Model,
        },
        DecisionPolicy::HeuristicFirst => Decision {
            flagged: rule,
            source: DecisionSource::Heuristic,
        },
        DecisionPolicy::Either => Decision {
            flagged: model || rule,
            source: match (model, rule) {
                (true, false) => DecisionSource::Model,
                (false, true) => DecisionSource::Heuristic,
                _ => DecisionSource::Both,
            },
        },
    }
}

/// Plain-language advice for a snapshot
pub fn recommendations(
    heuristic: &AssistanceHeuristic,
    snapshot: &FinancialSnapshot,
    flagged: bool,
) -> Vec<String> {
    let mut advice = Vec::new();
    let net_savings = snapshot.net_savings();

    if flagged {
        if net_savings <= heuristic.max_net_savings {
            advice.push("Your savings are quite low. Aim to reduce expenses by at least 10%.".to_string());
        }
        if snapshot.credit_score < heuristic.min_credit_score {
            advice.push(
                "Work on improving your credit score: pay bills on time and reduce credit usage."
                    .to_string(),
            );
        }
        if snapshot.debts > 0.0 {
            advice.push(
                "You have outstanding debts. Create a repayment plan to lower interest burden."
                    .to_string(),
            );
        }
        if snapshot.monthly_investment <= 0.0 {
            advice.push("Consider starting a small monthly investment to build long-term wealth.".to_string());
        }
        if advice.is_empty() {
            advice.push("This activity was flagged for review. Check recent transactions.".to_string());
        }
    } else {
        advice.push("Your finances look stable. Keep monitoring your expenses.".to_string());
        if net_savings > 15_000.0 {
            advice.push(
                "Great savings! Consider diversifying into investments for higher returns."
                    .to_string(),
            );
        }
        if snapshot.credit_score >= 750.0 {
            advice.push(
                "Excellent credit score. You can explore premium credit cards or low-interest loans."
                    .to_string(),
            );
        }
    }

    advice
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> FinancialSnapshot {
        FinancialSnapshot {
            income: 80_000.0,
            expenses: 40_000.0,
            credit_score: 780.0,
            debts: 0.0,
            monthly_investment: 500.0,
        }
    }

    fn struggling() -> FinancialSnapshot {
        FinancialSnapshot {
            income: 30_000.0,
            expenses: 25_000.0,
            credit_score: 640.0,
            debts: 2_000.0,
            monthly_investment: 0.0,
        }
    }

    fn scored(is_fraud: bool) -> FraudVerdict {
        FraudVerdict::Scored {
            is_fraud,
            probability: if is_fraud { 0.9 } else { 0.1 },
        }
    }

    #[test]
    fn test_heuristic_thresholds() {
        let h = AssistanceHeuristic::default();
        assert!(!h.requires_assistance(&healthy()));
        assert!(h.requires_assistance(&struggling()));

        let mut edge = healthy();
        edge.expenses = edge.income - 10_000.0;
        assert!(h.requires_assistance(&edge));
    }

    #[test]
    fn test_untrained_falls_back_to_heuristic() {
        let h = AssistanceHeuristic::default();
        for policy in [
            DecisionPolicy::ModelFirst,
            DecisionPolicy::HeuristicFirst,
            DecisionPolicy::Either,
        ] {
            let d = resolve(policy, &h, &FraudVerdict::Untrained, &struggling());
            assert_eq!(
                d,
                Decision {
                    flagged: true,
                    source: DecisionSource::Heuristic
                }
            );
        }
    }

    #[test]
    fn test_policies_disagree_as_configured() {
        let h = AssistanceHeuristic::default();
        let verdict = scored(false);

        let model = resolve(DecisionPolicy::ModelFirst, &h, &verdict, &struggling());
        assert!(!model.flagged);
        assert_eq!(model.source, DecisionSource::Model);

        let rule = resolve(DecisionPolicy::HeuristicFirst, &h, &verdict, &struggling());
        assert!(rule.flagged);

        let either = resolve(DecisionPolicy::Either, &h, &scored(true), &struggling());
        assert_eq!(either.source, DecisionSource::Both);
        assert!(either.flagged);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "heuristic_first".parse::<DecisionPolicy>().unwrap(),
            DecisionPolicy::HeuristicFirst
        );
        assert!("ml_wins".parse::<DecisionPolicy>().is_err());
        assert_eq!(DecisionPolicy::default().to_string(), "model_first");
    }

    #[test]
    fn test_recommendations() {
        let h = AssistanceHeuristic::default();
        let advice = recommendations(&h, &struggling(), true);
        assert_eq!(advice.len(), 4);

        let advice = recommendations(&h, &healthy(), false);
        assert_eq!(advice.len(), 3);
        assert!(advice[0].contains("stable"));
    }
}
