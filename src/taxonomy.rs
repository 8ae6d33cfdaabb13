use serde::{Deserialize, Serialize};

/// The income categories the classification prompts offer, in canonical order.
///
/// `transfer` and `nonIncomeOther` cover money leaving the account, so the
/// same list can label every line of a statement.
pub const SUPPORTED_INCOME_CATEGORIES: &[&str] = &[
    "refund",
    "selfEmployed1099",
    "uncategorizedIncome",
    "disabilityMaternityBenefits",
    "unemployment",
    "bankInterest",
    "governmentCashAssistance",
    "supplementalSecurityIncome",
    "socialSecurityBenefits",
    "veteransPensionBenefits",
    "militaryIncome",
    "childSupport",
    "loan",
    "cashbackReward",
    "transfer",
    "nonIncomeOther",
    "paycheckW2",
    "federalIrsPayment",
    "stateTaxRefund",
];

/// An ordered list of category labels offered to the model.
///
/// Order is kept exactly as given; a repeated label keeps its first position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Taxonomy {
    labels: Vec<String>,
}

impl Taxonomy {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !unique.contains(&label) {
                unique.push(label);
            }
        }
        Self { labels: unique }
    }

    pub fn income() -> Self {
        Self::new(SUPPORTED_INCOME_CATEGORIES.iter().copied())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// One `- label` line per entry.
    pub fn to_bullets(&self) -> String {
        self.labels
            .iter()
            .map(|label| format!("- {}", label))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Labels from `candidates` that this taxonomy does not offer.
    pub fn unrecognized<'a, I>(&self, candidates: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .filter(|candidate| !self.contains(candidate))
            .collect()
    }
}

impl From<Vec<String>> for Taxonomy {
    fn from(labels: Vec<String>) -> Self {
        Self::new(labels)
    }
}

impl From<Taxonomy> for Vec<String> {
    fn from(taxonomy: Taxonomy) -> Self {
        taxonomy.labels
    }
}
