//! Job-title classification.
//!
//! Rules are checked in order and the first rule with a keyword contained in the
//! lower-cased title wins. Matching is a literal substring test, not a word match, so
//! the short keyword `ci` also fires inside words such as "specialist" or "precision".
//! Those titles land in OPEX/CI; this is the established behavior of the splitter.

use crate::schema::Category;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new<I, S>(category: Category, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            category,
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    fn matches(&self, lowered_title: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowered_title.contains(keyword.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<KeywordRule>,
    fallback: Category,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            vec![
                KeywordRule::new(
                    Category::Pm,
                    ["plant manager", "factory manager", "site manager"],
                ),
                KeywordRule::new(
                    Category::OpexCi,
                    [
                        "opex",
                        "ci",
                        "operational excellence",
                        "continuous improvement",
                        "excellence",
                    ],
                ),
            ],
            Category::Ops,
        )
    }
}

impl Classifier {
    pub fn new(rules: Vec<KeywordRule>, fallback: Category) -> Self {
        Self { rules, fallback }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn classify(&self, title: &str) -> Category {
        let lowered = title.to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.category)
            .unwrap_or(self.fallback)
    }

    /// Classifies any displayable value by its textual form.
    pub fn classify_value<T: ToString + ?Sized>(&self, value: &T) -> Category {
        self.classify(&value.to_string())
    }
}

/// Classifies with the default rule set.
pub fn classify(title: &str) -> Category {
    Classifier::default().classify(title)
}
