use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{AssessmentDefinition, AssessmentError, AssessmentId, IdError, Question};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate assessment id: {0}")]
    DuplicateId(AssessmentId),

    #[error(transparent)]
    Assessment(#[from] AssessmentError),

    #[error(transparent)]
    Id(#[from] IdError),
}

/// Static set of assessments available for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Arc<AssessmentDefinition>>,
}

impl Catalog {
    /// Build a catalog, preserving the given order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` if two definitions share an id.
    pub fn new(definitions: Vec<AssessmentDefinition>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(definitions.len());
        for def in &definitions {
            if !seen.insert(def.id().clone()) {
                return Err(CatalogError::DuplicateId(def.id().clone()));
            }
        }

        Ok(Self {
            entries: definitions.into_iter().map(Arc::new).collect(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AssessmentDefinition>> {
        self.entries.iter()
    }

    #[must_use]
    pub fn get(&self, id: &AssessmentId) -> Option<Arc<AssessmentDefinition>> {
        self.entries.iter().find(|d| d.id() == id).cloned()
    }

    /// Distinct categories, in the order they first appear.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for def in &self.entries {
            if !out.iter().any(|c| c.eq_ignore_ascii_case(def.category())) {
                out.push(def.category());
            }
        }
        out
    }

    /// Definitions whose category equals `category`, ignoring case.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<Arc<AssessmentDefinition>> {
        let wanted = category.trim();
        self.entries
            .iter()
            .filter(|d| d.category().eq_ignore_ascii_case(wanted))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search over id, title, description and category.
    ///
    /// A blank query matches everything.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Arc<AssessmentDefinition>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.entries.clone();
        }

        self.entries
            .iter()
            .filter(|d| {
                [d.id().as_str(), d.title(), d.description(), d.category()]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// The career-coaching assessments shipped with the portal.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if a built-in entry fails validation.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(vec![
            behavioral_interview()?,
            product_sense()?,
            resume_fundamentals()?,
            salary_negotiation()?,
        ])
    }
}

fn question(prompt: &str, options: &[&str], correct: usize, explanation: &str) -> Result<Question, AssessmentError> {
    Question::new(
        prompt,
        options.iter().map(|o| (*o).to_owned()).collect(),
        correct,
        explanation,
    )
}

fn behavioral_interview() -> Result<AssessmentDefinition, CatalogError> {
    Ok(AssessmentDefinition::new(
        AssessmentId::new("behavioral-interview")?,
        "Behavioral Interview Basics",
        "Structuring answers about past experience.",
        "Interviewing",
        300,
        vec![
            question(
                "What does the R in the STAR method stand for?",
                &["Reflection", "Result", "Responsibility", "Reason"],
                1,
                "STAR is Situation, Task, Action, Result; close with the measurable outcome.",
            )?,
            question(
                "Which part of a STAR answer should usually take the most time?",
                &["Situation", "Task", "Action", "Result"],
                2,
                "Interviewers evaluate what you did, so the Action deserves the most detail.",
            )?,
            question(
                "Asked about a failure, the strongest answer...",
                &[
                    "Picks a minor issue that was someone else's fault",
                    "Owns a real mistake and explains what changed afterwards",
                    "Claims you have not really failed",
                ],
                1,
                "Ownership plus a concrete lesson shows self-awareness.",
            )?,
        ],
    )?)
}

fn product_sense() -> Result<AssessmentDefinition, CatalogError> {
    Ok(AssessmentDefinition::new(
        AssessmentId::new("product-sense")?,
        "Product Sense",
        "Framing product design and metrics questions.",
        "Interviewing",
        420,
        vec![
            question(
                "Before proposing features for a design prompt you should first...",
                &[
                    "Sketch the UI",
                    "Clarify the goal and the target user",
                    "Estimate the engineering cost",
                ],
                1,
                "Solutions only make sense against an agreed goal and user segment.",
            )?,
            question(
                "Which is a guardrail metric for a feed ranking change?",
                &["Time spent", "Report/hide rate", "Number of engineers", "Logo color"],
                1,
                "Guardrails catch harm the primary metric can hide.",
            )?,
            question(
                "A north star metric should be...",
                &[
                    "Easy to game",
                    "A leading indicator of delivered user value",
                    "Revenue in every case",
                ],
                1,
                "It tracks the value users get, which drives long-term outcomes.",
            )?,
            question(
                "Daily active users dropped 10% overnight. The first step is to...",
                &[
                    "Roll back the last release",
                    "Check for data or logging issues",
                    "Launch a marketing campaign",
                ],
                1,
                "Rule out instrumentation problems before diagnosing user behavior.",
            )?,
        ],
    )?)
}

fn resume_fundamentals() -> Result<AssessmentDefinition, CatalogError> {
    Ok(AssessmentDefinition::new(
        AssessmentId::new("resume-fundamentals")?,
        "Resume Fundamentals",
        "Writing bullet points that survive a six-second scan.",
        "Job Search",
        180,
        vec![
            question(
                "A strong resume bullet starts with...",
                &["A pronoun", "An action verb", "The company name"],
                1,
                "Action verbs put your contribution first.",
            )?,
            question(
                "Which bullet is most effective?",
                &[
                    "Responsible for the billing service",
                    "Cut billing latency 40% by batching ledger writes",
                    "Worked on various backend tasks",
                ],
                1,
                "Quantified impact plus the how is the most convincing.",
            )?,
        ],
    )?)
}

fn salary_negotiation() -> Result<AssessmentDefinition, CatalogError> {
    Ok(AssessmentDefinition::new(
        AssessmentId::new("salary-negotiation")?,
        "Offer Negotiation",
        "Handling compensation conversations.",
        "Job Search",
        240,
        vec![
            question(
                "When a recruiter asks for your expectations early, a good response is to...",
                &[
                    "Give your current salary",
                    "Defer until you know the role's scope and range",
                    "Name the lowest number you would accept",
                ],
                1,
                "Anchoring early with little information usually costs you.",
            )?,
            question(
                "Which is usually negotiable besides base salary?",
                &["Start date and signing bonus", "The company's stock price", "Tax rates"],
                0,
                "Signing bonus, equity, start date and title are common levers.",
            )?,
            question(
                "After receiving a verbal offer you should...",
                &[
                    "Accept on the spot",
                    "Thank them and ask for the details in writing",
                    "Decline to see if they raise it",
                ],
                1,
                "Review the written offer before negotiating or accepting.",
            )?,
        ],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str, title: &str, category: &str) -> AssessmentDefinition {
        AssessmentDefinition::new(
            AssessmentId::new(id).unwrap(),
            title,
            "",
            category,
            60,
            vec![Question::new("Q", vec!["a".into(), "b".into()], 0, "").unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::new(vec![def("a", "A", "X"), def("a", "B", "Y")]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId(AssessmentId::new("a").unwrap()));
    }

    #[test]
    fn filters_by_category_and_search() {
        let catalog = Catalog::new(vec![
            def("stars", "STAR answers", "Interviewing"),
            def("offers", "Offer basics", "Job Search"),
            def("metrics", "Metric design", "interviewing"),
        ])
        .unwrap();

        assert_eq!(catalog.categories(), vec!["Interviewing", "Job Search"]);

        let ids: Vec<_> = catalog
            .by_category("INTERVIEWING")
            .iter()
            .map(|d| d.id().to_string())
            .collect();
        assert_eq!(ids, vec!["stars", "metrics"]);

        let hits = catalog.search("offer");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id().as_str(), "offers");

        assert_eq!(catalog.search("  ").len(), 3);
        assert!(catalog.search("nothing-matches").is_empty());
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 4);
        let id = AssessmentId::new("product-sense").unwrap();
        let def = catalog.get(&id).unwrap();
        assert_eq!(def.question_count(), 4);
        assert!(catalog.get(&AssessmentId::new("missing").unwrap()).is_none());
    }
}
