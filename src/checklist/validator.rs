use std::collections::{BTreeMap, BTreeSet};

use super::{ChecklistItem, ItemStatus, QuestionCatalog};
use crate::error::{EngineError, MissingItem};

/// Default questions whose observation is mandatory.
pub const DEFAULT_MANDATORY_OBSERVATIONS: [usize; 6] = [3, 4, 5, 6, 7, 8];

/// Raw answers as entered by the inspector, keyed by 1-based question index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecklistAnswers {
    pub statuses: BTreeMap<usize, String>,
    pub observations: BTreeMap<usize, String>,
}

impl ChecklistAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, index: usize, symbol: &str) -> Self {
        self.statuses.insert(index, symbol.to_string());
        self
    }

    pub fn observation(mut self, index: usize, text: &str) -> Self {
        self.observations.insert(index, text.to_string());
        self
    }
}

/// Checks answers against the catalog and maps them to checklist items.
#[derive(Debug, Clone)]
pub struct ChecklistValidator {
    catalog: QuestionCatalog,
    mandatory: BTreeSet<usize>,
}

impl Default for ChecklistValidator {
    fn default() -> Self {
        Self::new(QuestionCatalog::mola(), DEFAULT_MANDATORY_OBSERVATIONS)
    }
}

impl ChecklistValidator {
    /// Mandatory indices outside the catalog are dropped.
    pub fn new(catalog: QuestionCatalog, mandatory: impl IntoIterator<Item = usize>) -> Self {
        let mandatory = mandatory
            .into_iter()
            .filter(|i| catalog.get(*i).is_some())
            .collect();
        Self { catalog, mandatory }
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn is_mandatory(&self, index: usize) -> bool {
        self.mandatory.contains(&index)
    }

    /// Items in catalog order, or the first failing rule.
    ///
    /// Unanswered questions win over missing observations; when both are
    /// missing, the `Incomplete` error carries both lists. Answers for indices
    /// outside the catalog are ignored.
    pub fn validate(&self, answers: &ChecklistAnswers) -> Result<Vec<ChecklistItem>, EngineError> {
        let mut missing = Vec::new();
        let mut missing_observations = Vec::new();

        for q in self.catalog.questions() {
            let answered = answers
                .statuses
                .get(&q.index)
                .is_some_and(|s| !s.trim().is_empty());
            if !answered {
                missing.push(MissingItem {
                    index: q.index,
                    key: q.key,
                });
            }
            if self.is_mandatory(q.index) && observation(answers, q.index).is_none() {
                missing_observations.push(MissingItem {
                    index: q.index,
                    key: q.key,
                });
            }
        }

        if !missing.is_empty() {
            return Err(EngineError::Incomplete {
                missing,
                missing_observations,
            });
        }
        if !missing_observations.is_empty() {
            return Err(EngineError::MissingObservation {
                missing: missing_observations,
            });
        }

        Ok(self
            .catalog
            .questions()
            .iter()
            .map(|q| ChecklistItem {
                key: q.key,
                status: answers
                    .statuses
                    .get(&q.index)
                    .map(|s| ItemStatus::from_symbol(s))
                    .unwrap_or(ItemStatus::Indefinido),
                observation: observation(answers, q.index),
            })
            .collect())
    }
}

fn observation(answers: &ChecklistAnswers, index: usize) -> Option<String> {
    answers
        .observations
        .get(&index)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::ItemKey;

    /// Every question answered with `symbol`, mandatory observations filled.
    fn complete_answers(validator: &ChecklistValidator, symbol: &str) -> ChecklistAnswers {
        let mut answers = ChecklistAnswers::new();
        for q in validator.catalog().questions() {
            answers = answers.status(q.index, symbol);
            if validator.is_mandatory(q.index) {
                answers = answers.observation(q.index, "120mm");
            }
        }
        answers
    }

    #[test]
    fn complete_answers_validate() {
        let v = ChecklistValidator::default();
        let items = v.validate(&complete_answers(&v, "✅")).unwrap();
        assert_eq!(items.len(), 11);
        assert!(items.iter().all(|i| i.status == ItemStatus::Conforme));
        assert_eq!(items[2].key, ItemKey::CorDaViga);
        assert_eq!(items[2].observation.as_deref(), Some("120mm"));
        assert_eq!(items[0].observation, None);
    }

    #[test]
    fn ten_question_catalog_maps_every_symbol() {
        let catalog = QuestionCatalog::from_items(
            &QuestionCatalog::mola().questions()[..10]
                .iter()
                .map(|q| (q.key, q.text))
                .collect::<Vec<_>>(),
        );
        let v = ChecklistValidator::new(catalog, DEFAULT_MANDATORY_OBSERVATIONS);
        let answers = complete_answers(&v, "✅")
            .status(1, "❌")
            .status(2, "🟡")
            .status(9, "??");
        let items = v.validate(&answers).unwrap();
        assert_eq!(items.len(), 10);
        assert_eq!(items[0].status, ItemStatus::NaoConforme);
        assert_eq!(items[1].status, ItemStatus::NaoAplicavel);
        assert_eq!(items[2].status, ItemStatus::Conforme);
        assert_eq!(items[8].status, ItemStatus::Indefinido);
    }

    #[test]
    fn missing_status_names_the_index() {
        let v = ChecklistValidator::default();
        let mut answers = complete_answers(&v, "✅");
        answers.statuses.remove(&5);
        match v.validate(&answers).unwrap_err() {
            EngineError::Incomplete {
                missing,
                missing_observations,
            } => {
                assert_eq!(
                    missing,
                    vec![MissingItem {
                        index: 5,
                        key: ItemKey::FeixeDeMola
                    }]
                );
                assert!(missing_observations.is_empty());
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn blank_status_counts_as_missing() {
        let v = ChecklistValidator::default();
        let answers = complete_answers(&v, "✅").status(2, " ");
        assert!(matches!(
            v.validate(&answers),
            Err(EngineError::Incomplete { ref missing, .. }) if missing[0].index == 2
        ));
    }

    #[test]
    fn missing_observation_names_indices() {
        let v = ChecklistValidator::default();
        let answers = complete_answers(&v, "✅")
            .observation(4, "   ")
            .observation(8, "");
        match v.validate(&answers).unwrap_err() {
            EngineError::MissingObservation { missing } => {
                let indices: Vec<usize> = missing.iter().map(|m| m.index).collect();
                assert_eq!(indices, vec![4, 8]);
            }
            other => panic!("expected MissingObservation, got {other:?}"),
        }
    }

    #[test]
    fn both_kinds_missing_are_reported_together() {
        let v = ChecklistValidator::default();
        let answers = ChecklistAnswers::new().status(1, "✅");
        match v.validate(&answers).unwrap_err() {
            EngineError::Incomplete {
                missing,
                missing_observations,
            } => {
                assert_eq!(missing.len(), 10);
                assert_eq!(missing_observations.len(), 6);
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn observations_on_optional_questions_are_kept() {
        let v = ChecklistValidator::default();
        let answers = complete_answers(&v, "✅").observation(1, " etiqueta borrada ");
        let items = v.validate(&answers).unwrap();
        assert_eq!(items[0].observation.as_deref(), Some("etiqueta borrada"));
    }

    #[test]
    fn mandatory_indices_outside_catalog_are_dropped() {
        let v = ChecklistValidator::new(QuestionCatalog::mola(), [3, 42]);
        assert!(v.is_mandatory(3));
        assert!(!v.is_mandatory(42));
    }
}
