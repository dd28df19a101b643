use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::ValidationError;

/// Placeholder marking the gap in a fill-in-blank question.
pub const BLANK: &str = "_____";

const FALLBACK_DISTRACTORS: [&str; 3] = ["incorrect", "random", "word"];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MultipleChoiceTask {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrueFalseTask {
    pub question: String,
    pub answer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FillInBlankTask {
    pub question: String,
    pub correct_answer: String,
    /// Word bank offered to the user. May be empty in older payloads.
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DefinitionPair {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MatchDefinitionTask {
    pub pairs: Vec<DefinitionPair>,
}

/// A single validated quiz question.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    MultipleChoice(MultipleChoiceTask),
    TrueFalse(TrueFalseTask),
    FillInBlank(FillInBlankTask),
    MatchDefinition(MatchDefinitionTask),
}

/// Wire shape as produced by the generator, before validation.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawTask {
    MultipleChoice(MultipleChoiceTask),
    TrueFalse(TrueFalseTask),
    FillInBlank(FillInBlankTask),
    MatchDefinition {
        #[serde(default)]
        pairs: Vec<DefinitionPair>,
        // Older payloads carry a single pair inline.
        #[serde(default)]
        term: Option<String>,
        #[serde(default)]
        definition: Option<String>,
    },
}

impl MultipleChoiceTask {
    pub fn is_correct(&self, choice: &str) -> bool {
        choice == self.correct_answer
    }
}

impl TrueFalseTask {
    pub fn is_correct(&self, choice: bool) -> bool {
        choice == self.answer
    }
}

impl FillInBlankTask {
    /// Case-insensitive comparison against the expected word.
    pub fn is_correct(&self, word: &str) -> bool {
        word.trim().to_lowercase() == self.correct_answer.trim().to_lowercase()
    }

    /// Text before and after the blank. Questions without a blank put everything first.
    pub fn split_question(&self) -> (&str, &str) {
        self.question
            .split_once(BLANK)
            .unwrap_or((self.question.as_str(), ""))
    }

    /// Shuffled word bank; pads with stock distractors when the payload had none.
    pub fn word_bank<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<String> {
        let mut words: Vec<String> = if self.options.is_empty() {
            std::iter::once(self.correct_answer.clone())
                .chain(FALLBACK_DISTRACTORS.iter().map(|word| word.to_string()))
                .collect()
        } else {
            self.options.clone()
        };

        words.shuffle(rng);
        words
    }
}

impl MatchDefinitionTask {
    pub fn is_pair(&self, term: &str, definition: &str) -> bool {
        self.pairs
            .iter()
            .any(|pair| pair.term == term && pair.definition == definition)
    }
}

impl Task {
    pub fn question(&self) -> &str {
        match self {
            Self::MultipleChoice(task) => &task.question,
            Self::TrueFalse(task) => &task.question,
            Self::FillInBlank(task) => &task.question,
            Self::MatchDefinition(_) => "Match each term with its definition.",
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::MultipleChoice(_) => "Multiple Choice",
            Self::TrueFalse(_) => "True or False",
            Self::FillInBlank(_) => "Fill in the Blank",
            Self::MatchDefinition(_) => "Match Definition",
        }
    }
}

fn require_text(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is empty", field))
    } else {
        Ok(())
    }
}

impl RawTask {
    fn into_task(self) -> Result<Task, String> {
        match self {
            RawTask::MultipleChoice(task) => {
                require_text(&task.question, "question")?;
                if task.options.len() < 2 {
                    return Err(format!(
                        "needs at least 2 options but has {}",
                        task.options.len()
                    ));
                }
                if !task.options.contains(&task.correct_answer) {
                    return Err("correct_answer is not one of the options".to_string());
                }
                Ok(Task::MultipleChoice(task))
            }
            RawTask::TrueFalse(task) => {
                require_text(&task.question, "question")?;
                Ok(Task::TrueFalse(task))
            }
            RawTask::FillInBlank(task) => {
                require_text(&task.question, "question")?;
                require_text(&task.correct_answer, "correct_answer")?;
                if !task.options.is_empty()
                    && !task.options.iter().any(|option| task.is_correct(option))
                {
                    return Err("correct_answer is not in the word bank".to_string());
                }
                Ok(Task::FillInBlank(task))
            }
            RawTask::MatchDefinition {
                mut pairs,
                term,
                definition,
            } => {
                if let (Some(term), Some(definition)) = (term, definition) {
                    pairs.push(DefinitionPair { term, definition });
                }
                if pairs.is_empty() {
                    return Err("has no term/definition pairs".to_string());
                }

                let mut terms = HashSet::new();
                for pair in &pairs {
                    require_text(&pair.term, "term")?;
                    require_text(&pair.definition, "definition")?;
                    if !terms.insert(pair.term.as_str()) {
                        return Err(format!("term `{}` appears twice", pair.term));
                    }
                }
                Ok(Task::MatchDefinition(MatchDefinitionTask { pairs }))
            }
        }
    }
}

/// Removes markdown code fences that generators like to wrap JSON in.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Decodes and validates a generated task batch.
///
/// Accepts `{"tasks": [...]}` or a bare array, optionally inside code fences. A single
/// invalid task rejects the whole batch.
///
/// # Errors
/// * [`ValidationError::Malformed`] when the text is not JSON of either shape.
/// * [`ValidationError::EmptyBatch`] when there are no tasks.
/// * [`ValidationError::InvalidTask`] naming the first task that fails validation.
pub fn decode_task_batch(text: &str) -> Result<Vec<Task>, ValidationError> {
    let result = decode_inner(text);
    if let Err(error) = &result {
        log::warn!("discarding generated task batch: {}", error);
    }
    result
}

fn decode_inner(text: &str) -> Result<Vec<Task>, ValidationError> {
    let cleaned = strip_code_fences(text);
    let value: serde_json::Value =
        serde_json::from_str(&cleaned).map_err(|error| ValidationError::Malformed {
            message: error.to_string(),
        })?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut object) => match object.remove("tasks") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(ValidationError::Malformed {
                    message: "expected a `tasks` array".to_string(),
                });
            }
        },
        _ => {
            return Err(ValidationError::Malformed {
                message: "expected an object or array".to_string(),
            });
        }
    };

    if items.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<RawTask>(item)
                .map_err(|error| error.to_string())
                .and_then(RawTask::into_task)
                .map_err(|reason| ValidationError::InvalidTask { index, reason })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const BATCH: &str = r#"```json
{
  "tasks": [
    {
      "type": "multiple_choice",
      "question": "Which response shows empathy?",
      "options": ["Cheer up!", "That sounds really hard.", "Others have it worse."],
      "correct_answer": "That sounds really hard."
    },
    { "type": "true_false", "question": "Asking about suicide plants the idea.", "answer": false },
    {
      "type": "fill_in_blank",
      "question": "Listening without _____ builds trust.",
      "correct_answer": "judgment",
      "options": ["judgment", "pausing", "nodding"]
    },
    {
      "type": "match_definition",
      "pairs": [
        { "term": "Validation", "definition": "Acknowledging feelings as understandable" },
        { "term": "Reflection", "definition": "Restating what you heard" }
      ]
    }
  ]
}
```"#;

    #[test]
    fn decodes_fenced_batch() {
        let tasks = decode_task_batch(BATCH).expect("batch should decode");

        assert_eq!(tasks.len(), 4);
        assert!(matches!(tasks[0], Task::MultipleChoice(_)));
        assert_eq!(
            tasks[1],
            Task::TrueFalse(TrueFalseTask {
                question: "Asking about suicide plants the idea.".to_string(),
                answer: false,
            })
        );
        assert_eq!(tasks[2].kind_label(), "Fill in the Blank");
        match &tasks[3] {
            Task::MatchDefinition(task) => assert_eq!(task.pairs.len(), 2),
            other => panic!("expected match definition, got {:?}", other),
        }
    }

    #[test]
    fn accepts_bare_array_and_legacy_single_pair() {
        let tasks = decode_task_batch(
            r#"[{"type": "match_definition", "term": "Burden", "definition": "Feeling like a weight on others"}]"#,
        )
        .expect("legacy pair should decode");

        assert_eq!(
            tasks,
            vec![Task::MatchDefinition(MatchDefinitionTask {
                pairs: vec![DefinitionPair {
                    term: "Burden".to_string(),
                    definition: "Feeling like a weight on others".to_string(),
                }],
            })]
        );
    }

    #[test]
    fn rejects_non_json() {
        let error = decode_task_batch("Sure! Here are your tasks.").expect_err("not json");
        assert!(matches!(error, ValidationError::Malformed { .. }));
    }

    #[test]
    fn rejects_empty_batch() {
        assert_eq!(
            decode_task_batch(r#"{"tasks": []}"#),
            Err(ValidationError::EmptyBatch)
        );
    }

    #[test]
    fn rejects_unknown_task_type() {
        let error = decode_task_batch(r#"{"tasks": [{"type": "essay", "question": "Why?"}]}"#)
            .expect_err("unknown type");
        assert!(matches!(error, ValidationError::InvalidTask { index: 0, .. }));
    }

    #[test]
    fn rejects_answer_missing_from_options() {
        let error = decode_task_batch(
            r#"{"tasks": [
                {"type": "true_false", "question": "Fine?", "answer": true},
                {"type": "multiple_choice", "question": "Pick", "options": ["a", "b"], "correct_answer": "c"}
            ]}"#,
        )
        .expect_err("answer not offered");

        assert_eq!(
            error,
            ValidationError::InvalidTask {
                index: 1,
                reason: "correct_answer is not one of the options".to_string(),
            }
        );
    }

    #[test]
    fn rejects_string_booleans() {
        let error = decode_task_batch(
            r#"{"tasks": [{"type": "true_false", "question": "Fine?", "answer": "true"}]}"#,
        )
        .expect_err("string boolean");
        assert!(matches!(error, ValidationError::InvalidTask { index: 0, .. }));
    }

    #[test]
    fn rejects_duplicate_terms() {
        let error = decode_task_batch(
            r#"{"tasks": [{"type": "match_definition", "pairs": [
                {"term": "A", "definition": "one"},
                {"term": "A", "definition": "two"}
            ]}]}"#,
        )
        .expect_err("duplicate term");
        assert!(matches!(error, ValidationError::InvalidTask { index: 0, .. }));
    }

    #[test]
    fn fill_in_blank_ignores_case() {
        let task = FillInBlankTask {
            question: "Stay _____ with them.".to_string(),
            correct_answer: "Present".to_string(),
            options: Vec::new(),
        };

        assert!(task.is_correct("present"));
        assert!(task.is_correct(" PRESENT "));
        assert!(!task.is_correct("absent"));
        assert_eq!(task.split_question(), ("Stay ", " with them."));
    }

    #[test]
    fn word_bank_falls_back_to_stock_distractors() {
        let task = FillInBlankTask {
            question: "Stay _____ with them.".to_string(),
            correct_answer: "present".to_string(),
            options: Vec::new(),
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(4);

        let mut bank = task.word_bank(&mut rng);
        bank.sort();
        assert_eq!(bank, vec!["incorrect", "present", "random", "word"]);
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("  {} "), "{}");
    }

    #[test]
    fn serializes_with_type_tag() {
        let task = Task::TrueFalse(TrueFalseTask {
            question: "Q".to_string(),
            answer: true,
        });
        let json = serde_json::to_value(&task).expect("task should serialize");

        assert_eq!(json["type"], "true_false");
        assert_eq!(json["answer"], true);
    }
}
