use crate::task::{
    DefinitionPair, FillInBlankTask, MatchDefinitionTask, MultipleChoiceTask, Task, TrueFalseTask,
};

#[cfg(test)]
use crate::{Answer, Column, TaskRunner, TaskSession};
#[cfg(test)]
use rand::SeedableRng;

/// Starting colors of the two swatches on the mixing screen.
pub const DEMO_SWATCHES: [&str; 2] = ["#ff6b6b", "#4d96ff"];

/// Offline task batch used when no generator is configured.
pub fn demo_tasks() -> Vec<Task> {
    vec![
        Task::MultipleChoice(MultipleChoiceTask {
            question: "A friend says \"I feel like a burden to everyone.\" Which reply keeps them talking?"
                .to_string(),
            options: vec![
                "Don't say that, everyone loves you.".to_string(),
                "That sounds heavy. What makes you feel that way?".to_string(),
                "You should get some sleep.".to_string(),
                "I'm sure it will pass.".to_string(),
            ],
            correct_answer: "That sounds heavy. What makes you feel that way?".to_string(),
        }),
        Task::TrueFalse(TrueFalseTask {
            question: "Asking someone directly about suicide puts the idea in their head."
                .to_string(),
            answer: false,
        }),
        Task::FillInBlank(FillInBlankTask {
            question: "Listening without _____ helps a person feel safe to share.".to_string(),
            correct_answer: "judgment".to_string(),
            options: vec![
                "judgment".to_string(),
                "pausing".to_string(),
                "eye contact".to_string(),
                "questions".to_string(),
            ],
        }),
        Task::MatchDefinition(MatchDefinitionTask {
            pairs: vec![
                DefinitionPair {
                    term: "Validation".to_string(),
                    definition: "Acknowledging that a feeling makes sense".to_string(),
                },
                DefinitionPair {
                    term: "Reflection".to_string(),
                    definition: "Repeating back what you heard in your own words".to_string(),
                },
                DefinitionPair {
                    term: "Safety plan".to_string(),
                    definition: "A written list of coping steps and contacts for a crisis"
                        .to_string(),
                },
            ],
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn solve(runner: &mut TaskRunner) -> bool {
        match runner.task().clone() {
            Task::MultipleChoice(task) => runner
                .submit(Answer::Choice(task.correct_answer))
                .map(|evaluation| evaluation.completion.is_some())
                .unwrap_or(false),
            Task::TrueFalse(task) => runner
                .submit(Answer::Bool(task.answer))
                .map(|evaluation| evaluation.completion.is_some())
                .unwrap_or(false),
            Task::FillInBlank(task) => runner
                .submit(Answer::Word(task.correct_answer))
                .map(|evaluation| evaluation.completion.is_some())
                .unwrap_or(false),
            Task::MatchDefinition(task) => {
                let board = runner.board().cloned().expect("matching task has a board");
                let mut done = false;
                for pair in &task.pairs {
                    let term = board
                        .cards(Column::Terms)
                        .iter()
                        .position(|card| card.text == pair.term)
                        .expect("term is on the board");
                    let definition = board
                        .cards(Column::Definitions)
                        .iter()
                        .position(|card| card.text == pair.definition)
                        .expect("definition is on the board");
                    runner.pick(Column::Terms, term).expect("term pick");
                    done = matches!(
                        runner.pick(Column::Definitions, definition),
                        Ok(crate::PickOutcome::Matched {
                            completion: Some(_)
                        })
                    );
                }
                done
            }
        }
    }

    #[test]
    fn demo_batch_covers_every_task_kind() {
        let labels: Vec<&str> = demo_tasks().iter().map(Task::kind_label).collect();
        assert_eq!(
            labels,
            vec![
                "Multiple Choice",
                "True or False",
                "Fill in the Blank",
                "Match Definition"
            ]
        );
    }

    #[test]
    fn demo_batch_survives_validation() {
        let json = serde_json::json!({ "tasks": demo_tasks() }).to_string();
        let decoded = crate::decode_task_batch(&json).expect("demo tasks should validate");
        assert_eq!(decoded, demo_tasks());
    }

    #[test]
    fn demo_session_can_be_completed_perfectly() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut session = TaskSession::new(demo_tasks());

        while let Some(mut runner) = session.active_runner(&mut rng) {
            let solved = solve(&mut runner);
            assert!(solved, "task should complete: {:?}", runner.task());
            session.advance(solved).expect("session should advance");
        }

        assert!(session.state().completed);
        assert_eq!(session.progress_percent(), 100);
    }
}
