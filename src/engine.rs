use rand::Rng;
use rand::seq::SliceRandom;

use crate::task::{MatchDefinitionTask, Task};

/// Where a single task instance is in its answer flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Unanswered,
    /// An answer (or the first half of a pair) is chosen but not yet judged.
    Selected,
    /// Terminal. The completion signal has fired.
    Correct,
    /// Transient. The next user action or [`TaskRunner::reset`] returns to `Unanswered`.
    Incorrect,
    /// Terminal after too many failed attempts. The completion signal fired with `false`.
    Locked,
}

/// A user's answer to a single-question task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// One of the multiple choice options, verbatim.
    Choice(String),
    Bool(bool),
    /// A word placed into a fill-in-blank gap.
    Word(String),
}

/// Column of a match-definition board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Terms,
    Definitions,
}

/// Emitted exactly once per task instance, when it reaches a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskCompletion {
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub state: TaskState,
    pub completion: Option<TaskCompletion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    /// First half of a pair chosen, waiting for the other column.
    Pending,
    Matched { completion: Option<TaskCompletion> },
    /// Both cards flash an error until the next pick or a reset.
    Mismatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Default,
    Picked,
    Matched,
    Error,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("task is already finished")]
    TaskFinished,
    #[error("an answer is already selected; evaluate it first")]
    AlreadySelected,
    #[error("no answer has been selected")]
    NothingSelected,
    #[error("{task} tasks do not accept this kind of answer")]
    AnswerMismatch { task: &'static str },
    #[error("`{choice}` is not one of the options")]
    UnknownOption { choice: String },
    #[error("card {index} does not exist in the {column:?} column")]
    CardOutOfRange { column: Column, index: usize },
    #[error("card {index} in the {column:?} column is already matched")]
    CardAlreadyMatched { column: Column, index: usize },
    #[error("session has no remaining tasks")]
    SessionFinished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCard {
    pub text: String,
    pair: usize,
    pub matched: bool,
}

/// Two shuffled columns of terms and definitions that the user pairs up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchBoard {
    terms: Vec<MatchCard>,
    definitions: Vec<MatchCard>,
    pending: Option<(Column, usize)>,
    /// `(term index, definition index)` of the last wrong pair.
    mismatch: Option<(usize, usize)>,
    matched_pairs: usize,
    failed_attempts: u32,
}

impl MatchBoard {
    pub fn new<R: Rng + ?Sized>(task: &MatchDefinitionTask, rng: &mut R) -> Self {
        let mut terms: Vec<MatchCard> = task
            .pairs
            .iter()
            .enumerate()
            .map(|(pair, entry)| MatchCard {
                text: entry.term.clone(),
                pair,
                matched: false,
            })
            .collect();
        let mut definitions: Vec<MatchCard> = task
            .pairs
            .iter()
            .enumerate()
            .map(|(pair, entry)| MatchCard {
                text: entry.definition.clone(),
                pair,
                matched: false,
            })
            .collect();

        terms.shuffle(rng);
        definitions.shuffle(rng);

        Self {
            terms,
            definitions,
            pending: None,
            mismatch: None,
            matched_pairs: 0,
            failed_attempts: 0,
        }
    }

    pub fn cards(&self, column: Column) -> &[MatchCard] {
        match column {
            Column::Terms => &self.terms,
            Column::Definitions => &self.definitions,
        }
    }

    pub fn pair_count(&self) -> usize {
        self.terms.len()
    }

    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// An empty board is never complete; the runner has to be forfeited.
    pub fn is_complete(&self) -> bool {
        self.pair_count() > 0 && self.matched_pairs == self.pair_count()
    }

    pub fn has_mismatch(&self) -> bool {
        self.mismatch.is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn card_state(&self, column: Column, index: usize) -> CardState {
        let Some(card) = self.cards(column).get(index) else {
            return CardState::Default;
        };

        if card.matched {
            return CardState::Matched;
        }

        if let Some((term, definition)) = self.mismatch {
            let flagged = match column {
                Column::Terms => term,
                Column::Definitions => definition,
            };
            if flagged == index {
                return CardState::Error;
            }
        }

        if self.pending == Some((column, index)) {
            CardState::Picked
        } else {
            CardState::Default
        }
    }

    /// Drops the error flash so both cards return to default.
    pub fn clear_mismatch(&mut self) {
        self.mismatch = None;
    }

    /// Picks a card. A pick in the same column as the pending one replaces it; a pick in the
    /// other column is judged as a pair.
    ///
    /// # Errors
    /// * [`EngineError::TaskFinished`] once every pair is matched.
    /// * [`EngineError::CardOutOfRange`] for an index past the end of the column.
    /// * [`EngineError::CardAlreadyMatched`] for a card that is already paired.
    pub fn pick(&mut self, column: Column, index: usize) -> Result<PickOutcome, EngineError> {
        if self.is_complete() {
            return Err(EngineError::TaskFinished);
        }

        let card = self
            .cards(column)
            .get(index)
            .ok_or(EngineError::CardOutOfRange { column, index })?;
        if card.matched {
            return Err(EngineError::CardAlreadyMatched { column, index });
        }

        self.mismatch = None;

        let (term, definition) = match self.pending {
            Some((pending_column, pending_index)) if pending_column != column => {
                self.pending = None;
                match column {
                    Column::Terms => (index, pending_index),
                    Column::Definitions => (pending_index, index),
                }
            }
            _ => {
                self.pending = Some((column, index));
                return Ok(PickOutcome::Pending);
            }
        };

        if self.terms[term].pair == self.definitions[definition].pair {
            self.terms[term].matched = true;
            self.definitions[definition].matched = true;
            self.matched_pairs += 1;
            Ok(PickOutcome::Matched { completion: None })
        } else {
            self.mismatch = Some((term, definition));
            self.failed_attempts += 1;
            Ok(PickOutcome::Mismatched)
        }
    }

    fn state(&self) -> TaskState {
        if self.is_complete() {
            TaskState::Correct
        } else if self.mismatch.is_some() {
            TaskState::Incorrect
        } else if self.pending.is_some() {
            TaskState::Selected
        } else {
            TaskState::Unanswered
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Flow {
    Single {
        state: TaskState,
        selected: Option<Answer>,
        failed_attempts: u32,
    },
    Matching(MatchBoard),
}

/// Drives one task instance from first input to its completion signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRunner {
    task: Task,
    flow: Flow,
    /// Word bank or option list in display order.
    options: Vec<String>,
    attempt_limit: Option<u32>,
    locked: bool,
    completion_sent: bool,
}

impl TaskRunner {
    pub fn new<R: Rng + ?Sized>(task: Task, rng: &mut R) -> Self {
        let (flow, options) = match &task {
            Task::MatchDefinition(definition) => {
                (Flow::Matching(MatchBoard::new(definition, rng)), Vec::new())
            }
            other => {
                let options = match other {
                    Task::MultipleChoice(choice) => choice.options.clone(),
                    Task::FillInBlank(blank) => blank.word_bank(rng),
                    Task::TrueFalse(_) => vec!["True".to_string(), "False".to_string()],
                    Task::MatchDefinition(_) => Vec::new(),
                };
                let flow = Flow::Single {
                    state: TaskState::Unanswered,
                    selected: None,
                    failed_attempts: 0,
                };
                (flow, options)
            }
        };

        Self {
            task,
            flow,
            options,
            attempt_limit: None,
            locked: false,
            completion_sent: false,
        }
    }

    /// Locks a single-answer task, reporting it as incorrect, after `limit` failed attempts.
    ///
    /// Match boards ignore the limit: they finish only once every pair is matched, however
    /// many wrong pairs came first. Use [`TaskRunner::forfeit`] to give one up.
    pub fn with_attempt_limit(mut self, limit: u32) -> Self {
        self.attempt_limit = Some(limit.max(1));
        self
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn board(&self) -> Option<&MatchBoard> {
        match &self.flow {
            Flow::Matching(board) => Some(board),
            Flow::Single { .. } => None,
        }
    }

    pub fn selected(&self) -> Option<&Answer> {
        match &self.flow {
            Flow::Single { selected, .. } => selected.as_ref(),
            Flow::Matching(_) => None,
        }
    }

    pub fn state(&self) -> TaskState {
        if self.locked {
            return TaskState::Locked;
        }

        match &self.flow {
            Flow::Single { state, .. } => *state,
            Flow::Matching(board) => board.state(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state(), TaskState::Correct | TaskState::Locked)
    }

    pub fn failed_attempts(&self) -> u32 {
        match &self.flow {
            Flow::Single {
                failed_attempts, ..
            } => *failed_attempts,
            Flow::Matching(board) => board.failed_attempts(),
        }
    }

    fn check_answer(&self, answer: &Answer) -> Result<(), EngineError> {
        match (&self.task, answer) {
            (Task::MultipleChoice(task), Answer::Choice(choice)) => {
                if task.options.contains(choice) {
                    Ok(())
                } else {
                    Err(EngineError::UnknownOption {
                        choice: choice.clone(),
                    })
                }
            }
            (Task::TrueFalse(_), Answer::Bool(_)) => Ok(()),
            (Task::FillInBlank(_), Answer::Word(_)) => Ok(()),
            (task, _) => Err(EngineError::AnswerMismatch {
                task: task.kind_label(),
            }),
        }
    }

    fn is_correct(&self, answer: &Answer) -> bool {
        match (&self.task, answer) {
            (Task::MultipleChoice(task), Answer::Choice(choice)) => task.is_correct(choice),
            (Task::TrueFalse(task), Answer::Bool(choice)) => task.is_correct(*choice),
            (Task::FillInBlank(task), Answer::Word(word)) => task.is_correct(word),
            _ => false,
        }
    }

    /// Chooses an answer. Selecting after a wrong answer starts a new attempt.
    ///
    /// # Errors
    /// * [`EngineError::TaskFinished`] after the task is correct or locked.
    /// * [`EngineError::AlreadySelected`] if the previous selection was not evaluated.
    /// * [`EngineError::AnswerMismatch`] / [`EngineError::UnknownOption`] for answers the task
    ///   cannot accept.
    pub fn select(&mut self, answer: Answer) -> Result<TaskState, EngineError> {
        if self.is_finished() {
            return Err(EngineError::TaskFinished);
        }
        self.check_answer(&answer)?;

        match &mut self.flow {
            Flow::Single {
                state, selected, ..
            } => {
                if *state == TaskState::Selected {
                    return Err(EngineError::AlreadySelected);
                }
                *selected = Some(answer);
                *state = TaskState::Selected;
                Ok(TaskState::Selected)
            }
            Flow::Matching(_) => Err(EngineError::AnswerMismatch {
                task: self.task.kind_label(),
            }),
        }
    }

    /// Judges the current selection.
    ///
    /// # Errors
    /// * [`EngineError::TaskFinished`] after the task is correct or locked.
    /// * [`EngineError::NothingSelected`] when no answer is waiting to be judged.
    pub fn evaluate(&mut self) -> Result<Evaluation, EngineError> {
        if self.is_finished() {
            return Err(EngineError::TaskFinished);
        }

        let answer = match &self.flow {
            Flow::Single {
                state: TaskState::Selected,
                selected: Some(answer),
                ..
            } => answer.clone(),
            Flow::Single { .. } => return Err(EngineError::NothingSelected),
            Flow::Matching(_) => {
                return Err(EngineError::AnswerMismatch {
                    task: self.task.kind_label(),
                });
            }
        };

        let correct = self.is_correct(&answer);
        let limit = self.attempt_limit;
        let mut lock = false;

        if let Flow::Single {
            state,
            failed_attempts,
            ..
        } = &mut self.flow
        {
            if correct {
                *state = TaskState::Correct;
            } else {
                *state = TaskState::Incorrect;
                *failed_attempts += 1;
                lock = limit.is_some_and(|limit| *failed_attempts >= limit);
            }
        }

        if lock {
            self.locked = true;
        }

        let completion = if correct || lock {
            self.complete(correct)
        } else {
            None
        };

        Ok(Evaluation {
            state: self.state(),
            completion,
        })
    }

    /// Selects and evaluates in one step.
    pub fn submit(&mut self, answer: Answer) -> Result<Evaluation, EngineError> {
        self.select(answer)?;
        self.evaluate()
    }

    /// Picks a card on a match-definition board.
    ///
    /// # Errors
    /// Same as [`MatchBoard::pick`], plus [`EngineError::AnswerMismatch`] for other task kinds
    /// and [`EngineError::TaskFinished`] once locked.
    pub fn pick(&mut self, column: Column, index: usize) -> Result<PickOutcome, EngineError> {
        if self.is_finished() {
            return Err(EngineError::TaskFinished);
        }

        let (outcome, complete) = match &mut self.flow {
            Flow::Matching(board) => {
                let outcome = board.pick(column, index)?;
                (outcome, board.is_complete())
            }
            Flow::Single { .. } => {
                return Err(EngineError::AnswerMismatch {
                    task: self.task.kind_label(),
                });
            }
        };

        match outcome {
            PickOutcome::Matched { .. } if complete => Ok(PickOutcome::Matched {
                completion: self.complete(true),
            }),
            other => Ok(other),
        }
    }

    /// Returns a wrong answer to `Unanswered`. Has no effect in other states.
    pub fn reset(&mut self) {
        if self.is_finished() {
            return;
        }

        match &mut self.flow {
            Flow::Single {
                state, selected, ..
            } => {
                if *state == TaskState::Incorrect {
                    *state = TaskState::Unanswered;
                    *selected = None;
                }
            }
            Flow::Matching(board) => board.clear_mismatch(),
        }
    }

    /// Abandons the task, reporting it as incorrect. Returns the completion if it had not
    /// fired yet.
    pub fn forfeit(&mut self) -> Option<TaskCompletion> {
        if self.is_finished() {
            return None;
        }

        self.locked = true;
        self.complete(false)
    }

    fn complete(&mut self, is_correct: bool) -> Option<TaskCompletion> {
        if self.completion_sent {
            return None;
        }

        self.completion_sent = true;
        Some(TaskCompletion { is_correct })
    }
}

/// UI pacing delays, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionTiming {
    /// How long a correct answer stays on screen before the session advances.
    pub success_display_ms: u32,
    /// How long a wrong pair flashes before reverting.
    pub mismatch_flash_ms: u32,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            success_display_ms: 1500,
            mismatch_flash_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSessionState {
    pub active_index: usize,
    pub score: usize,
    pub completed: bool,
}

/// Sequences a batch of tasks and keeps score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSession {
    tasks: Vec<Task>,
    state: TaskSessionState,
}

impl TaskSession {
    pub fn new(tasks: Vec<Task>) -> Self {
        let completed = tasks.is_empty();
        Self {
            tasks,
            state: TaskSessionState {
                completed,
                ..TaskSessionState::default()
            },
        }
    }

    pub fn state(&self) -> TaskSessionState {
        self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    pub fn active_task(&self) -> Option<&Task> {
        if self.state.completed {
            None
        } else {
            self.tasks.get(self.state.active_index)
        }
    }

    /// Fresh runner for the active task.
    pub fn active_runner<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<TaskRunner> {
        self.active_task()
            .cloned()
            .map(|task| TaskRunner::new(task, rng))
    }

    /// Records the active task's result and moves to the next task.
    ///
    /// # Errors
    /// Returns [`EngineError::SessionFinished`] once every task has been recorded.
    pub fn advance(&mut self, is_correct: bool) -> Result<TaskSessionState, EngineError> {
        if self.state.completed {
            return Err(EngineError::SessionFinished);
        }

        if is_correct {
            self.state.score += 1;
        }

        if self.state.active_index + 1 >= self.tasks.len() {
            self.state.completed = true;
        } else {
            self.state.active_index += 1;
        }

        Ok(self.state)
    }

    /// Score as a share of all tasks, rounded and capped at 100. Wrong answers never count,
    /// so this tracks accuracy rather than how far through the batch the user is.
    pub fn progress_percent(&self) -> u32 {
        let total = self.tasks.len().max(1) as f64;
        let percent = (self.state.score as f64 / total * 100.0).round();
        percent.min(100.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{DefinitionPair, FillInBlankTask, MultipleChoiceTask, TrueFalseTask};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn multiple_choice() -> Task {
        Task::MultipleChoice(MultipleChoiceTask {
            question: "Which response shows empathy?".to_string(),
            options: vec![
                "Cheer up!".to_string(),
                "That sounds really hard.".to_string(),
                "Others have it worse.".to_string(),
            ],
            correct_answer: "That sounds really hard.".to_string(),
        })
    }

    fn matching(pairs: usize) -> Task {
        Task::MatchDefinition(MatchDefinitionTask {
            pairs: (0..pairs)
                .map(|i| DefinitionPair {
                    term: format!("term-{}", i),
                    definition: format!("definition-{}", i),
                })
                .collect(),
        })
    }

    fn index_of(board: &MatchBoard, column: Column, text: &str) -> usize {
        board
            .cards(column)
            .iter()
            .position(|card| card.text == text)
            .expect("card should exist")
    }

    #[test]
    fn correct_choice_completes_once() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut runner = TaskRunner::new(multiple_choice(), &mut rng);

        assert_eq!(runner.state(), TaskState::Unanswered);
        assert_eq!(
            runner.select(Answer::Choice("That sounds really hard.".to_string())),
            Ok(TaskState::Selected)
        );

        let evaluation = runner.evaluate().expect("selection should evaluate");
        assert_eq!(evaluation.state, TaskState::Correct);
        assert_eq!(evaluation.completion, Some(TaskCompletion { is_correct: true }));

        assert_eq!(
            runner.submit(Answer::Choice("Cheer up!".to_string())),
            Err(EngineError::TaskFinished)
        );
        assert_eq!(runner.forfeit(), None);
    }

    #[test]
    fn wrong_choice_does_not_complete() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut runner = TaskRunner::new(multiple_choice(), &mut rng);

        let evaluation = runner
            .submit(Answer::Choice("Cheer up!".to_string()))
            .expect("wrong answers still evaluate");

        assert_eq!(evaluation.state, TaskState::Incorrect);
        assert_eq!(evaluation.completion, None);
        assert_eq!(runner.failed_attempts(), 1);
    }

    #[test]
    fn retry_after_wrong_answer() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut runner = TaskRunner::new(multiple_choice(), &mut rng);

        runner
            .submit(Answer::Choice("Others have it worse.".to_string()))
            .expect("wrong answer evaluates");
        runner.reset();
        assert_eq!(runner.state(), TaskState::Unanswered);
        assert_eq!(runner.selected(), None);

        let evaluation = runner
            .submit(Answer::Choice("That sounds really hard.".to_string()))
            .expect("retry evaluates");
        assert_eq!(evaluation.completion, Some(TaskCompletion { is_correct: true }));
    }

    #[test]
    fn selecting_again_after_wrong_answer_starts_new_attempt() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut runner = TaskRunner::new(multiple_choice(), &mut rng);

        runner
            .submit(Answer::Choice("Cheer up!".to_string()))
            .expect("wrong answer evaluates");

        assert_eq!(
            runner.select(Answer::Choice("Others have it worse.".to_string())),
            Ok(TaskState::Selected)
        );
    }

    #[test]
    fn double_select_is_rejected() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut runner = TaskRunner::new(multiple_choice(), &mut rng);

        runner
            .select(Answer::Choice("Cheer up!".to_string()))
            .expect("first select");
        assert_eq!(
            runner.select(Answer::Choice("Cheer up!".to_string())),
            Err(EngineError::AlreadySelected)
        );
    }

    #[test]
    fn evaluate_requires_selection() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut runner = TaskRunner::new(multiple_choice(), &mut rng);
        assert_eq!(runner.evaluate(), Err(EngineError::NothingSelected));
    }

    #[test]
    fn rejects_unknown_options_and_wrong_answer_kinds() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut runner = TaskRunner::new(multiple_choice(), &mut rng);

        assert_eq!(
            runner.select(Answer::Choice("Just relax".to_string())),
            Err(EngineError::UnknownOption {
                choice: "Just relax".to_string()
            })
        );
        assert_eq!(
            runner.select(Answer::Bool(true)),
            Err(EngineError::AnswerMismatch {
                task: "Multiple Choice"
            })
        );
        assert!(matches!(
            runner.pick(Column::Terms, 0),
            Err(EngineError::AnswerMismatch { .. })
        ));
    }

    #[test]
    fn true_false_compares_booleans() {
        let mut rng = StdRng::seed_from_u64(7);
        let task = Task::TrueFalse(TrueFalseTask {
            question: "Asking directly about suicide increases risk.".to_string(),
            answer: false,
        });
        let mut runner = TaskRunner::new(task, &mut rng);

        assert_eq!(
            runner.submit(Answer::Bool(true)).map(|e| e.state),
            Ok(TaskState::Incorrect)
        );
        assert_eq!(
            runner.submit(Answer::Bool(false)).map(|e| e.state),
            Ok(TaskState::Correct)
        );
    }

    #[test]
    fn fill_in_blank_ignores_case_and_offers_word_bank() {
        let mut rng = StdRng::seed_from_u64(8);
        let task = Task::FillInBlank(FillInBlankTask {
            question: "Listening without _____ builds trust.".to_string(),
            correct_answer: "judgment".to_string(),
            options: Vec::new(),
        });
        let mut runner = TaskRunner::new(task, &mut rng);

        assert_eq!(runner.options().len(), 4);
        let evaluation = runner
            .submit(Answer::Word("Judgment".to_string()))
            .expect("word evaluates");
        assert_eq!(evaluation.completion, Some(TaskCompletion { is_correct: true }));
    }

    #[test]
    fn attempt_limit_locks_and_reports_failure() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut runner = TaskRunner::new(multiple_choice(), &mut rng).with_attempt_limit(2);

        let first = runner
            .submit(Answer::Choice("Cheer up!".to_string()))
            .expect("first attempt");
        assert_eq!(first.completion, None);

        let second = runner
            .submit(Answer::Choice("Others have it worse.".to_string()))
            .expect("second attempt");
        assert_eq!(second.state, TaskState::Locked);
        assert_eq!(second.completion, Some(TaskCompletion { is_correct: false }));
        assert!(runner.is_finished());
    }

    #[test]
    fn forfeit_reports_failure_once() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut runner = TaskRunner::new(multiple_choice(), &mut rng);

        assert_eq!(runner.forfeit(), Some(TaskCompletion { is_correct: false }));
        assert_eq!(runner.forfeit(), None);
        assert_eq!(runner.state(), TaskState::Locked);
    }

    #[test]
    fn match_board_requires_every_pair() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut runner = TaskRunner::new(matching(3), &mut rng);
        let board = runner.board().expect("matching task has a board").clone();

        let mut completions = Vec::new();
        for pair in 0..3 {
            let term = index_of(&board, Column::Terms, &format!("term-{}", pair));
            let definition =
                index_of(&board, Column::Definitions, &format!("definition-{}", pair));

            assert_eq!(runner.pick(Column::Terms, term), Ok(PickOutcome::Pending));
            assert_eq!(runner.state(), TaskState::Selected);

            match runner.pick(Column::Definitions, definition) {
                Ok(PickOutcome::Matched { completion }) => completions.push(completion),
                other => panic!("expected match, got {:?}", other),
            }
        }

        assert_eq!(
            completions,
            vec![None, None, Some(TaskCompletion { is_correct: true })]
        );
        assert_eq!(runner.state(), TaskState::Correct);
    }

    #[test]
    fn mismatched_pair_flashes_then_reverts() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut runner = TaskRunner::new(matching(2), &mut rng);
        let board = runner.board().expect("board").clone();

        let term = index_of(&board, Column::Terms, "term-0");
        let wrong = index_of(&board, Column::Definitions, "definition-1");

        runner.pick(Column::Definitions, wrong).expect("first pick");
        assert_eq!(
            runner.pick(Column::Terms, term),
            Ok(PickOutcome::Mismatched)
        );
        assert_eq!(runner.state(), TaskState::Incorrect);

        let board = runner.board().expect("board");
        assert_eq!(board.card_state(Column::Terms, term), CardState::Error);
        assert_eq!(board.card_state(Column::Definitions, wrong), CardState::Error);

        runner.reset();
        let board = runner.board().expect("board");
        assert_eq!(board.card_state(Column::Terms, term), CardState::Default);
        assert_eq!(runner.state(), TaskState::Unanswered);
    }

    #[test]
    fn failed_pairs_do_not_count_towards_completion() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut runner = TaskRunner::new(matching(2), &mut rng);
        let board = runner.board().expect("board").clone();

        let term_0 = index_of(&board, Column::Terms, "term-0");
        let term_1 = index_of(&board, Column::Terms, "term-1");
        let def_0 = index_of(&board, Column::Definitions, "definition-0");
        let def_1 = index_of(&board, Column::Definitions, "definition-1");

        for _ in 0..3 {
            runner.pick(Column::Terms, term_0).expect("pick term");
            assert_eq!(
                runner.pick(Column::Definitions, def_1),
                Ok(PickOutcome::Mismatched)
            );
        }

        runner.pick(Column::Terms, term_0).expect("pick term");
        runner.pick(Column::Definitions, def_0).expect("pick definition");
        assert_eq!(runner.state(), TaskState::Unanswered);
        assert_eq!(runner.board().map(MatchBoard::matched_pairs), Some(1));

        runner.pick(Column::Definitions, def_1).expect("pick definition");
        let outcome = runner.pick(Column::Terms, term_1).expect("pick term");

        assert_eq!(
            outcome,
            PickOutcome::Matched {
                completion: Some(TaskCompletion { is_correct: true })
            }
        );
        assert_eq!(runner.failed_attempts(), 3);
    }

    #[test]
    fn matched_cards_cannot_be_picked_again() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut runner = TaskRunner::new(matching(2), &mut rng);
        let board = runner.board().expect("board").clone();

        let term = index_of(&board, Column::Terms, "term-0");
        let definition = index_of(&board, Column::Definitions, "definition-0");
        runner.pick(Column::Terms, term).expect("pick");
        runner.pick(Column::Definitions, definition).expect("pick");

        assert_eq!(
            runner.pick(Column::Terms, term),
            Err(EngineError::CardAlreadyMatched {
                column: Column::Terms,
                index: term
            })
        );
        assert_eq!(
            runner.pick(Column::Terms, 9),
            Err(EngineError::CardOutOfRange {
                column: Column::Terms,
                index: 9
            })
        );
    }

    #[test]
    fn same_column_pick_replaces_pending_card() {
        let mut rng = StdRng::seed_from_u64(15);
        let task = match matching(2) {
            Task::MatchDefinition(task) => task,
            _ => unreachable!(),
        };
        let mut board = MatchBoard::new(&task, &mut rng);

        board.pick(Column::Terms, 0).expect("pick");
        board.pick(Column::Terms, 1).expect("pick");

        assert_eq!(board.card_state(Column::Terms, 0), CardState::Default);
        assert_eq!(board.card_state(Column::Terms, 1), CardState::Picked);
        assert!(board.has_pending());
    }

    #[test]
    fn attempt_limit_never_locks_a_match_board() {
        let mut rng = StdRng::seed_from_u64(16);
        let mut runner = TaskRunner::new(matching(3), &mut rng).with_attempt_limit(3);
        let board = runner.board().expect("board").clone();

        let term_0 = index_of(&board, Column::Terms, "term-0");
        let def_0 = index_of(&board, Column::Definitions, "definition-0");
        let def_1 = index_of(&board, Column::Definitions, "definition-1");

        for _ in 0..5 {
            runner.pick(Column::Terms, term_0).expect("pick term");
            assert_eq!(
                runner.pick(Column::Definitions, def_1),
                Ok(PickOutcome::Mismatched)
            );
        }
        assert_eq!(runner.state(), TaskState::Incorrect);
        assert!(!runner.is_finished());

        runner.pick(Column::Terms, term_0).expect("pick term");
        assert_eq!(
            runner.pick(Column::Definitions, def_0),
            Ok(PickOutcome::Matched { completion: None })
        );

        let mut completion = None;
        for i in 1..3 {
            let term = index_of(&board, Column::Terms, &format!("term-{}", i));
            let definition = index_of(&board, Column::Definitions, &format!("definition-{}", i));
            runner.pick(Column::Terms, term).expect("pick term");
            if let PickOutcome::Matched { completion: Some(done) } = runner
                .pick(Column::Definitions, definition)
                .expect("pick definition")
            {
                completion = Some(done);
            }
        }

        assert_eq!(completion, Some(TaskCompletion { is_correct: true }));
        assert_eq!(runner.state(), TaskState::Correct);
        assert_eq!(runner.failed_attempts(), 5);
    }

    #[test]
    fn empty_match_board_waits_for_forfeit() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut runner = TaskRunner::new(matching(0), &mut rng);

        assert_eq!(runner.state(), TaskState::Unanswered);
        assert!(!runner.board().is_some_and(MatchBoard::is_complete));
        assert_eq!(
            runner.pick(Column::Terms, 0),
            Err(EngineError::CardOutOfRange {
                column: Column::Terms,
                index: 0
            })
        );

        let mut session = TaskSession::new(vec![matching(0)]);
        let completion = runner.forfeit().expect("forfeit completes");
        assert!(!completion.is_correct);
        let state = session.advance(completion.is_correct).expect("advance");
        assert!(state.completed);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn session_advances_and_scores() {
        let mut session = TaskSession::new(vec![multiple_choice(), matching(1), multiple_choice()]);

        assert_eq!(
            session.advance(true),
            Ok(TaskSessionState {
                active_index: 1,
                score: 1,
                completed: false
            })
        );
        session.advance(false).expect("second task");
        let last = session.advance(true).expect("third task");

        assert!(last.completed);
        assert_eq!(last.score, 2);
        assert_eq!(session.active_task(), None);
        assert_eq!(session.advance(true), Err(EngineError::SessionFinished));
    }

    #[test]
    fn progress_tracks_accuracy() {
        let mut session = TaskSession::new(vec![multiple_choice(); 3]);
        assert_eq!(session.progress_percent(), 0);

        session.advance(false).expect("first");
        assert_eq!(session.progress_percent(), 0);

        session.advance(true).expect("second");
        assert_eq!(session.progress_percent(), 33);

        session.advance(true).expect("third");
        assert_eq!(session.progress_percent(), 67);
    }

    #[test]
    fn empty_session_is_already_complete() {
        let session = TaskSession::new(Vec::new());
        assert!(session.state().completed);
        assert_eq!(session.progress_percent(), 0);
    }

    #[test]
    fn runner_completion_drives_session() {
        let mut rng = StdRng::seed_from_u64(16);
        let mut session = TaskSession::new(vec![multiple_choice()]);
        let mut runner = session.active_runner(&mut rng).expect("active task");

        let evaluation = runner
            .submit(Answer::Choice("That sounds really hard.".to_string()))
            .expect("evaluates");
        if let Some(completion) = evaluation.completion {
            session.advance(completion.is_correct).expect("advance");
        }

        assert!(session.state().completed);
        assert_eq!(session.progress_percent(), 100);
    }
}
