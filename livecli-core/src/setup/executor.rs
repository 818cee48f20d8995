//! Plan executor.
//!
//! Walks a [`SetupPlan`] one step at a time: show the plan, confirm it once,
//! then confirm and run each step. A step failure stops the run; a user skip
//! does not.

use super::plan::{SetupPlan, SetupStep};
use crate::error::{ExecutionError, InvalidUserResponse};
use crate::process::{CommandRunner, ShellSpec};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Question asked once before any step runs.
pub const PLAN_QUESTION: &str = "Do you want to proceed with this setup plan? (yes/no)";

/// Per-step question for required steps.
pub const STEP_QUESTION: &str = "Execute this command? (yes/no/skip all)";

/// Per-step question for optional steps.
pub const OPTIONAL_STEP_QUESTION: &str = "Execute this optional step? (yes/no/skip all)";

/// A user's answer to the per-step prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecision {
    Run,
    Skip,
    SkipAll,
}

impl StepDecision {
    /// Parse an answer. Matching is case-insensitive on the trimmed text.
    pub fn parse(answer: &str) -> Result<Self, InvalidUserResponse> {
        match answer.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(StepDecision::Run),
            "no" | "n" => Ok(StepDecision::Skip),
            "skip" | "skip all" => Ok(StepDecision::SkipAll),
            other => Err(InvalidUserResponse {
                answer: other.to_string(),
            }),
        }
    }
}

/// Whether a plan-level answer approves the plan.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

/// What happened to a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed(ExecutionError),
    SkippedByUser,
    SkippedAsRemaining,
    NotReached,
}

impl StepOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            StepOutcome::SkippedByUser | StepOutcome::SkippedAsRemaining
        )
    }
}

/// Per-step outcomes of one run, indexed by 1-based step number.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLedger {
    outcomes: Vec<StepOutcome>,
}

impl ExecutionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a plan of `total` steps, all `NotReached`.
    pub fn begin(&mut self, total: usize) {
        self.outcomes = vec![StepOutcome::NotReached; total];
    }

    pub fn record(&mut self, index: usize, outcome: StepOutcome) {
        if let Some(slot) = index.checked_sub(1).and_then(|i| self.outcomes.get_mut(i)) {
            *slot = outcome;
        }
    }

    pub fn outcome(&self, index: usize) -> Option<&StepOutcome> {
        index.checked_sub(1).and_then(|i| self.outcomes.get(i))
    }

    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// Number of steps that ran successfully.
    pub fn executed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, StepOutcome::Succeeded))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    /// The 1-based index of the failed step, if any.
    pub fn failed_step(&self) -> Option<usize> {
        self.outcomes
            .iter()
            .position(|o| matches!(o, StepOutcome::Failed(_)))
            .map(|i| i + 1)
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    NothingToDo,
    Cancelled,
    DryRun,
    Completed,
    CompletedWithSkips,
    Aborted { step: usize },
}

impl SetupStatus {
    /// Process exit code for scripting.
    pub fn exit_code(&self) -> i32 {
        match self {
            SetupStatus::NothingToDo | SetupStatus::DryRun | SetupStatus::Completed => 0,
            SetupStatus::Aborted { .. } => 1,
            SetupStatus::Cancelled => 3,
            SetupStatus::CompletedWithSkips => 4,
        }
    }
}

impl std::fmt::Display for SetupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupStatus::NothingToDo => write!(f, "nothing to do"),
            SetupStatus::Cancelled => write!(f, "cancelled"),
            SetupStatus::DryRun => write!(f, "dry run"),
            SetupStatus::Completed => write!(f, "completed"),
            SetupStatus::CompletedWithSkips => write!(f, "completed with skipped steps"),
            SetupStatus::Aborted { step } => write!(f, "aborted at step {}", step),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub status: SetupStatus,
    /// Steps that ran successfully.
    pub executed: usize,
    pub total: usize,
}

/// Terminal interaction for the executor.
#[async_trait]
pub trait SetupCallback: Send + Sync {
    /// Display the full plan before confirmation.
    async fn on_plan(&self, plan: &SetupPlan);

    /// Ask `question` and return the trimmed, lowercased answer.
    async fn prompt(&self, question: &str) -> String;

    /// The plan has no steps.
    async fn on_nothing_to_do(&self);

    /// The whole plan was declined.
    async fn on_cancelled(&self);

    /// A step is about to be confirmed or run.
    async fn on_step_start(&self, index: usize, total: usize, step: &SetupStep);

    /// An answer matched none of the accepted tokens and is treated as a skip.
    async fn on_invalid_response(&self, _error: &InvalidUserResponse) {}

    /// Remaining steps were abandoned at `index`.
    async fn on_skip_all(&self, _index: usize) {}

    /// A step finished with `outcome`.
    async fn on_step_finished(&self, index: usize, step: &SetupStep, outcome: &StepOutcome);

    /// The run reached a terminal state.
    async fn on_summary(&self, report: &ExecutionReport);
}

/// Switches that change how the executor interacts with the user.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    /// Skip every confirmation prompt.
    pub auto_confirm: bool,
    /// Show the plan and stop.
    pub dry_run: bool,
    /// Prompt before each step (after the plan is confirmed).
    pub confirm_each_step: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            auto_confirm: false,
            dry_run: false,
            confirm_each_step: true,
        }
    }
}

/// Runs setup plans step by step.
pub struct PlanExecutor {
    runner: Arc<dyn CommandRunner>,
    callback: Arc<dyn SetupCallback>,
    shell: ShellSpec,
    working_dir: PathBuf,
    options: ExecutorOptions,
}

impl PlanExecutor {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        callback: Arc<dyn SetupCallback>,
        shell: ShellSpec,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            runner,
            callback,
            shell,
            working_dir,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Execute `plan`, recording per-step outcomes in `ledger`.
    ///
    /// Steps run strictly in order, each to completion before the next
    /// prompt. Failures are reported through the returned status, never as
    /// an error.
    pub async fn execute(&self, plan: &SetupPlan, ledger: &mut ExecutionLedger) -> ExecutionReport {
        let total = plan.len();
        ledger.begin(total);

        if plan.is_empty() {
            info!("Setup plan has no steps");
            self.callback.on_nothing_to_do().await;
            return self.finish(SetupStatus::NothingToDo, ledger).await;
        }

        self.callback.on_plan(plan).await;

        if self.options.dry_run {
            info!(steps = total, "Dry run; not executing");
            return self.finish(SetupStatus::DryRun, ledger).await;
        }

        if !self.options.auto_confirm {
            let answer = self.callback.prompt(PLAN_QUESTION).await;
            if !is_affirmative(&answer) {
                info!("Setup plan declined");
                self.callback.on_cancelled().await;
                return self.finish(SetupStatus::Cancelled, ledger).await;
            }
        }

        info!(steps = total, shell = %self.shell, "Executing setup plan");

        for (i, step) in plan.steps.iter().enumerate() {
            let index = i + 1;
            self.callback.on_step_start(index, total, step).await;

            match self.decide(step).await {
                StepDecision::Run => {}
                StepDecision::Skip => {
                    debug!(step = index, "Step skipped");
                    ledger.record(index, StepOutcome::SkippedByUser);
                    self.callback
                        .on_step_finished(index, step, &StepOutcome::SkippedByUser)
                        .await;
                    continue;
                }
                StepDecision::SkipAll => {
                    info!(step = index, "Skipping remaining steps");
                    for remaining in index..=total {
                        ledger.record(remaining, StepOutcome::SkippedAsRemaining);
                    }
                    self.callback.on_skip_all(index).await;
                    break;
                }
            }

            debug!(step = index, command = %step.command, "Running step");
            let outcome = match self
                .runner
                .run(&self.shell, &self.working_dir, &step.command)
                .await
            {
                Ok(()) => StepOutcome::Succeeded,
                Err(e) => {
                    warn!(step = index, command = %step.command, error = %e, "Step failed");
                    StepOutcome::Failed(e)
                }
            };
            let failed = matches!(outcome, StepOutcome::Failed(_));
            self.callback.on_step_finished(index, step, &outcome).await;
            ledger.record(index, outcome);

            if failed {
                return self.finish(SetupStatus::Aborted { step: index }, ledger).await;
            }
        }

        let status = if ledger.executed() == total {
            SetupStatus::Completed
        } else {
            SetupStatus::CompletedWithSkips
        };
        self.finish(status, ledger).await
    }

    async fn decide(&self, step: &SetupStep) -> StepDecision {
        if self.options.auto_confirm || !self.options.confirm_each_step {
            return StepDecision::Run;
        }

        let question = if step.optional {
            OPTIONAL_STEP_QUESTION
        } else {
            STEP_QUESTION
        };
        let answer = self.callback.prompt(question).await;
        match StepDecision::parse(&answer) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(answer = %e.answer, "Unrecognized answer; skipping step");
                self.callback.on_invalid_response(&e).await;
                StepDecision::Skip
            }
        }
    }

    async fn finish(&self, status: SetupStatus, ledger: &ExecutionLedger) -> ExecutionReport {
        let report = ExecutionReport {
            status,
            executed: ledger.executed(),
            total: ledger.total(),
        };
        info!(
            status = %report.status,
            executed = report.executed,
            total = report.total,
            "Setup finished"
        );
        self.callback.on_summary(&report).await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::path::Path;
    use tokio::sync::Mutex;

    /// Records commands and fails the ones listed in `failing`.
    struct RecordingRunner {
        commands: Mutex<Vec<String>>,
        failing: Vec<String>,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self::failing_on(&[])
        }

        fn failing_on(commands: &[&str]) -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
                failing: commands.iter().map(|c| c.to_string()).collect(),
            }
        }

        async fn commands(&self) -> Vec<String> {
            self.commands.lock().await.clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(
            &self,
            _shell: &ShellSpec,
            _working_dir: &Path,
            command: &str,
        ) -> Result<(), ExecutionError> {
            self.commands.lock().await.push(command.to_string());
            if self.failing.iter().any(|c| c == command) {
                return Err(ExecutionError::NonZeroExit { code: 2 });
            }
            Ok(())
        }
    }

    /// Replays scripted answers and records prompts.
    struct ScriptedCallback {
        answers: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
        invalid: Mutex<Vec<String>>,
        summaries: Mutex<Vec<ExecutionReport>>,
    }

    impl ScriptedCallback {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
                invalid: Mutex::new(Vec::new()),
                summaries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SetupCallback for ScriptedCallback {
        async fn on_plan(&self, _plan: &SetupPlan) {}

        async fn prompt(&self, question: &str) -> String {
            self.prompts.lock().await.push(question.to_string());
            self.answers.lock().await.pop_front().unwrap_or_default()
        }

        async fn on_nothing_to_do(&self) {}

        async fn on_cancelled(&self) {}

        async fn on_step_start(&self, _index: usize, _total: usize, _step: &SetupStep) {}

        async fn on_invalid_response(&self, error: &InvalidUserResponse) {
            self.invalid.lock().await.push(error.answer.clone());
        }

        async fn on_step_finished(
            &self,
            _index: usize,
            _step: &SetupStep,
            _outcome: &StepOutcome,
        ) {
        }

        async fn on_summary(&self, report: &ExecutionReport) {
            self.summaries.lock().await.push(report.clone());
        }
    }

    fn plan(commands: &[&str]) -> SetupPlan {
        SetupPlan::new(
            commands
                .iter()
                .map(|c| SetupStep::new(*c, format!("run {}", c)))
                .collect(),
        )
    }

    fn executor(
        runner: &Arc<RecordingRunner>,
        callback: &Arc<ScriptedCallback>,
        options: ExecutorOptions,
    ) -> PlanExecutor {
        PlanExecutor::new(
            runner.clone(),
            callback.clone(),
            ShellSpec::new("sh"),
            PathBuf::from("."),
        )
        .with_options(options)
    }

    fn auto() -> ExecutorOptions {
        ExecutorOptions {
            auto_confirm: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_step_decision_parse() {
        assert_eq!(StepDecision::parse("yes"), Ok(StepDecision::Run));
        assert_eq!(StepDecision::parse(" Y "), Ok(StepDecision::Run));
        assert_eq!(StepDecision::parse("NO"), Ok(StepDecision::Skip));
        assert_eq!(StepDecision::parse("n"), Ok(StepDecision::Skip));
        assert_eq!(StepDecision::parse("skip"), Ok(StepDecision::SkipAll));
        assert_eq!(StepDecision::parse("Skip All"), Ok(StepDecision::SkipAll));
        assert_eq!(
            StepDecision::parse("maybe"),
            Err(InvalidUserResponse {
                answer: "maybe".to_string()
            })
        );
        assert!(StepDecision::parse("").is_err());
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("Y"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("sure"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SetupStatus::Completed.exit_code(), 0);
        assert_eq!(SetupStatus::NothingToDo.exit_code(), 0);
        assert_eq!(SetupStatus::DryRun.exit_code(), 0);
        assert_eq!(SetupStatus::Aborted { step: 2 }.exit_code(), 1);
        assert_eq!(SetupStatus::Cancelled.exit_code(), 3);
        assert_eq!(SetupStatus::CompletedWithSkips.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_auto_confirm_runs_in_order() {
        let runner = Arc::new(RecordingRunner::new());
        let callback = Arc::new(ScriptedCallback::new(&[]));
        let mut ledger = ExecutionLedger::new();

        let report = executor(&runner, &callback, auto())
            .execute(&plan(&["a", "b", "c"]), &mut ledger)
            .await;

        assert_eq!(runner.commands().await, vec!["a", "b", "c"]);
        assert_eq!(report.status, SetupStatus::Completed);
        assert_eq!(report.executed, 3);
        assert_eq!(report.total, 3);
        assert!(callback.prompts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_fail_fast() {
        let runner = Arc::new(RecordingRunner::failing_on(&["b"]));
        let callback = Arc::new(ScriptedCallback::new(&[]));
        let mut ledger = ExecutionLedger::new();

        let report = executor(&runner, &callback, auto())
            .execute(&plan(&["a", "b", "c"]), &mut ledger)
            .await;

        assert_eq!(runner.commands().await, vec!["a", "b"]);
        assert_eq!(report.status, SetupStatus::Aborted { step: 2 });
        assert_eq!(report.executed, 1);
        assert_eq!(ledger.failed_step(), Some(2));
        assert_eq!(
            ledger.outcome(2),
            Some(&StepOutcome::Failed(ExecutionError::NonZeroExit { code: 2 }))
        );
        assert_eq!(ledger.outcome(3), Some(&StepOutcome::NotReached));
    }

    #[tokio::test]
    async fn test_skip_all_stops_at_current_step() {
        let runner = Arc::new(RecordingRunner::new());
        let callback = Arc::new(ScriptedCallback::new(&["yes", "y", "skip all"]));
        let mut ledger = ExecutionLedger::new();

        let report = executor(&runner, &callback, ExecutorOptions::default())
            .execute(&plan(&["a", "b", "c"]), &mut ledger)
            .await;

        assert_eq!(runner.commands().await, vec!["a"]);
        assert_eq!(report.status, SetupStatus::CompletedWithSkips);
        assert_eq!(report.executed, 1);
        assert_eq!(
            ledger.outcomes(),
            &[
                StepOutcome::Succeeded,
                StepOutcome::SkippedAsRemaining,
                StepOutcome::SkippedAsRemaining,
            ]
        );
    }

    #[tokio::test]
    async fn test_no_skips_single_step_and_continues() {
        let runner = Arc::new(RecordingRunner::new());
        let callback = Arc::new(ScriptedCallback::new(&["y", "n", "yes"]));
        let mut ledger = ExecutionLedger::new();

        let report = executor(&runner, &callback, ExecutorOptions::default())
            .execute(&plan(&["a", "b"]), &mut ledger)
            .await;

        assert_eq!(runner.commands().await, vec!["b"]);
        assert_eq!(report.status, SetupStatus::CompletedWithSkips);
        assert_eq!(ledger.outcome(1), Some(&StepOutcome::SkippedByUser));
        assert_eq!(ledger.skipped(), 1);
    }

    #[tokio::test]
    async fn test_invalid_answer_is_treated_as_skip() {
        let runner = Arc::new(RecordingRunner::new());
        let callback = Arc::new(ScriptedCallback::new(&["yes", "maybe", "y"]));
        let mut ledger = ExecutionLedger::new();

        executor(&runner, &callback, ExecutorOptions::default())
            .execute(&plan(&["a", "b"]), &mut ledger)
            .await;

        assert_eq!(runner.commands().await, vec!["b"]);
        assert_eq!(*callback.invalid.lock().await, vec!["maybe".to_string()]);
        assert_eq!(ledger.outcome(1), Some(&StepOutcome::SkippedByUser));
    }

    #[tokio::test]
    async fn test_declined_plan_runs_nothing() {
        let runner = Arc::new(RecordingRunner::new());
        let callback = Arc::new(ScriptedCallback::new(&["no"]));
        let mut ledger = ExecutionLedger::new();

        let report = executor(&runner, &callback, ExecutorOptions::default())
            .execute(&plan(&["a", "b"]), &mut ledger)
            .await;

        assert!(runner.commands().await.is_empty());
        assert_eq!(report.status, SetupStatus::Cancelled);
        assert_eq!(*callback.prompts.lock().await, vec![PLAN_QUESTION.to_string()]);
    }

    #[tokio::test]
    async fn test_empty_plan_never_prompts() {
        let runner = Arc::new(RecordingRunner::new());
        let callback = Arc::new(ScriptedCallback::new(&["yes"]));
        let mut ledger = ExecutionLedger::new();

        let report = executor(&runner, &callback, ExecutorOptions::default())
            .execute(&SetupPlan::default(), &mut ledger)
            .await;

        assert_eq!(report.status, SetupStatus::NothingToDo);
        assert_eq!(report.executed, 0);
        assert_eq!(report.total, 0);
        assert!(callback.prompts.lock().await.is_empty());
        assert_eq!(callback.summaries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_shows_plan_only() {
        let runner = Arc::new(RecordingRunner::new());
        let callback = Arc::new(ScriptedCallback::new(&[]));
        let mut ledger = ExecutionLedger::new();
        let options = ExecutorOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = executor(&runner, &callback, options)
            .execute(&plan(&["a"]), &mut ledger)
            .await;

        assert_eq!(report.status, SetupStatus::DryRun);
        assert!(runner.commands().await.is_empty());
        assert!(callback.prompts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_plan_confirmation_without_step_prompts() {
        let runner = Arc::new(RecordingRunner::new());
        let callback = Arc::new(ScriptedCallback::new(&["yes"]));
        let mut ledger = ExecutionLedger::new();
        let options = ExecutorOptions {
            confirm_each_step: false,
            ..Default::default()
        };

        let report = executor(&runner, &callback, options)
            .execute(&plan(&["a", "b"]), &mut ledger)
            .await;

        assert_eq!(runner.commands().await, vec!["a", "b"]);
        assert_eq!(report.status, SetupStatus::Completed);
        assert_eq!(callback.prompts.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_optional_step_question() {
        let runner = Arc::new(RecordingRunner::new());
        let callback = Arc::new(ScriptedCallback::new(&["yes", "yes", "no"]));
        let mut ledger = ExecutionLedger::new();
        let plan = SetupPlan::new(vec![
            SetupStep::new("a", "required"),
            SetupStep::new("b", "extra").optional(),
        ]);

        executor(&runner, &callback, ExecutorOptions::default())
            .execute(&plan, &mut ledger)
            .await;

        let prompts = callback.prompts.lock().await.clone();
        assert_eq!(
            prompts,
            vec![
                PLAN_QUESTION.to_string(),
                STEP_QUESTION.to_string(),
                OPTIONAL_STEP_QUESTION.to_string(),
            ]
        );
    }

    #[test]
    fn test_ledger_ignores_out_of_range() {
        let mut ledger = ExecutionLedger::new();
        ledger.begin(1);
        ledger.record(0, StepOutcome::Succeeded);
        ledger.record(5, StepOutcome::Succeeded);
        assert_eq!(ledger.executed(), 0);
        assert_eq!(ledger.outcome(0), None);
    }
}
