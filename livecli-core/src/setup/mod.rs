//! Guided setup: turn a natural-language task into a confirmed, step-by-step
//! sequence of shell commands.

pub mod executor;
pub mod generator;
pub mod plan;

pub use executor::{
    ExecutionLedger, ExecutionReport, ExecutorOptions, PlanExecutor, SetupCallback, SetupStatus,
    StepDecision, StepOutcome,
};
pub use generator::PlanGenerator;
pub use plan::{SetupPlan, SetupStep, parse_plan};
