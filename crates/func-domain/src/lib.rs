// func-domain library entry point
pub mod environment;
pub mod errors;
pub mod function;
pub mod scheduled_task;
pub mod status;
pub mod task;
pub mod workflow;
pub mod workflow_run;

pub use environment::{Environment, Variable};
pub use errors::DomainError;
pub use function::{Function, FunctionParameter, Package, ParameterType, ReturnType};
pub use scheduled_task::{ScheduledTask, ScheduledTaskStatus};
pub use status::TaskStatus;
pub use task::{Task, TaskLog, TaskResult, TaskedObject};
pub use workflow::{Workflow, WorkflowStep};
pub use workflow_run::{WorkflowRun, WorkflowRunStep};
