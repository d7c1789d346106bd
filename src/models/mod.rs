pub mod order;
pub mod request;
pub mod state;
pub mod step;

pub use order::{OrderData, OrderRow};
pub use request::{AutomationRequest, ValidatedRequest};
pub use state::{OrderResult, OrderStatus, WorkflowState};
pub use step::{Step, StepDef, StepId, StepStatus, WorkflowKind};
