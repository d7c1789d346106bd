pub mod columns;
pub mod portal_driver;
pub mod selectors;
pub mod sheet_gateway;

pub use portal_driver::{PortalDriver, PortalState};
pub use sheet_gateway::SheetGateway;
