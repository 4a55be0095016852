//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod budget_store;
mod routing_port;

#[cfg(test)]
pub use budget_store::MockBudgetStorePort;
pub use budget_store::BudgetStorePort;
#[cfg(test)]
pub use routing_port::MockRoutingPort;
pub use routing_port::{ProviderError, RouteRequest, RoutingPort};
