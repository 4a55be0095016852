//! Adapters implementing application ports

mod routing_adapter;

pub use routing_adapter::{PROVIDER_REQUESTS_METRIC, RoutingAdapter, client_for};
