#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod routing;
pub mod routing_dump;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{RouterConfig, load_config};
pub use ir::{Connection, Element, Layout, RoutingSpec};
pub use routing::{RouteReport, RouterManager, route_layout};
