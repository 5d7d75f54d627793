pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod exception;
pub mod handler;
pub mod param;
pub mod plugin;
pub mod request;
pub mod response;
pub mod router;

pub use app::{App, AppBuilder};
pub use cache::MatchCache;
pub use config::{Config, Environment};
pub use context::Context;
pub use exception::{BoxError, Exception, Stage};
pub use handler::{handler_fn, Handler};
pub use plugin::{HealthCheck, Plugin, RequestLogger};
pub use request::Request;
pub use response::{Reply, Response};
pub use router::{Route, RouteDefinition, RouteMatch, RouteRegistration, Router};
