//! The service shell around the SQL agent: one request handler, shared by the
//! HTTP endpoint and the command-line front-ends.

pub mod handler;
pub mod routes;

pub use handler::{AgentResponse, HandlerOutcome, RequestHandler, Status};
pub use routes::{router, serve};
