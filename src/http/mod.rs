//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request-id and trace layers, admission)
//!     → request.rs (request id, client instance)
//!     → [route table, auth gate, body limit, session gate]
//!     → [proxy dispatcher forwards to backend]
//!     → response.rs (pass through, or synthesized {error, message})
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeGatewayRequestId, UNKNOWN_CLIENT, X_REQUEST_ID};
pub use response::{ErrorBody, GatewayError};
pub use server::{AppState, HttpServer, ServerError};
