//! Cross-cutting HTTP middleware.

pub mod request_id;
pub mod trace;

pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use trace::configure_http_tracing;
