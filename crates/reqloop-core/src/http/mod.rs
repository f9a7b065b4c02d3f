//! HTTP data model shared by the executor, signers and transports.
//!
//! These types are transport-agnostic: a [`LogicalRequest`] is
//! what callers build and what signers mutate, and a [`Response`] is the fully
//! buffered result handed back to the caller.

mod body;
mod headers;
mod media_type;
mod method;
mod query;
mod request;
mod response;

pub use body::{BodyError, RequestBody};
pub use headers::HttpHeaders;
pub use media_type::MediaType;
pub use method::{Method, ParseMethodError};
pub use query::QueryString;
pub use request::LogicalRequest;
pub use response::Response;
