//! Request routing: HTTP path + query vars into a structured resource request.

mod parse;
mod request;

pub use parse::{route, Routed};
pub use request::{HttpVerb, MethodToken, RecordKey, Representation, ResourceRequest};
