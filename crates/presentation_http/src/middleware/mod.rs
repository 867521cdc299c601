//! HTTP middleware components
//!
//! Request correlation and route validation.

pub mod request_id;
pub mod validation;

pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdLayer};
pub use validation::{MatchedRoute, ValidationLayer, decorated_response, is_preflight};
