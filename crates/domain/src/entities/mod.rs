//! Domain entities

mod outcome;
mod policy;
mod response_table;
mod user_profile;

pub use outcome::{STATUS_OK, STATUS_UNKNOWN_ERROR, ValidationOutcome};
pub use policy::{DEFAULT_ORDER, GroupMember, OrderGroup, ValidationPolicy, ValidatorSpec};
pub use response_table::{OverrideDocument, REQUEST_ID_VAR, ResponseRule, ResponseTable};
pub use user_profile::{UserProfile, escape_uri, vars as profile_vars};
