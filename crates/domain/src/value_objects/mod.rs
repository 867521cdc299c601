//! Value Objects - Immutable, identity-less domain primitives

mod error_code;
mod region;
mod value_template;

pub use error_code::ErrorCode;
pub use region::Region;
pub use value_template::ValueTemplate;
