pub mod path_validator;
pub mod verbose;

pub use path_validator::PathValidator;
