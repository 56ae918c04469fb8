pub mod inspect;
pub mod types;
