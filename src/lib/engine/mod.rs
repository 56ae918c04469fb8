pub mod docker;
#[cfg(test)]
pub mod fake;
pub mod types;
