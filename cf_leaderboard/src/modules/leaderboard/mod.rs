pub mod error;
pub mod hub;
pub mod model;
pub mod publisher;
pub mod ranking;
pub mod record;
pub mod refresh;
pub mod relations;
pub mod store;

#[cfg(test)]
pub mod test_utils;
