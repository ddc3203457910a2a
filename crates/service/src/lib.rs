//! Service layer providing business-oriented CRUD operations on top of models.
//! - Separates business logic from data access.
//! - Reuses validation and entity definitions in `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod api_keys;
pub mod auth;
pub mod errors;
pub mod generator;
pub mod images;
pub mod model_configs;
pub mod rate_limit;
pub mod runtime;
pub mod tasks;
#[cfg(test)]
pub mod test_support;
pub mod worker;
