//! Re-exports of every error type in the crate.

pub use crate::aggregate::AggregateError;
pub use crate::check::CheckError;
pub use crate::config::ConfigError;
pub use crate::rates::cache::CacheError;
pub use crate::rates::provider::ProviderError;
pub use crate::rates::resolver::RateError;
pub use crate::reconcile::ReconcileError;
pub use crate::util::decimal::DecimalError;
