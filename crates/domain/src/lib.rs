pub mod account_store;
pub mod accounts;
pub mod admission;
pub mod error;
pub mod ports;
pub mod rate_limit;
pub mod research;
pub mod reviews;
pub mod scoring;
pub mod tiers;
pub mod util;
pub mod webhook;

pub type DomainResult<T> = Result<T, error::DomainError>;
