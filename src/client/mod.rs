//! Client façade: the public request surface.
//!
//! [`ApiClient`] exposes the verb methods (`get`/`post`/`put`/`patch`/
//! `delete`), the multipart upload helper, and the cache-management helpers.
//! Cache-backend failures are absorbed by the request pipeline (degrading to
//! miss / skipped write-back); only the cache-management helpers surface them.

mod builder;
mod core;
mod options;

pub use builder::ApiClientBuilder;
pub use core::ApiClient;
pub use options::{CacheOptions, RequestOptions, DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT};
