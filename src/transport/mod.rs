//! Network transport: the fetch executor over `reqwest`.

mod executor;

pub(crate) use executor::FetchExecutor;
