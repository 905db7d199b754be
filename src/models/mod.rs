// Domain models: samples, queries, and the HTTP wire types

pub mod api;
mod entry;
mod query;

pub use entry::Entry;
pub use query::{Aggregation, Query, TimeUnit};
