// Library for tests to access modules

pub mod builder;
pub mod cache;
pub mod config;
pub mod counters;
pub mod error;
pub mod format;
pub mod models;
pub mod rates;
pub mod shutdown;
pub mod sink;
pub mod version;
pub mod worker;
