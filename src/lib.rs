// Library for tests to access modules

pub mod collector;
pub mod config;
pub mod metrics;
pub mod models;
pub mod nasne_repo;
pub mod routes;
pub mod version;
