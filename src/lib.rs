// Library for tests to access modules

pub mod asset_client;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod ingest_worker;
pub mod models;
pub mod price_repo;
pub mod routes;
pub mod version;
pub mod window;
