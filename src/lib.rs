pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod engagement;
pub mod error;
pub mod paths;
pub mod push;
pub mod session;
pub mod srs;
pub mod store;

#[cfg(test)]
pub mod testing;
