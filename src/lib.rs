pub mod aggregate;
pub mod app;
pub mod artifact;
pub mod config;
pub mod country;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod output;
pub mod series;
pub mod source;
pub mod store;
