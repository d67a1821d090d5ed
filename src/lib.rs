pub mod config;
pub mod domain;
pub mod error;
pub mod eutils;
pub mod events;
pub mod fetcher;
pub mod geo_page;
pub mod http;
pub mod output;
pub mod points;
pub mod reduce;
pub mod snapshot;
pub mod vectorize;
