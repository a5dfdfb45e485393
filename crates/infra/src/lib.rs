pub mod auth;
pub mod config;
pub mod frame_extractor;
pub mod http_fetcher;
pub mod labels;
pub mod logging;
pub mod media;
pub mod research_client;
pub mod webhook_transport;
