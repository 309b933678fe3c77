pub mod http_client;
pub mod monitoring_client;
pub mod token_provider;
