//! External API integrations

pub mod upstream;

pub use upstream::UpstreamClient;
