pub mod app;
pub mod autocomplete;
pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod geocode;
pub mod models;
pub mod notice;
pub mod parameters;
pub mod query;
pub mod ranking;
pub mod transport;
pub mod visual;

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::Result;
use crate::transport::{HttpTransport, Transport};

/// Backend client over HTTP, configured from `cfg.backend`.
pub fn connect(cfg: &Config) -> Result<BackendClient> {
    let transport = Arc::new(HttpTransport::new(
        cfg.backend.base_url.clone(),
        cfg.backend_timeout(),
    )?);
    Ok(BackendClient::new(transport as Arc<dyn Transport>))
}
