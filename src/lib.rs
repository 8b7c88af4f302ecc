pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod services;
pub mod tracking;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::engine::CurationEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CurationEngine>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
