pub mod aggregate;
pub mod api;
pub mod bundle;
pub mod classify;
pub mod config;
pub mod decompose;
pub mod disposition;
pub mod endpoints;
pub mod format;
pub mod id;
pub mod metrics_middleware;
pub mod naming;
pub mod payload;
pub mod prometheus;
pub mod router;
pub mod server;
pub mod service;
pub mod storage;
pub mod time;
