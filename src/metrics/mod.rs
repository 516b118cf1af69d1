//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Recolección de métricas de conexiones:
//! - Contadores de accepts, respuestas, timeouts y errores
//! - Bytes recibidos
//! - Latencias de manejo (p50, p95, p99)

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};
