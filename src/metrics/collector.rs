//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta métricas de conexiones en tiempo real: accepts, bytes leídos,
//! respuestas, timeouts y latencia de manejo por conexión.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Máximo de latencias a guardar (para calcular percentiles)
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

/// Datos internos de métricas
#[derive(Default)]
struct MetricsData {
    accepted: u64,
    accept_errors: u64,
    /// Conexiones en manos de un worker ahora mismo
    active_connections: u64,
    bytes_received: u64,
    responses_sent: u64,
    read_timeouts: u64,
    connection_errors: u64,
    /// Latencias de manejo (en microsegundos), ventana de las últimas N
    latencies: Vec<u64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData::default())),
            start_time: Instant::now(),
        }
    }

    pub fn record_accept(&self) {
        self.data().accepted += 1;
    }

    pub fn record_accept_error(&self) {
        self.data().accept_errors += 1;
    }

    pub fn connection_started(&self) {
        self.data().active_connections += 1;
    }

    /// Registra el resultado de una conexión terminada
    pub fn connection_finished(
        &self,
        bytes: usize,
        responded: bool,
        timed_out: bool,
        failed: bool,
        latency: Duration,
    ) {
        let mut data = self.data();
        data.active_connections = data.active_connections.saturating_sub(1);
        data.bytes_received += bytes as u64;
        if responded {
            data.responses_sent += 1;
        }
        if timed_out {
            data.read_timeouts += 1;
        }
        if failed {
            data.connection_errors += 1;
        }

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.remove(0);
        }
        data.latencies.push(latency.as_micros() as u64);
    }

    pub fn active_connections(&self) -> u64 {
        self.data().active_connections
    }

    /// Snapshot serializable de las métricas actuales
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.data();
        let (p50, p95, p99, avg) = calculate_percentiles(&data.latencies);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            accepted: data.accepted,
            accept_errors: data.accept_errors,
            active_connections: data.active_connections,
            bytes_received: data.bytes_received,
            responses_sent: data.responses_sent,
            read_timeouts: data.read_timeouts,
            connection_errors: data.connection_errors,
            latency_us: LatencySummary {
                p50,
                p95,
                p99,
                avg,
                samples: data.latencies.len(),
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    fn data(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Calcula percentiles de latencia: (p50, p95, p99, avg)
fn calculate_percentiles(latencies: &[u64]) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted = latencies.to_vec();
    sorted.sort_unstable();

    let len = sorted.len();
    let p50 = sorted[len * 50 / 100];
    let p95 = sorted[len * 95 / 100];
    let p99 = sorted[len * 99 / 100];

    let sum: u64 = sorted.iter().sum();
    let avg = sum / len as u64;

    (p50, p95, p99, avg)
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub accepted: u64,
    pub accept_errors: u64,
    pub active_connections: u64,
    pub bytes_received: u64,
    pub responses_sent: u64,
    pub read_timeouts: u64,
    pub connection_errors: u64,
    pub latency_us: LatencySummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub samples: usize,
}
