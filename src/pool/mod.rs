//! # Pool de Workers
//! src/pool/mod.rs
//!
//! Desacopla el loop de accept del procesamiento de conexiones: cada
//! conexión aceptada se ejecuta como tarea en un thread reutilizable.

pub mod worker_pool;

pub use worker_pool::{default_workers, PoolState, PoolStats, Task, WorkerPool};

/// Errores del ciclo de vida del pool
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// `init` con cero workers
    #[error("worker count must be >= 1")]
    ZeroWorkers,

    /// `init` llamado sobre un pool ya inicializado
    #[error("thread pool already initialized")]
    AlreadyInitialized,

    /// El sistema operativo no pudo crear un thread
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
