//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración con soporte para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./conn_server --port 8080 \
//!   --workers 8 \
//!   --backlog 64 \
//!   --read-timeout-secs 10 \
//!   --shutdown abrupt
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! SERVER_PORT=8080 SERVER_HOST=127.0.0.1 ./conn_server
//! ```

use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Qué hacer con el pool al detener el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShutdownMode {
    /// Esperar a que terminen las conexiones encoladas y en curso
    Graceful,
    /// Soltar los workers sin esperarlos
    Abrupt,
}

/// Nivel máximo de logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "conn_server")]
#[command(about = "Servidor TCP concurrente con pool de workers")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "SERVER_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor (0 = efímero)
    #[arg(short, long, default_value = "8080", env = "SERVER_PORT")]
    pub port: u16,

    /// Largo máximo de la cola de conexiones pendientes
    #[arg(long, default_value = "20", env = "SERVER_BACKLOG")]
    pub backlog: i32,

    // === Workers ===

    /// Número de workers (por defecto, uno por núcleo)
    #[arg(long, env = "SERVER_WORKERS")]
    pub workers: Option<usize>,

    // === Lecturas ===

    /// Segundos máximos esperando datos en cada lectura
    #[arg(long = "read-timeout-secs", default_value = "10", env = "READ_TIMEOUT_SECS")]
    pub read_timeout_secs: u64,

    /// Bytes por llamada de lectura
    #[arg(long = "read-chunk", default_value = "1024", env = "READ_CHUNK")]
    pub read_chunk: usize,

    // === Loop de accept ===

    /// Milisegundos entre revisiones del flag de parada
    #[arg(long = "accept-poll-ms", default_value = "250", env = "ACCEPT_POLL_MS")]
    pub accept_poll_ms: u64,

    /// Apagado del pool al recibir SIGINT/SIGTERM
    #[arg(long, value_enum, default_value = "graceful", env = "SHUTDOWN_MODE")]
    pub shutdown: ShutdownMode,

    // === Logging ===

    #[arg(long = "log-level", value_enum, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: LogLevel,
}

impl Config {
    /// Parsea argumentos CLI (y variables de entorno)
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use conn_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn accept_poll(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms)
    }

    /// Workers configurados, o uno por núcleo disponible
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(crate::pool::default_workers)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("Workers must be >= 1".to_string());
        }
        if self.backlog < 1 {
            return Err("Backlog must be >= 1".to_string());
        }
        if self.read_chunk == 0 {
            return Err("Read chunk must be >= 1".to_string());
        }
        if self.read_timeout_secs == 0 {
            return Err("Read timeout must be > 0".to_string());
        }
        if self.accept_poll_ms == 0 {
            return Err("Accept poll interval must be > 0".to_string());
        }
        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║              Connection Server Configuration                 ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!("   Backlog:      {}", self.backlog);
        println!("   Accept poll:  {} ms", self.accept_poll_ms);
        println!();
        println!("👷 Worker Pool:");
        println!("   Workers:      {}", self.worker_count());
        println!("   Shutdown:     {:?}", self.shutdown);
        println!();
        println!("📥 Reads:");
        println!("   Chunk:        {} bytes", self.read_chunk);
        println!("   Timeout:      {} s", self.read_timeout_secs);
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backlog: 20,
            workers: None,
            read_timeout_secs: 10,
            read_chunk: 1024,
            accept_poll_ms: 250,
            shutdown: ShutdownMode::Graceful,
            log_level: LogLevel::Info,
        }
    }
}
