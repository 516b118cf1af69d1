//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! El loop de accept espera readiness del socket de escucha con un timeout
//! corto, acepta, y entrega cada conexión al pool como una tarea. Un worker
//! lee el request (con timeout por lectura), escribe la respuesta fija y
//! cierra la conexión.

use crate::config::{Config, ShutdownMode};
use crate::http::Response;
use crate::metrics::MetricsCollector;
use crate::net::{Domain, SockType, Socket, SocketError};
use crate::pool::{PoolError, WorkerPool};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pausa tras el primer accept fallido; se duplica en cada falla seguida
const ACCEPT_BACKOFF: Duration = Duration::from_millis(5);

/// Errores del servidor
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    /// `serve` sin un `bind` previo exitoso
    #[error("server is not bound")]
    NotBound,
}

/// Flag de ejecución compartido entre el loop de accept y quien lo detiene
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Pide al loop de accept que termine en su próxima revisión
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Parámetros del manejo de cada conexión
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Bytes por lectura; una lectura completa indica que puede haber más
    pub read_chunk: usize,
    pub read_timeout: Duration,
    /// Bytes enviados a todo peer
    pub response: Vec<u8>,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            read_chunk: config.read_chunk,
            read_timeout: config.read_timeout(),
            ..Self::default()
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            read_chunk: 1024,
            read_timeout: Duration::from_secs(10),
            response: Response::hello_world().to_bytes(),
        }
    }
}

/// Resultado del manejo de una conexión
#[derive(Debug, Clone, Default)]
pub struct ConnectionOutcome {
    /// Bytes recibidos, concatenados en orden de llegada
    pub request: Vec<u8>,
    /// Alguna lectura expiró sin datos
    pub timed_out: bool,
    /// La respuesta fija se envió completa
    pub responded: bool,
    /// Una lectura o escritura falló
    pub failed: bool,
}

/// Servidor de conexiones con pool de workers
pub struct Server {
    config: Config,
    settings: Arc<ConnectionSettings>,
    metrics: MetricsCollector,
    running: StopHandle,
    listener: Option<Socket>,
    pool: WorkerPool,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let settings = ConnectionSettings::from_config(&config);
        Self {
            config,
            settings: Arc::new(settings),
            metrics: MetricsCollector::new(),
            running: StopHandle::new(),
            listener: None,
            pool: WorkerPool::new(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.running.clone()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Crea el socket de escucha, hace bind/listen e inicia el pool
    ///
    /// Retorna el puerto efectivo (útil con puerto 0).
    pub fn bind(&mut self) -> Result<u16, ServerError> {
        self.config.validate().map_err(ServerError::InvalidConfig)?;

        let domain = if self.config.host.contains(':') {
            Domain::Ipv6
        } else {
            Domain::Ipv4
        };
        let mut listener = Socket::new(domain, SockType::Stream, 0)?;
        let reuse: libc::c_int = 1;
        listener.set_opt(libc::SOL_SOCKET, libc::SO_REUSEADDR, &reuse)?;
        listener.bind(&self.config.host, &self.config.port.to_string())?;
        listener.listen(self.config.backlog)?;

        let port = listener
            .local_addr()?
            .1
            .parse()
            .unwrap_or(self.config.port);

        self.pool.init(self.config.worker_count())?;
        self.listener = Some(listener);
        Ok(port)
    }

    /// Loop de accept hasta que se pida parar
    ///
    /// Al salir drena o abandona el pool según `ShutdownMode` y cierra el
    /// socket de escucha.
    pub fn serve(&mut self) -> Result<(), ServerError> {
        let listener = self.listener.take().ok_or(ServerError::NotBound)?;
        let poll = self.config.accept_poll();
        let mut accept_failures: u32 = 0;

        while self.running.is_running() {
            let mut reads = vec![listener.token(0)];
            match Socket::select(Some(&mut reads), None, None, poll) {
                Ok(0) => continue,
                Ok(_) => {}
                Err(e) => {
                    // EINTR al llegar una señal; el flag se revisa arriba
                    debug!("Accept wait interrupted: {}", e);
                    continue;
                }
            }

            let conn = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => {
                    // Con EMFILE el listener sigue listo
                    self.metrics.record_accept_error();
                    thread::sleep(accept_backoff(accept_failures, poll));
                    accept_failures = accept_failures.saturating_add(1);
                    continue;
                }
            };
            accept_failures = 0;
            self.metrics.record_accept();

            let settings = Arc::clone(&self.settings);
            let metrics = self.metrics.clone();
            self.pool.submit(move || {
                Self::handle_connection(conn, &settings, &metrics);
            });
        }

        info!("Stopping server...");
        match self.config.shutdown {
            ShutdownMode::Graceful => self.pool.shutdown(),
            ShutdownMode::Abrupt => self.pool.terminate(),
        }
        // Un close fallido ya quedó registrado
        let _ = listener.close();

        info!(pool = %self.pool.stats_json(), "Server stopped");
        info!(metrics = %self.metrics.to_json(), "Final metrics");
        Ok(())
    }

    /// `bind` + `serve`
    pub fn run(&mut self) -> Result<(), ServerError> {
        let port = self.bind()?;
        info!("Server listening on {}:{}", self.config.host, port);
        self.serve()
    }

    /// Maneja una conexión completa en el thread del worker
    ///
    /// Lee en bloques de `read_chunk` mientras cada lectura venga llena;
    /// una lectura corta, un cierre del peer o un timeout terminan el loop.
    /// Luego envía la respuesta fija. Un error de lectura aborta sin
    /// responder. El socket se cierra en todos los caminos.
    pub fn handle_connection(
        socket: Socket,
        settings: &ConnectionSettings,
        metrics: &MetricsCollector,
    ) -> ConnectionOutcome {
        let start = Instant::now();
        metrics.connection_started();
        info!(peer = socket.address(), "Accepted connection");

        let mut outcome = ConnectionOutcome::default();
        loop {
            match socket.safe_read(settings.read_chunk, settings.read_timeout) {
                Ok(chunk) if chunk.is_empty() => {
                    debug!("Peer closed the connection");
                    break;
                }
                Ok(chunk) => {
                    info!("Received {} bytes", chunk.len());
                    outcome.request.extend_from_slice(&chunk);
                    if chunk.len() < settings.read_chunk {
                        break;
                    }
                }
                Err(e) if e.is_timeout() => {
                    outcome.timed_out = true;
                    break;
                }
                Err(_) => {
                    outcome.failed = true;
                    break;
                }
            }
        }

        info!("Received request: {}", String::from_utf8_lossy(&outcome.request));

        if outcome.failed {
            warn!(peer = socket.address(), "Dropping connection without response");
        } else {
            match socket.write(&settings.response) {
                Ok(_) => outcome.responded = true,
                Err(_) => outcome.failed = true,
            }
        }
        let _ = socket.close();

        metrics.connection_finished(
            outcome.request.len(),
            outcome.responded,
            outcome.timed_out,
            outcome.failed,
            start.elapsed(),
        );
        outcome
    }
}

/// Pausa tras `failures` accepts fallidos seguidos, acotada por `cap`
fn accept_backoff(failures: u32, cap: Duration) -> Duration {
    ACCEPT_BACKOFF
        .saturating_mul(1u32 << failures.min(16))
        .min(cap)
}
