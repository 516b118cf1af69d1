//! # Pool de Workers
//! src/pool/worker_pool.rs
//!
//! Ejecutor con concurrencia acotada: un número fijo de threads toma tareas
//! de una cola FIFO compartida.
//!
//! ## Sincronización
//!
//! La cola y el flag `stop` viven juntos detrás de un único `Mutex`. Los
//! workers esperan en un `Condvar` hasta que haya tareas o se pida parar;
//! la espera libera el lock mientras bloquea, así que no se pierden
//! notificaciones y ninguna tarea se desencola dos veces.
//!
//! ## Estados
//!
//! `Uninitialized → Running → Draining → Stopped`

use super::PoolError;
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

/// Unidad de trabajo opaca
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Estado del ciclo de vida del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    Uninitialized,
    Running,
    Draining,
    Stopped,
}

/// Cola protegida por el lock
struct Queue {
    tasks: VecDeque<Task>,
    /// Pasa de false a true una sola vez
    stop: bool,
}

/// Estado compartido entre el pool y sus workers
struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
    active: AtomicUsize,
    completed: AtomicUsize,
    panicked: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        // Las tareas corren fuera del lock; un lock envenenado sigue siendo consistente
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Estadísticas de un pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub state: PoolState,
    pub workers: usize,
    pub queued: usize,
    pub active: usize,
    pub completed: usize,
    pub panicked: usize,
}

/// Pool de threads con cola FIFO
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
    state: PoolState,
}

impl WorkerPool {
    /// Crea un pool sin workers (`Uninitialized`)
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue {
                    tasks: VecDeque::new(),
                    stop: false,
                }),
                available: Condvar::new(),
                active: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                panicked: AtomicUsize::new(0),
            }),
            workers: Vec::new(),
            worker_count: 0,
            state: PoolState::Uninitialized,
        }
    }

    /// Lanza exactamente `workers` threads
    pub fn init(&mut self, workers: usize) -> Result<(), PoolError> {
        if self.state != PoolState::Uninitialized {
            return Err(PoolError::AlreadyInitialized);
        }
        if workers == 0 {
            return Err(PoolError::ZeroWorkers);
        }

        info!("Initializing thread pool with {} threads", workers);
        for i in 0..workers {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(format!("worker-{}", i))
                .spawn(move || Self::worker_loop(shared));

            match handle {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    error!("Failed to spawn worker {}: {}", i, e);
                    // Los workers ya lanzados no deben quedar esperando
                    self.worker_count = self.workers.len();
                    self.state = PoolState::Running;
                    self.terminate();
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        self.worker_count = workers;
        self.state = PoolState::Running;
        Ok(())
    }

    /// Lanza un worker por núcleo disponible
    pub fn init_default(&mut self) -> Result<(), PoolError> {
        self.init(default_workers())
    }

    /// Encola una tarea al final de la cola y despierta a un worker
    ///
    /// El orden de inicio es FIFO; el orden de término no está garantizado.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut queue = self.shared.lock();
            if queue.stop {
                warn!("Task submitted after stop was requested");
            }
            queue.tasks.push_back(Box::new(task));
        }
        self.shared.available.notify_one();
    }

    /// Apagado ordenado: espera a que terminen todas las tareas encoladas
    pub fn shutdown(&mut self) {
        if !self.request_stop() {
            return;
        }
        info!("Shutting down thread pool");
        self.state = PoolState::Draining;

        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!("Worker {} exited with a panic", name);
            }
        }
        self.state = PoolState::Stopped;
        debug!("Thread pool stopped");
    }

    /// Terminación abrupta: suelta los workers sin esperarlos
    ///
    /// Los workers siguen corriendo en segundo plano; las tareas aún en la
    /// cola pueden no ejecutarse antes de que termine el proceso.
    pub fn terminate(&mut self) {
        if !self.request_stop() {
            return;
        }
        info!("Terminating thread pool");

        let detached = self.workers.len();
        self.workers.clear();
        self.state = PoolState::Stopped;
        debug!(detached, "Worker threads detached");
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn stats(&self) -> PoolStats {
        let queued = self.shared.lock().tasks.len();
        PoolStats {
            state: self.state,
            workers: self.worker_count,
            queued,
            active: self.shared.active.load(Ordering::SeqCst),
            completed: self.shared.completed.load(Ordering::SeqCst),
            panicked: self.shared.panicked.load(Ordering::SeqCst),
        }
    }

    pub fn stats_json(&self) -> serde_json::Value {
        serde_json::to_value(self.stats()).unwrap_or(serde_json::Value::Null)
    }

    /// Marca `stop` y despierta a todos; false si no había nada que parar
    fn request_stop(&mut self) -> bool {
        if self.state != PoolState::Running {
            return false;
        }
        self.shared.lock().stop = true;
        self.shared.available.notify_all();
        true
    }

    fn worker_loop(shared: Arc<Shared>) {
        let name = thread::current().name().unwrap_or("worker").to_string();
        trace!("Worker {} started", name);

        loop {
            let task = {
                let queue = shared.lock();
                let mut queue = shared
                    .available
                    .wait_while(queue, |q| q.tasks.is_empty() && !q.stop)
                    .unwrap_or_else(PoisonError::into_inner);

                match queue.tasks.pop_front() {
                    Some(task) => task,
                    // stop && cola vacía
                    None => break,
                }
            };

            shared.active.fetch_add(1, Ordering::SeqCst);
            let result = panic::catch_unwind(AssertUnwindSafe(task));
            shared.active.fetch_sub(1, Ordering::SeqCst);

            match result {
                Ok(()) => {
                    shared.completed.fetch_add(1, Ordering::SeqCst);
                }
                Err(payload) => {
                    shared.panicked.fetch_add(1, Ordering::SeqCst);
                    error!("Task panicked on {}: {}", name, panic_message(&*payload));
                }
            }
        }

        trace!("Worker {} exiting", name);
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Sin join: los workers drenan la cola y salen solos
        self.terminate();
    }
}

/// Núcleos disponibles, o 1 si no se pueden consultar
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
