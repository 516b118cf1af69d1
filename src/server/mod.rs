//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! Servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes sin bloquear la revisión del flag de parada
//! 3. Entrega cada conexión al pool de workers
//! 4. Lee el request y envía la respuesta fija

pub mod tcp;

pub use tcp::{ConnectionOutcome, ConnectionSettings, Server, ServerError, StopHandle};
