//! # Logging
//! src/logging.rs
//!
//! Inicializa el subscriber de `tracing` que imprime en stdout. El resto del
//! crate solo emite eventos; no sabe dónde terminan.

use tracing::Level;

/// Instala el subscriber global con el nivel máximo indicado
///
/// Llamarla más de una vez es inofensivo: si ya hay un subscriber
/// instalado, retorna false y se conserva el existente.
pub fn init(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_thread_names(true)
        .with_target(false)
        .try_init()
        .is_ok()
}
