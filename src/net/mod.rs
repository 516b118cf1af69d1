//! # Módulo de Red
//! src/net/mod.rs
//!
//! Abstracción de sockets sobre las syscalls del sistema operativo:
//!
//! - `socket`: ciclo de vida de una conexión y sus operaciones de I/O
//! - `select`: multiplexación de readiness con timeout
//! - `addr`: resolución de nombres y direcciones
//! - `error`: fallas etiquetadas (alocación, resolución, syscall, timeout)

mod addr;
pub mod error;
pub mod select;
pub mod socket;

pub use addr::ip_from_host_name;
pub use error::{FailureKind, Result, SocketError};
pub use select::{select, ReadyToken};
pub use socket::{Domain, SockType, Socket};
