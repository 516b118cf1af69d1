//! # Errores de la Capa de Sockets
//! src/net/error.rs
//!
//! Cada syscall fallida se traduce a un `SocketError` etiquetado. El llamador
//! decide si aborta la conexión o ignora el error; esta capa nunca reintenta.

use std::io;
use std::time::Duration;

/// Resultado de cualquier operación de socket
pub type Result<T> = std::result::Result<T, SocketError>;

/// Tipo de falla, inspeccionable sin parsear strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No se pudo crear el socket
    Allocation,
    /// `getaddrinfo`/`getnameinfo` fallaron
    Resolution,
    /// Una syscall (bind, accept, send, ...) retornó error
    OsCall,
    /// La espera de readiness expiró sin nada listo
    Timeout,
}

/// Errores de la capa de sockets
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// `socket(2)` falló; no existe descriptor utilizable
    #[error("opening socket error: {source}")]
    Allocation {
        /// Error del sistema operativo
        source: io::Error,
    },

    /// No se pudo resolver `host:service`
    #[error("getaddrinfo error for {host}:{service}: {detail}")]
    Resolution {
        /// Host solicitado
        host: String,
        /// Puerto o nombre de servicio solicitado
        service: String,
        /// Descripción de `gai_strerror`
        detail: String,
    },

    /// Una syscall retornó error
    #[error("{op} error: {source}")]
    Os {
        /// Nombre de la operación (bind, accept, write, ...)
        op: &'static str,
        /// Error del sistema operativo
        source: io::Error,
    },

    /// La espera de readiness expiró
    #[error("timed out after {after:?}")]
    Timeout {
        /// Tiempo esperado
        after: Duration,
    },
}

impl SocketError {
    /// Construye un error `Os` a partir de `errno`
    pub(crate) fn last_os(op: &'static str) -> Self {
        SocketError::Os {
            op,
            source: io::Error::last_os_error(),
        }
    }

    /// Clasifica el error
    pub fn kind(&self) -> FailureKind {
        match self {
            SocketError::Allocation { .. } => FailureKind::Allocation,
            SocketError::Resolution { .. } => FailureKind::Resolution,
            SocketError::Os { .. } => FailureKind::OsCall,
            SocketError::Timeout { .. } => FailureKind::Timeout,
        }
    }

    /// Código `errno` de la plataforma, si lo hay
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            SocketError::Allocation { source } | SocketError::Os { source, .. } => {
                source.raw_os_error()
            }
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == FailureKind::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = SocketError::Timeout { after: Duration::from_secs(1) };
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert!(err.is_timeout());

        let err = SocketError::Resolution {
            host: "nope".to_string(),
            service: "80".to_string(),
            detail: "Name or service not known".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::Resolution);
        assert_eq!(err.raw_os_error(), None);
    }

    #[test]
    fn test_os_error_keeps_errno() {
        let err = SocketError::Os {
            op: "bind",
            source: io::Error::from_raw_os_error(libc::EADDRINUSE),
        };
        assert_eq!(err.kind(), FailureKind::OsCall);
        assert_eq!(err.raw_os_error(), Some(libc::EADDRINUSE));
        assert!(err.to_string().starts_with("bind error:"));
    }
}
