//! # Multiplexación de Readiness
//! src/net/select.rs
//!
//! Espera hasta que alguno de los descriptores esté listo para lectura,
//! escritura o condición excepcional. Los conjuntos se describen con
//! `ReadyToken`: descriptor + clave del llamador. Un token no es dueño del
//! descriptor, así que nunca puede cerrarlo.

use super::error::{Result, SocketError};
use libc::{c_int, c_short, pollfd};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;
use tracing::error;

/// Referencia liviana a un descriptor para `select`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadyToken {
    fd: RawFd,
    key: usize,
}

impl ReadyToken {
    /// `key` permite al llamador mapear el token de vuelta a su socket
    pub fn new(fd: RawFd, key: usize) -> Self {
        Self { fd, key }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn key(&self) -> usize {
        self.key
    }
}

const READ_EVENTS: c_short = libc::POLLIN;
const READ_READY: c_short = libc::POLLIN | libc::POLLHUP | libc::POLLERR;
const WRITE_EVENTS: c_short = libc::POLLOUT;
const WRITE_READY: c_short = libc::POLLOUT | libc::POLLHUP | libc::POLLERR;
const EXCEPT_EVENTS: c_short = libc::POLLPRI;
const EXCEPT_READY: c_short = libc::POLLPRI;

/// Espera hasta `timeout` y reduce cada conjunto a los tokens listos
///
/// Un timeout de cero retorna de inmediato con lo que ya esté listo.
/// Retorna la cantidad total de tokens listos en los tres conjuntos.
pub fn select(
    mut reads: Option<&mut Vec<ReadyToken>>,
    mut writes: Option<&mut Vec<ReadyToken>>,
    mut exceptions: Option<&mut Vec<ReadyToken>>,
    timeout: Duration,
) -> Result<usize> {
    let mut fds: Vec<pollfd> = Vec::new();
    let sets = [
        (reads.as_deref(), READ_EVENTS),
        (writes.as_deref(), WRITE_EVENTS),
        (exceptions.as_deref(), EXCEPT_EVENTS),
    ];
    for (set, events) in sets {
        for token in set.into_iter().flatten() {
            fds.push(pollfd {
                fd: token.fd,
                events,
                revents: 0,
            });
        }
    }

    // SAFETY: `fds` es un slice válido de `fds.len()` elementos
    let status = unsafe {
        libc::poll(
            fds.as_mut_ptr(),
            fds.len() as libc::nfds_t,
            timeout_millis(timeout),
        )
    };
    if status < 0 {
        let err = SocketError::last_os("select");
        error!("{}", err);
        return Err(err);
    }

    if fds.iter().any(|p| p.revents & libc::POLLNVAL != 0) {
        let err = SocketError::Os {
            op: "select",
            source: io::Error::from_raw_os_error(libc::EBADF),
        };
        error!("{}", err);
        return Err(err);
    }

    let mut revents = fds.iter().map(|p| p.revents);
    let mut ready = 0;
    ready += narrow(reads.as_deref_mut(), &mut revents, READ_READY);
    ready += narrow(writes.as_deref_mut(), &mut revents, WRITE_READY);
    ready += narrow(exceptions.as_deref_mut(), &mut revents, EXCEPT_READY);
    Ok(ready)
}

/// Retiene los tokens cuyos `revents` intersectan `mask`
fn narrow(
    set: Option<&mut Vec<ReadyToken>>,
    revents: &mut impl Iterator<Item = c_short>,
    mask: c_short,
) -> usize {
    let Some(set) = set else { return 0 };
    let flags: Vec<c_short> = revents.take(set.len()).collect();
    let mut idx = 0;
    set.retain(|_| {
        let keep = flags.get(idx).is_some_and(|r| r & mask != 0);
        idx += 1;
        keep
    });
    set.len()
}

/// Milisegundos para `poll`, redondeando hacia arriba fracciones de ms
fn timeout_millis(timeout: Duration) -> c_int {
    let millis = timeout.as_millis();
    let millis = if millis == 0 && !timeout.is_zero() { 1 } else { millis };
    millis.min(c_int::MAX as u128) as c_int
}
