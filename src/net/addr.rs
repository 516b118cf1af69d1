//! # Resolución de Direcciones
//! src/net/addr.rs
//!
//! Envoltorios sobre `getaddrinfo`/`getnameinfo` que producen direcciones
//! concretas (`sockaddr_storage` + longitud) listas para bind, connect,
//! sendto y recvfrom.

use super::error::{Result, SocketError};
use libc::{c_char, c_int, sockaddr, sockaddr_storage, sockaddr_un, socklen_t};
use std::ffi::{CStr, CString};
use std::{io, mem, ptr};
use tracing::error;

/// Capacidad de buffer para hosts numéricos (NI_MAXHOST)
const MAX_HOST: usize = 1025;

/// Capacidad de buffer para servicios numéricos (NI_MAXSERV)
const MAX_SERV: usize = 32;

/// Dirección concreta de socket
#[derive(Clone, Copy)]
pub(crate) struct SockAddr {
    storage: sockaddr_storage,
    len: socklen_t,
}

impl SockAddr {
    /// Dirección vacía con capacidad completa, para que el kernel la llene
    pub fn empty() -> Self {
        Self {
            // SAFETY: sockaddr_storage es POD; todo en cero es válido
            storage: unsafe { mem::zeroed() },
            len: mem::size_of::<sockaddr_storage>() as socklen_t,
        }
    }

    pub fn as_ptr(&self) -> *const sockaddr {
        &self.storage as *const sockaddr_storage as *const sockaddr
    }

    pub fn as_mut_ptr(&mut self) -> *mut sockaddr {
        &mut self.storage as *mut sockaddr_storage as *mut sockaddr
    }

    pub fn len(&self) -> socklen_t {
        self.len
    }

    pub fn len_mut(&mut self) -> &mut socklen_t {
        &mut self.len
    }

    #[cfg(test)]
    pub fn family(&self) -> c_int {
        self.storage.ss_family as c_int
    }

    /// Copia `len` bytes de un `sockaddr` del sistema
    ///
    /// # Safety
    /// `addr` debe apuntar a al menos `len` bytes válidos.
    unsafe fn copy_from(addr: *const sockaddr, len: socklen_t) -> Self {
        let mut out = Self::empty();
        let len = (len as usize).min(mem::size_of::<sockaddr_storage>());
        ptr::copy_nonoverlapping(
            addr as *const u8,
            &mut out.storage as *mut sockaddr_storage as *mut u8,
            len,
        );
        out.len = len as socklen_t;
        out
    }
}

/// Pistas para `getaddrinfo`
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hints {
    pub family: c_int,
    pub socktype: c_int,
    pub protocol: c_int,
    /// `AI_PASSIVE`: dirección "any" para sockets servidor
    pub passive: bool,
}

/// Resuelve `host:service` a la primera dirección concreta
///
/// Acepta nombres de servicio ("http") además de puertos numéricos.
/// Un host o servicio vacío se pasa como NULL.
pub(crate) fn resolve(host: &str, service: &str, hints: Hints) -> Result<SockAddr> {
    let resolution_error = |detail: String| {
        let err = SocketError::Resolution {
            host: host.to_string(),
            service: service.to_string(),
            detail,
        };
        error!("{}", err);
        err
    };

    let c_host = optional_cstring(host).map_err(|e| resolution_error(e.to_string()))?;
    let c_service = optional_cstring(service).map_err(|e| resolution_error(e.to_string()))?;

    // SAFETY: addrinfo es POD
    let mut hint: libc::addrinfo = unsafe { mem::zeroed() };
    hint.ai_family = hints.family;
    hint.ai_socktype = hints.socktype;
    hint.ai_protocol = hints.protocol;
    if hints.passive {
        hint.ai_flags = libc::AI_PASSIVE;
    }

    let mut res: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: punteros válidos o NULL; `res` se libera abajo
    let status = unsafe {
        libc::getaddrinfo(
            c_host.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
            c_service.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
            &hint,
            &mut res,
        )
    };
    if status != 0 {
        return Err(resolution_error(gai_error(status)));
    }
    if res.is_null() {
        return Err(resolution_error("no addresses returned".to_string()));
    }

    // SAFETY: getaddrinfo tuvo éxito, `res` apunta a una lista válida
    let addr = unsafe {
        let first = &*res;
        let addr = SockAddr::copy_from(first.ai_addr, first.ai_addrlen);
        libc::freeaddrinfo(res);
        addr
    };
    Ok(addr)
}

/// Dirección Unix-domain; el path se trunca a la capacidad de `sun_path`
pub(crate) fn unix_addr(path: &str) -> SockAddr {
    // SAFETY: sockaddr_un es POD
    let mut un: sockaddr_un = unsafe { mem::zeroed() };
    un.sun_family = libc::AF_UNIX as libc::sa_family_t;

    let capacity = un.sun_path.len() - 1;
    for (dst, src) in un.sun_path.iter_mut().zip(path.bytes().take(capacity)) {
        *dst = src as c_char;
    }

    // SAFETY: `un` vive durante la copia y su tamaño cabe en sockaddr_storage
    unsafe {
        SockAddr::copy_from(
            &un as *const sockaddr_un as *const sockaddr,
            mem::size_of::<sockaddr_un>() as socklen_t,
        )
    }
}

/// Host y puerto numéricos de una dirección (`NI_NUMERICHOST`)
pub(crate) fn numeric_host(addr: &SockAddr) -> Result<(String, String)> {
    let mut host = [0 as c_char; MAX_HOST];
    let mut serv = [0 as c_char; MAX_SERV];

    // SAFETY: buffers locales con sus capacidades reales
    let status = unsafe {
        libc::getnameinfo(
            addr.as_ptr(),
            addr.len(),
            host.as_mut_ptr(),
            host.len() as socklen_t,
            serv.as_mut_ptr(),
            serv.len() as socklen_t,
            libc::NI_NUMERICHOST | libc::NI_NUMERICSERV,
        )
    };
    if status != 0 {
        let err = SocketError::Resolution {
            host: String::new(),
            service: String::new(),
            detail: gai_error(status),
        };
        error!("getnameinfo error: {}", err);
        return Err(err);
    }

    // SAFETY: getnameinfo termina ambos buffers en NUL
    let (host, serv) = unsafe {
        (
            CStr::from_ptr(host.as_ptr()).to_string_lossy().into_owned(),
            CStr::from_ptr(serv.as_ptr()).to_string_lossy().into_owned(),
        )
    };
    Ok((host, serv))
}

/// Dirección IPv4 numérica de un hostname; string vacío si falla
pub fn ip_from_host_name(hostname: &str) -> String {
    let hints = Hints {
        family: libc::AF_INET,
        socktype: libc::SOCK_STREAM,
        protocol: 0,
        passive: false,
    };
    match resolve(hostname, "", hints).and_then(|addr| numeric_host(&addr)) {
        Ok((ip, _)) => ip,
        Err(_) => {
            error!("Is unavailable: {}", hostname);
            String::new()
        }
    }
}

fn optional_cstring(value: &str) -> std::result::Result<Option<CString>, std::ffi::NulError> {
    if value.is_empty() {
        Ok(None)
    } else {
        CString::new(value).map(Some)
    }
}

fn gai_error(status: c_int) -> String {
    if status == libc::EAI_SYSTEM {
        return io::Error::last_os_error().to_string();
    }
    // SAFETY: gai_strerror retorna un string estático
    unsafe { CStr::from_ptr(libc::gai_strerror(status)) }
        .to_string_lossy()
        .into_owned()
}
