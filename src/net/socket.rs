//! # Socket
//! src/net/socket.rs
//!
//! Envoltorio sobre un descriptor de socket del sistema operativo:
//! bind, connect, listen, accept, lecturas (con y sin timeout), escrituras,
//! datagramas, opciones, modo bloqueante y shutdown.
//!
//! Cada syscall fallida se registra con `tracing::error!` junto con la
//! descripción del sistema y se retorna como `SocketError`. No hay
//! reintentos en esta capa.
//!
//! ## Dueño único
//!
//! `Socket` no implementa `Clone`. `close(self)` consume el handle, así que
//! un descriptor se cierra exactamente una vez; si el dueño nunca llama
//! `close`, el `Drop` lo libera.

use super::addr::{self, Hints, SockAddr};
use super::error::{Result, SocketError};
use super::select::{self, ReadyToken};
use libc::{c_int, c_void, socklen_t};
use std::io;
use std::mem;
use std::net::Shutdown;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;
use tracing::{debug, error, info, trace};

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: c_int = 0;

/// Familia de direcciones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Ipv4,
    Ipv6,
    Unix,
}

impl Domain {
    fn as_raw(self) -> c_int {
        match self {
            Domain::Ipv4 => libc::AF_INET,
            Domain::Ipv6 => libc::AF_INET6,
            Domain::Unix => libc::AF_UNIX,
        }
    }
}

/// Tipo de socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockType {
    Stream,
    Datagram,
}

impl SockType {
    fn as_raw(self) -> c_int {
        match self {
            SockType::Stream => libc::SOCK_STREAM,
            SockType::Datagram => libc::SOCK_DGRAM,
        }
    }
}

/// Un extremo de comunicación: socket de escucha o conexión aceptada
#[derive(Debug)]
pub struct Socket {
    fd: RawFd,
    domain: Domain,
    ty: SockType,
    protocol: c_int,
    /// Host al que se hizo bind/connect, o host numérico del peer
    address: String,
    /// Puerto o nombre de servicio
    port: String,
}

impl Socket {
    /// Crea un socket nuevo del sistema operativo
    pub fn new(domain: Domain, ty: SockType, protocol: c_int) -> Result<Self> {
        // SAFETY: socket(2) no toma punteros
        let fd = unsafe { libc::socket(domain.as_raw(), ty.as_raw(), protocol) };
        if fd < 0 {
            let err = SocketError::Allocation {
                source: io::Error::last_os_error(),
            };
            error!("{}", err);
            return Err(err);
        }
        trace!(fd, ?domain, ?ty, "socket created");

        Ok(Self {
            fd,
            domain,
            ty,
            protocol,
            address: String::new(),
            port: String::new(),
        })
    }

    /// Hace bind a `address:port`
    ///
    /// Para `Domain::Unix`, `address` es el path del socket (truncado a la
    /// capacidad de `sun_path`) y `port` se ignora.
    pub fn bind(&mut self, address: &str, port: &str) -> Result<()> {
        let target = self.target_addr(address, port, true)?;
        // SAFETY: `target` es una dirección válida de `target.len()` bytes
        let status = unsafe { libc::bind(self.fd, target.as_ptr(), target.len()) };
        self.check("bind", status)?;

        info!("Binding to: {}:{}", address, port);
        Ok(())
    }

    /// Conecta a `address:port`
    pub fn connect(&mut self, address: &str, port: &str) -> Result<()> {
        let target = self.target_addr(address, port, false)?;
        // SAFETY: `target` es una dirección válida de `target.len()` bytes
        let status = unsafe { libc::connect(self.fd, target.as_ptr(), target.len()) };
        self.check("connect", status)?;

        debug!("Connected to: {}:{}", address, port);
        Ok(())
    }

    /// Marca el socket como pasivo con una cola de `backlog` conexiones
    pub fn listen(&self, backlog: i32) -> Result<()> {
        // SAFETY: listen(2) no toma punteros
        let status = unsafe { libc::listen(self.fd, backlog) };
        self.check("listen", status)?;

        info!("Listening on: {}:{}", self.address, self.port);
        Ok(())
    }

    /// Bloquea hasta que un peer se conecte
    ///
    /// Una única llamada bloqueante a `accept(2)`. El socket retornado
    /// hereda familia/tipo/protocolo y lleva el host numérico del peer.
    pub fn accept(&self) -> Result<Socket> {
        let mut peer = SockAddr::empty();
        // SAFETY: `peer` tiene capacidad de sockaddr_storage
        let fd = unsafe { libc::accept(self.fd, peer.as_mut_ptr(), peer.len_mut()) };
        self.check("accept", fd)?;

        let address = if self.domain == Domain::Unix {
            String::new()
        } else {
            addr::numeric_host(&peer).map(|(host, _)| host).unwrap_or_default()
        };

        let socket = Socket {
            fd,
            domain: self.domain,
            ty: self.ty,
            protocol: self.protocol,
            address,
            port: self.port.clone(),
        };
        info!(fd, "Connection from: {}", socket.address);
        Ok(socket)
    }

    /// Envía todo `msg`, repitiendo `send(2)` hasta completar o fallar
    pub fn write(&self, msg: &[u8]) -> Result<usize> {
        let mut sent = 0;
        while sent < msg.len() {
            let rest = &msg[sent..];
            // SAFETY: `rest` es un slice válido
            let n = unsafe {
                libc::send(self.fd, rest.as_ptr() as *const c_void, rest.len(), SEND_FLAGS)
            };
            if n < 0 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            match self.check_len("write", n)? {
                0 => {
                    let err = SocketError::Os {
                        op: "write",
                        source: io::ErrorKind::WriteZero.into(),
                    };
                    error!("{}", err);
                    return Err(err);
                }
                n => sent += n,
            }
        }
        trace!(fd = self.fd, bytes = sent, "write complete");
        Ok(sent)
    }

    /// Un único `recv(2)` de hasta `max_len` bytes
    ///
    /// Un vector vacío significa que el peer cerró la conexión.
    pub fn read(&self, max_len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len];
        // SAFETY: `buf` tiene `max_len` bytes escribibles
        let n = unsafe { libc::recv(self.fd, buf.as_mut_ptr() as *mut c_void, max_len, 0) };
        let n = self.check_len("read", n)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Espera hasta `timeout` a que haya datos y luego hace un único `read`
    ///
    /// Si la espera expira retorna `SocketError::Timeout` sin intentar el
    /// `recv`.
    pub fn safe_read(&self, max_len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut reads = vec![self.token(0)];
        let ready = select::select(Some(&mut reads), None, None, timeout)?;
        if ready == 0 {
            debug!(fd = self.fd, ?timeout, "read timed out");
            return Err(SocketError::Timeout { after: timeout });
        }
        self.read(max_len)
    }

    /// Envía un datagrama a `address:port`
    pub fn write_to(&mut self, msg: &[u8], address: &str, port: &str) -> Result<usize> {
        let target = self.target_addr(address, port, false)?;
        // SAFETY: `msg` y `target` son válidos durante la llamada
        let n = unsafe {
            libc::sendto(
                self.fd,
                msg.as_ptr() as *const c_void,
                msg.len(),
                SEND_FLAGS,
                target.as_ptr(),
                target.len(),
            )
        };
        self.check_len("writeTo", n)
    }

    /// Recibe un datagrama de hasta `max_len` bytes
    ///
    /// `address:port` se resuelve primero para fijar la familia esperada.
    /// Retorna los bytes y el host numérico del emisor.
    pub fn read_from(
        &mut self,
        max_len: usize,
        address: &str,
        port: &str,
    ) -> Result<(Vec<u8>, String)> {
        let mut source = self.target_addr(address, port, false)?;
        *source.len_mut() = mem::size_of::<libc::sockaddr_storage>() as socklen_t;

        let mut buf = vec![0u8; max_len];
        // SAFETY: `buf` tiene `max_len` bytes y `source` capacidad completa
        let n = unsafe {
            libc::recvfrom(
                self.fd,
                buf.as_mut_ptr() as *mut c_void,
                max_len,
                0,
                source.as_mut_ptr(),
                source.len_mut(),
            )
        };
        let n = self.check_len("readFrom", n)?;
        buf.truncate(n);

        let sender = addr::numeric_host(&source).map(|(host, _)| host).unwrap_or_default();
        Ok((buf, sender))
    }

    /// `setsockopt(2)` sin envoltura semántica
    pub fn set_opt<T: Copy>(&self, level: c_int, name: c_int, value: &T) -> Result<()> {
        // SAFETY: `value` apunta a `size_of::<T>()` bytes válidos
        let status = unsafe {
            libc::setsockopt(
                self.fd,
                level,
                name,
                value as *const T as *const c_void,
                mem::size_of::<T>() as socklen_t,
            )
        };
        self.check("socket_set_opt", status).map(drop)
    }

    /// `getsockopt(2)` sin envoltura semántica
    pub fn get_opt<T: Copy + Default>(&self, level: c_int, name: c_int) -> Result<T> {
        let mut value = T::default();
        let mut len = mem::size_of::<T>() as socklen_t;
        // SAFETY: `value` tiene `len` bytes escribibles
        let status = unsafe {
            libc::getsockopt(
                self.fd,
                level,
                name,
                &mut value as *mut T as *mut c_void,
                &mut len,
            )
        };
        self.check("socket_get_opt", status)?;
        Ok(value)
    }

    pub fn set_blocking(&self) -> Result<()> {
        self.update_flags("set_blocking", |flags| flags & !libc::O_NONBLOCK)
    }

    pub fn set_nonblocking(&self) -> Result<()> {
        self.update_flags("set_non_blocking", |flags| flags | libc::O_NONBLOCK)
    }

    /// Cierra la dirección de lectura, escritura o ambas
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        let how = match how {
            Shutdown::Read => libc::SHUT_RD,
            Shutdown::Write => libc::SHUT_WR,
            Shutdown::Both => libc::SHUT_RDWR,
        };
        // SAFETY: shutdown(2) no toma punteros
        let status = unsafe { libc::shutdown(self.fd, how) };
        self.check("shutdown", status).map(drop)
    }

    /// Libera el descriptor
    pub fn close(mut self) -> Result<()> {
        let fd = mem::replace(&mut self.fd, -1);
        // SAFETY: `fd` es nuestro y no se vuelve a usar
        let status = unsafe { libc::close(fd) };
        if status < 0 {
            let err = SocketError::last_os("close");
            error!(fd, "{}", err);
            return Err(err);
        }
        trace!(fd, "socket closed");
        Ok(())
    }

    /// Espera readiness sobre tres conjuntos de tokens
    pub fn select(
        reads: Option<&mut Vec<ReadyToken>>,
        writes: Option<&mut Vec<ReadyToken>>,
        exceptions: Option<&mut Vec<ReadyToken>>,
        timeout: Duration,
    ) -> Result<usize> {
        select::select(reads, writes, exceptions, timeout)
    }

    /// Dirección IPv4 numérica de `hostname`, o string vacío
    pub fn ip_from_host_name(hostname: &str) -> String {
        addr::ip_from_host_name(hostname)
    }

    /// Token de readiness para este socket
    pub fn token(&self, key: usize) -> ReadyToken {
        ReadyToken::new(self.fd, key)
    }

    /// Host y puerto locales numéricos (`getsockname`)
    pub fn local_addr(&self) -> Result<(String, String)> {
        let mut local = SockAddr::empty();
        // SAFETY: `local` tiene capacidad de sockaddr_storage
        let status = unsafe { libc::getsockname(self.fd, local.as_mut_ptr(), local.len_mut()) };
        self.check("getsockname", status)?;
        addr::numeric_host(&local)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn sock_type(&self) -> SockType {
        self.ty
    }

    pub fn protocol(&self) -> c_int {
        self.protocol
    }

    /// Dirección concreta para bind/connect/sendto/recvfrom
    fn target_addr(&mut self, address: &str, port: &str, passive: bool) -> Result<SockAddr> {
        self.address = address.to_string();
        self.port = port.to_string();

        if self.domain == Domain::Unix {
            return Ok(addr::unix_addr(address));
        }
        let hints = Hints {
            family: self.domain.as_raw(),
            socktype: self.ty.as_raw(),
            protocol: self.protocol,
            passive,
        };
        addr::resolve(address, port, hints)
    }

    fn update_flags(&self, op: &'static str, update: impl FnOnce(c_int) -> c_int) -> Result<()> {
        // SAFETY: fcntl con F_GETFL/F_SETFL no toma punteros
        let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFL) };
        let flags = self.check(op, flags)?;
        // SAFETY: idem
        let status = unsafe { libc::fcntl(self.fd, libc::F_SETFL, update(flags)) };
        self.check(op, status).map(drop)
    }

    fn check(&self, op: &'static str, status: c_int) -> Result<c_int> {
        if status < 0 {
            let err = SocketError::last_os(op);
            error!(fd = self.fd, "{}", err);
            return Err(err);
        }
        Ok(status)
    }

    fn check_len(&self, op: &'static str, n: isize) -> Result<usize> {
        if n < 0 {
            let err = SocketError::last_os(op);
            error!(fd = self.fd, "{}", err);
            return Err(err);
        }
        Ok(n as usize)
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if self.fd >= 0 {
            // SAFETY: el descriptor sigue abierto y es nuestro
            unsafe { libc::close(self.fd) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::FailureKind;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;
    use std::time::Instant;

    fn ephemeral_listener() -> (Socket, u16) {
        let mut listener = Socket::new(Domain::Ipv4, SockType::Stream, 0).unwrap();
        listener.bind("127.0.0.1", "0").unwrap();
        listener.listen(16).unwrap();
        let (_, port) = listener.local_addr().unwrap();
        (listener, port.parse().unwrap())
    }

    #[test]
    fn test_new_with_unknown_protocol_is_allocation_error() {
        let err = Socket::new(Domain::Ipv4, SockType::Stream, 9999).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Allocation);
        assert!(err.raw_os_error().is_some());
    }

    #[test]
    fn test_accept_reports_peer_address() {
        let (listener, port) = ephemeral_listener();

        let client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let conn = listener.accept().unwrap();

        assert_eq!(conn.address(), client.local_addr().unwrap().ip().to_string());
        assert_eq!(conn.domain(), Domain::Ipv4);
        assert_eq!(conn.sock_type(), SockType::Stream);
        assert_eq!(conn.port(), "0");
        conn.close().unwrap();
    }

    #[test]
    fn test_safe_read_short_burst() {
        let (listener, port) = ephemeral_listener();
        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let conn = listener.accept().unwrap();

        client.write_all(b"hello world").unwrap();
        let data = conn.safe_read(1024, Duration::from_secs(5)).unwrap();

        assert_eq!(data, b"hello world");
        conn.close().unwrap();
    }

    #[test]
    fn test_safe_read_times_out_without_receiving() {
        let (listener, port) = ephemeral_listener();
        let _client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let conn = listener.accept().unwrap();

        let start = Instant::now();
        let err = conn.safe_read(1024, Duration::from_millis(300)).unwrap_err();

        assert_eq!(err.kind(), FailureKind::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_read_returns_empty_when_peer_closes() {
        let (listener, port) = ephemeral_listener();
        let client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let conn = listener.accept().unwrap();
        drop(client);

        let data = conn.safe_read(64, Duration::from_secs(5)).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_write_sends_large_payload_completely() {
        let (listener, port) = ephemeral_listener();
        let client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let conn = listener.accept().unwrap();

        let payload = vec![0xAB_u8; 4 * 1024 * 1024];
        let reader = thread::spawn(move || {
            let mut client = client;
            let mut received = Vec::new();
            client.read_to_end(&mut received).unwrap();
            received
        });

        let sent = conn.write(&payload).unwrap();
        assert_eq!(sent, payload.len());
        conn.close().unwrap();

        let received = reader.join().unwrap();
        assert_eq!(received.len(), payload.len());
        assert!(received.iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_connect_to_listener() {
        let (listener, port) = ephemeral_listener();

        let mut client = Socket::new(Domain::Ipv4, SockType::Stream, 0).unwrap();
        client.connect("127.0.0.1", &port.to_string()).unwrap();
        let conn = listener.accept().unwrap();

        client.write(b"ping").unwrap();
        assert_eq!(conn.read(16).unwrap(), b"ping");

        client.shutdown(Shutdown::Write).unwrap();
        assert!(conn.read(16).unwrap().is_empty());
    }

    #[test]
    fn test_connect_refused_is_os_error() {
        let (listener, port) = ephemeral_listener();
        drop(listener);

        let mut client = Socket::new(Domain::Ipv4, SockType::Stream, 0).unwrap();
        let err = client.connect("127.0.0.1", &port.to_string()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::OsCall);
        assert_eq!(err.raw_os_error(), Some(libc::ECONNREFUSED));
    }

    #[test]
    fn test_bind_unresolvable_host() {
        let mut socket = Socket::new(Domain::Ipv4, SockType::Stream, 0).unwrap();
        let err = socket.bind("definitely.not.a.host.invalid", "80").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Resolution);
    }

    #[test]
    fn test_datagram_write_to_read_from() {
        let mut receiver = Socket::new(Domain::Ipv4, SockType::Datagram, 0).unwrap();
        receiver.bind("127.0.0.1", "0").unwrap();
        let (_, port) = receiver.local_addr().unwrap();

        let mut sender = Socket::new(Domain::Ipv4, SockType::Datagram, 0).unwrap();
        let sent = sender.write_to(b"datagram", "127.0.0.1", &port).unwrap();
        assert_eq!(sent, 8);

        let (data, from) = receiver.read_from(64, "127.0.0.1", "0").unwrap();
        assert_eq!(data, b"datagram");
        assert_eq!(from, "127.0.0.1");
    }

    #[test]
    fn test_socket_options_round_trip() {
        let socket = Socket::new(Domain::Ipv4, SockType::Stream, 0).unwrap();
        let enable: c_int = 1;
        socket.set_opt(libc::SOL_SOCKET, libc::SO_REUSEADDR, &enable).unwrap();

        let value: c_int = socket.get_opt(libc::SOL_SOCKET, libc::SO_REUSEADDR).unwrap();
        assert_ne!(value, 0);
    }

    #[test]
    fn test_nonblocking_read_would_block() {
        let (listener, port) = ephemeral_listener();
        let _client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let conn = listener.accept().unwrap();

        conn.set_nonblocking().unwrap();
        let err = conn.read(16).unwrap_err();
        assert_eq!(err.kind(), FailureKind::OsCall);
        assert!(matches!(
            err.raw_os_error(),
            Some(code) if code == libc::EAGAIN || code == libc::EWOULDBLOCK
        ));

        conn.set_blocking().unwrap();
        // SAFETY: consulta de flags sobre un descriptor abierto
        let flags = unsafe { libc::fcntl(conn.as_raw_fd(), libc::F_GETFL) };
        assert_eq!(flags & libc::O_NONBLOCK, 0);
    }

    #[test]
    fn test_unix_domain_bind_connect() {
        let path = std::env::temp_dir().join(format!("conn_server_{}.sock", std::process::id()));
        let path = path.to_string_lossy().into_owned();
        let _ = std::fs::remove_file(&path);

        let mut listener = Socket::new(Domain::Unix, SockType::Stream, 0).unwrap();
        listener.bind(&path, "").unwrap();
        listener.listen(4).unwrap();

        let mut client = Socket::new(Domain::Unix, SockType::Stream, 0).unwrap();
        client.connect(&path, "").unwrap();
        let conn = listener.accept().unwrap();
        assert_eq!(conn.domain(), Domain::Unix);

        client.write(b"local").unwrap();
        assert_eq!(conn.safe_read(16, Duration::from_secs(5)).unwrap(), b"local");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_ip_from_host_name_static() {
        assert_eq!(Socket::ip_from_host_name("127.0.0.1"), "127.0.0.1");
    }
}
