//! Tests de integración para el servidor
//! tests/integration_test.rs
//!
//! Cada test levanta su propio servidor en un puerto efímero dentro del
//! proceso y lo detiene al final.

use conn_server::config::{Config, ShutdownMode};
use conn_server::server::{Server, ServerError, StopHandle};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const FIXED_RESPONSE: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 12\r\n\r\nHello World!";

struct RunningServer {
    port: u16,
    stop: StopHandle,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    /// Detiene el servidor y retorna cuánto tardó `serve` en salir
    fn stop(self) -> Duration {
        let start = Instant::now();
        self.stop.stop();
        self.handle
            .join()
            .expect("serve thread panicked")
            .expect("serve failed");
        start.elapsed()
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.workers = Some(4);
    config.accept_poll_ms = 50;
    config
}

fn start_server(config: Config) -> RunningServer {
    let mut server = Server::new(config);
    let port = server.bind().expect("bind failed");
    let stop = server.stop_handle();
    let handle = thread::spawn(move || server.serve());
    RunningServer { port, stop, handle }
}

/// Helper: envía bytes y retorna la response completa
fn send_request(port: u16, request: &[u8]) -> Result<String, Box<dyn std::error::Error>> {
    let mut stream = TcpStream::connect(("127.0.0.1", port))?;
    stream.set_read_timeout(Some(Duration::from_secs(15)))?;
    stream.set_write_timeout(Some(Duration::from_secs(5)))?;

    stream.write_all(request)?;
    stream.flush()?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    Ok(response)
}

#[test]
fn test_fixed_response() {
    let server = start_server(test_config());

    let response = send_request(server.port, b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .expect("Failed to send request");
    assert_eq!(response, FIXED_RESPONSE);

    server.stop();
}

#[test]
fn test_any_bytes_get_same_response() {
    let server = start_server(test_config());

    for request in [&b"not http at all"[..], b"\x00\x01\x02", b"POST /x HTTP/1.0\r\n\r\nbody"] {
        let response = send_request(server.port, request).expect("Failed to send request");
        assert_eq!(response, FIXED_RESPONSE);
    }

    server.stop();
}

#[test]
fn test_request_larger_than_chunk() {
    let server = start_server(test_config());

    let request = vec![b'z'; 5000];
    let response = send_request(server.port, &request).expect("Failed to send request");
    assert_eq!(response, FIXED_RESPONSE);

    server.stop();
}

#[test]
fn test_concurrent_clients() {
    let server = start_server(test_config());
    let port = server.port;

    let clients: Vec<_> = (0..16)
        .map(|i| {
            thread::spawn(move || {
                send_request(port, format!("GET /{} HTTP/1.1\r\n\r\n", i).as_bytes())
                    .expect("Failed to send request")
            })
        })
        .collect();

    for client in clients {
        assert_eq!(client.join().unwrap(), FIXED_RESPONSE);
    }

    server.stop();
}

#[test]
fn test_silent_client_gets_response_after_timeout() {
    let mut config = test_config();
    config.read_timeout_secs = 1;
    let server = start_server(config);

    let mut stream = TcpStream::connect(("127.0.0.1", server.port)).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let start = Instant::now();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    assert!(start.elapsed() >= Duration::from_millis(900));
    assert_eq!(response, FIXED_RESPONSE);

    server.stop();
}

#[test]
fn test_slow_client_does_not_block_others() {
    let mut config = test_config();
    config.read_timeout_secs = 2;
    let server = start_server(config);

    // Ocupa un worker sin enviar nada
    let _idle = TcpStream::connect(("127.0.0.1", server.port)).unwrap();
    thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    let response = send_request(server.port, b"ping").expect("Failed to send request");
    assert_eq!(response, FIXED_RESPONSE);
    assert!(start.elapsed() < Duration::from_secs(1));

    server.stop();
}

#[test]
fn test_graceful_shutdown_waits_for_connections() {
    let mut config = test_config();
    config.read_timeout_secs = 1;
    config.shutdown = ShutdownMode::Graceful;
    let server = start_server(config);

    let _idle = TcpStream::connect(("127.0.0.1", server.port)).unwrap();
    thread::sleep(Duration::from_millis(200));

    // El worker sigue esperando el timeout de lectura
    let elapsed = server.stop();
    assert!(elapsed >= Duration::from_millis(500), "took {:?}", elapsed);
}

#[test]
fn test_abrupt_shutdown_returns_immediately() {
    let mut config = test_config();
    config.read_timeout_secs = 5;
    config.shutdown = ShutdownMode::Abrupt;
    let server = start_server(config);

    let _idle = TcpStream::connect(("127.0.0.1", server.port)).unwrap();
    thread::sleep(Duration::from_millis(200));

    let elapsed = server.stop();
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
}
