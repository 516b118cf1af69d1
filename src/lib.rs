//! # Connection Server
//! src/lib.rs
//!
//! Servidor TCP concurrente construido sobre sockets POSIX crudos y un pool
//! de workers de tamaño fijo. Cada conexión se lee en bloques con timeout y
//! recibe una respuesta HTTP fija.
//!
//! ## Arquitectura
//!
//! - `net`: Wrapper de sockets (stream, datagrama, Unix) y multiplexado de readiness
//! - `pool`: Pool de workers con cola FIFO, drenado o abandono al apagar
//! - `server`: Loop de accept y manejo de conexiones
//! - `http`: Formas inertes de request/response y la respuesta fija
//! - `config`: Argumentos CLI y variables de entorno
//! - `metrics`: Contadores y latencias de conexiones
//! - `logging`: Subscriber de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use conn_server::config::Config;
//! use conn_server::server::Server;
//!
//! let mut server = Server::new(Config::default());
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod net;
pub mod pool;
pub mod server;
