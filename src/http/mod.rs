//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Formas de datos HTTP. No hay parsing: el loop de conexión lee bytes
//! crudos y responde siempre con la misma respuesta fija.

pub mod request;   // Métodos, versiones y forma del request
pub mod response;  // Builder de la respuesta fija
pub mod status;    // Códigos de estado

pub use request::{HttpRequest, Method, Version};
pub use response::Response;
pub use status::StatusCode;
