//! # Forma de un Request HTTP
//! src/http/request.rs
//!
//! Modelo de datos inerte: métodos, versiones y la forma de un request.
//! El servidor no parsea ni serializa requests; el loop de conexión solo
//! acumula los bytes crudos.

use std::collections::HashMap;

/// Métodos HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    Options,
    Get,
    Head,
    Post,
    Put,
    Delete,
    Trace,
    Connect,
    Patch,
    Link,
    Unlink,
    #[default]
    NotImplemented,
}

impl Method {
    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
            Method::Patch => "PATCH",
            Method::Link => "LINK",
            Method::Unlink => "UNLINK",
            Method::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

/// Versiones del protocolo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    Http10,
    Http11,
    Http20,
    Http30,
    #[default]
    NotImplemented,
}

impl Version {
    /// Texto usado en la status line
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
            Version::Http20 => "HTTP/2.0",
            Version::Http30 => "HTTP/3.0",
            Version::NotImplemented => "HTTP/?",
        }
    }
}

/// Forma de un request HTTP (nunca se llena desde la red)
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: Method,
    pub version: Version,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_is_unpopulated() {
        let request = HttpRequest::default();
        assert_eq!(request.method, Method::NotImplemented);
        assert_eq!(request.version, Version::NotImplemented);
        assert!(request.path.is_empty());
        assert!(request.headers.is_empty());
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Unlink.as_str(), "UNLINK");
    }

    #[test]
    fn test_version_names() {
        assert_eq!(Version::Http11.as_str(), "HTTP/1.1");
        assert_eq!(Version::Http10.as_str(), "HTTP/1.0");
    }
}
