//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Builder mínimo para renderizar la respuesta fija del servidor. Los
//! headers conservan el orden de inserción para que los bytes enviados
//! sean deterministas.
//!
//! ## Respuesta fija
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 12\r\n
//! \r\n
//! Hello World!
//! ```

use super::{StatusCode, Version};

/// Una respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    version: Version,
    status: StatusCode,
    /// Headers en orden de inserción
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta HTTP/1.1 sin headers ni body
    ///
    /// # Ejemplo
    /// ```
    /// use conn_server::http::{Response, StatusCode};
    ///
    /// let response = Response::new(StatusCode::Ok);
    /// assert!(response.body().is_empty());
    /// ```
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: Version::Http11,
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// La respuesta que se envía a cada conexión
    pub fn hello_world() -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "text/html")
            .with_body("Hello World!")
    }

    /// Agrega un header; si ya existe se sobrescribe en su posición
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Establece el body y su `Content-Length`
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        let len = self.body.len().to_string();
        self.set_header("Content-Length", &len);
        self
    }

    /// Convierte la respuesta a bytes listos para el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::new();
        result.extend_from_slice(format!("{} {}\r\n", self.version.as_str(), self.status).as_bytes());
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);
        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }
}
