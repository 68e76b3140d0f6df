//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! `build_*` methods on `FeatureServiceClient` produce `HttpRequest` values
//! without touching the network; whoever executes them (a `Transport`, a test,
//! or a C host through the FFI crate) reports back an `Exchange`.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross FFI
//! boundaries without lifetime concerns.

/// Content type used for every POST body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request. Feature service operations only use GET and
/// POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Interpret a caller-supplied method name. `get` in any case is GET;
    /// every other name is treated as POST.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("get") {
            HttpMethod::Get
        } else {
            HttpMethod::Post
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
///
/// For GET the encoded parameters are already appended to `url`; for POST
/// they are in `body`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The outcome of executing one `HttpRequest`: a transport error, a
/// response, or (for transports that report both) the two together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exchange {
    pub transport_error: Option<String>,
    pub response: Option<HttpResponse>,
}

impl Exchange {
    pub fn completed(response: HttpResponse) -> Self {
        Self {
            transport_error: None,
            response: Some(response),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            transport_error: Some(error.into()),
            response: None,
        }
    }

    /// The response body, if a response arrived.
    pub fn body(&self) -> Option<&str> {
        self.response.as_ref().map(|r| r.body.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_are_case_insensitive() {
        assert_eq!(HttpMethod::from_name("get"), HttpMethod::Get);
        assert_eq!(HttpMethod::from_name("GET"), HttpMethod::Get);
        assert_eq!(HttpMethod::from_name("post"), HttpMethod::Post);
        assert_eq!(HttpMethod::from_name("Post"), HttpMethod::Post);
    }

    #[test]
    fn unknown_method_names_mean_post() {
        assert_eq!(HttpMethod::from_name("put"), HttpMethod::Post);
        assert_eq!(HttpMethod::from_name(""), HttpMethod::Post);
    }

    #[test]
    fn failed_exchange_has_no_body() {
        let exchange = Exchange::failed("ECONNRESET");
        assert_eq!(exchange.transport_error.as_deref(), Some("ECONNRESET"));
        assert!(exchange.body().is_none());
    }
}
