//! Request options for application API calls
//!
//! A session fills in defaults (method, `Authorization`), the caller
//! supplies its own options, and the two are merged key by key: a caller
//! value replaces the default for the same key, defaults fill every gap.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Options for one API call.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Overlay these options on `defaults`.
    pub fn merged_over(self, defaults: FetchOptions) -> FetchOptions {
        let mut headers = defaults.headers;
        for name in self.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in self.headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        FetchOptions {
            method: self.method.or(defaults.method),
            headers,
            body: self.body.or(defaults.body),
        }
    }

    /// Build a request for `url`. Method defaults to GET.
    pub(crate) fn into_request(self, client: &reqwest::Client, url: &str) -> reqwest::RequestBuilder {
        let mut request = client
            .request(self.method.unwrap_or(Method::GET), url)
            .headers(self.headers);
        if let Some(body) = self.body {
            request = request.body(body);
        }
        request
    }
}
