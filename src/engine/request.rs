use http::header::HeaderName;
use http::HeaderMap;

static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// The parts of an inbound request the session engine looks at.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    headers: HeaderMap,
    /// Whether the connection itself is TLS.
    tls: bool,
}

impl RequestContext {
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers, tls: false }
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Builds a context from an `http::Request`. The connection counts as TLS when the
    /// request URI carries the `https` scheme.
    pub fn from_request<B>(request: &http::Request<B>) -> Self {
        let tls = request.uri().scheme_str() == Some("https");
        Self::new(request.headers().clone()).with_tls(tls)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Transport security of the request. With `proxy == Some(true)` the first value of
    /// `X-Forwarded-Proto` decides; otherwise only the connection counts.
    pub fn is_secure(&self, proxy: Option<bool>) -> bool {
        if self.tls {
            return true;
        }
        if proxy != Some(true) {
            return false;
        }

        self.headers
            .get(&X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
    }
}
