//! Fetch-style request observer.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use conan_protocol::constants::DEFAULT_METHOD;
use conan_protocol::{Envelope, Value};

use super::call::FetchCall;
use crate::host::Globals;
use crate::serializer::ValueSerializer;
use crate::sink::MessageSink;

/// Failure of a fetch call, surfaced to the caller unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Network(String),

    #[error("The user aborted a request.")]
    Aborted,

    #[error("{0}")]
    InvalidArgument(String),
}

/// Ordered header list with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, keeping existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces all values for `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.entries.push((name, value.into()));
    }

    /// All values for `name`, joined by `", "`.
    pub fn get(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect();
        (!values.is_empty()).then(|| values.join(", "))
    }

    /// Distinct header names in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (name, _) in &self.entries {
            if !keys.iter().any(|k| k.eq_ignore_ascii_case(name)) {
                keys.push(name);
            }
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain object built by enumerating the header names.
    pub fn to_value(&self) -> Value {
        let map: BTreeMap<String, Value> = self
            .keys()
            .into_iter()
            .filter_map(|key| self.get(key).map(|v| (key.to_owned(), Value::from(v))))
            .collect();
        Value::Object(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

/// Request descriptor accepted by fetch in place of a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: DEFAULT_METHOD.to_owned(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Settled fetch result.
///
/// The body is shared between clones, so reading it through one handle
/// leaves every other handle readable.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    url: String,
    headers: Headers,
    body: Arc<[u8]>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body: Vec<u8> = body.into();
        Self {
            status,
            url: String::new(),
            headers: Headers::new(),
            body: Arc::from(body),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice::<serde_json::Value>(&self.body).map(Value::from)
    }
}

/// One argument of a fetch call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchArg {
    Request(Request),
    Value(Value),
}

impl From<Request> for FetchArg {
    fn from(request: Request) -> Self {
        FetchArg::Request(request)
    }
}

impl From<Value> for FetchArg {
    fn from(value: Value) -> Self {
        FetchArg::Value(value)
    }
}

impl From<&str> for FetchArg {
    fn from(url: &str) -> Self {
        FetchArg::Value(Value::from(url))
    }
}

/// The host's fetch-style function.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, args: Vec<FetchArg>) -> Result<Response, FetchError>;
}

/// Fetch decorator that reports every settled call.
///
/// The caller receives exactly what the wrapped fetch returned: the same
/// response on success, the same error on failure.
pub struct ObservedFetch {
    inner: Arc<dyn Fetch>,
    sink: Arc<dyn MessageSink>,
    serializer: Arc<dyn ValueSerializer>,
}

impl ObservedFetch {
    pub fn new(
        inner: Arc<dyn Fetch>,
        sink: Arc<dyn MessageSink>,
        serializer: Arc<dyn ValueSerializer>,
    ) -> Self {
        Self {
            inner,
            sink,
            serializer,
        }
    }

    /// Serialized JSON body, or the raw text if it is not JSON.
    fn read_body(&self, response: &Response) -> String {
        match response.json() {
            Ok(data) => self.serializer.serialize(&data),
            Err(e) => {
                tracing::warn!(error = %e, url = response.url(), "fetch response is not JSON");
                response.text()
            }
        }
    }
}

#[async_trait]
impl Fetch for ObservedFetch {
    async fn fetch(&self, args: Vec<FetchArg>) -> Result<Response, FetchError> {
        let mut payload = FetchCall::classify(&args).payload(self.serializer.as_ref());

        match self.inner.fetch(args).await {
            Ok(response) => {
                payload.status = Some(response.status());
                payload.res = Some(Value::String(self.read_body(&response)));
                tracing::debug!(url = %payload.url, status = response.status(), "fetch settled");
                self.sink.send(Envelope::network(payload));
                Ok(response)
            }
            Err(err) => {
                payload.error = Some(err.to_string());
                tracing::debug!(url = %payload.url, error = %err, "fetch failed");
                self.sink.send(Envelope::network(payload));
                Err(err)
            }
        }
    }
}

/// Replaces the host's fetch with an observed one.
///
/// Requires both the fetch function and the request-descriptor constructor.
/// Returns the replaced function, or `None` when the host lacks either and
/// nothing was installed.
pub fn install(
    globals: &mut Globals,
    sink: Arc<dyn MessageSink>,
    serializer: Arc<dyn ValueSerializer>,
) -> Option<Arc<dyn Fetch>> {
    if !globals.request_constructor {
        tracing::debug!("request constructor unavailable, fetch observer not installed");
        return None;
    }
    let Some(original) = globals.fetch.take() else {
        tracing::debug!("fetch unavailable, fetch observer not installed");
        return None;
    };
    let observed = ObservedFetch::new(Arc::clone(&original), sink, serializer);
    globals.fetch = Some(Arc::new(observed));
    tracing::debug!("fetch observer installed");
    Some(original)
}
