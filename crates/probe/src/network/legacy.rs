//! Legacy request observer.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use conan_protocol::constants::DEFAULT_METHOD;
use conan_protocol::{Envelope, NetworkPayload, Value};

use crate::host::Globals;
use crate::serializer::ValueSerializer;
use crate::sink::MessageSink;
use crate::{lock, now_millis};

/// Errors raised by a legacy request object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Trailing arguments of `open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    pub asynchronous: bool,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            asynchronous: true,
            user: None,
            password: None,
        }
    }
}

/// Final state of a request, delivered to completion listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub status: u16,
    /// Timeout configured on the request, in milliseconds.
    pub timeout: u32,
    pub response: Value,
    pub response_url: String,
}

/// Called once a request finishes, successfully or not.
pub type CompletionListener = Box<dyn Fn(&Completion) + Send + Sync>;

/// Lifecycle surface of a legacy request object.
pub trait LegacyRequest: Send {
    fn open(&mut self, method: &str, url: &str, options: &OpenOptions) -> Result<(), RequestError>;
    fn set_request_header(&mut self, key: &str, value: &str) -> Result<(), RequestError>;
    fn send(&mut self, body: Option<Value>) -> Result<(), RequestError>;
    fn add_completion_listener(&mut self, listener: CompletionListener);
}

/// Creates legacy request objects.
pub trait RequestFactory: Send + Sync {
    fn create(&self) -> Box<dyn LegacyRequest>;
}

/// Per-request state, reset by every `open`.
#[derive(Debug, Clone)]
struct RequestContext {
    id: u64,
    method: String,
    url: String,
    headers: BTreeMap<String, Value>,
    body: Option<Value>,
}

impl RequestContext {
    fn open(method: &str, url: &str) -> Self {
        Self {
            id: now_millis(),
            method: if method.is_empty() {
                DEFAULT_METHOD.to_owned()
            } else {
                method.to_owned()
            },
            url: url.to_owned(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    fn payload(&self, completion: &Completion, serializer: &dyn ValueSerializer) -> NetworkPayload {
        NetworkPayload {
            id: Some(self.id),
            method: self.method.clone(),
            url: self.url.clone(),
            headers: Some(serializer.serialize(&Value::Object(self.headers.clone()))),
            body: self.body.clone(),
            status: Some(completion.status),
            timeout: Some(completion.timeout),
            res: Some(completion.response.clone()),
            res_url: Some(completion.response_url.clone()),
            ..NetworkPayload::default()
        }
    }
}

/// Legacy request decorator that reports completed requests.
///
/// Each `open` starts a new correlation scope; the completion listener is
/// attached once per object and always reads the current scope.
pub struct ObservedRequest {
    inner: Box<dyn LegacyRequest>,
    context: Arc<Mutex<Option<RequestContext>>>,
    listening: bool,
    sink: Arc<dyn MessageSink>,
    serializer: Arc<dyn ValueSerializer>,
}

impl ObservedRequest {
    pub fn new(
        inner: Box<dyn LegacyRequest>,
        sink: Arc<dyn MessageSink>,
        serializer: Arc<dyn ValueSerializer>,
    ) -> Self {
        Self {
            inner,
            context: Arc::new(Mutex::new(None)),
            listening: false,
            sink,
            serializer,
        }
    }

    fn listen(&mut self) {
        if self.listening {
            return;
        }
        self.listening = true;

        let context = Arc::clone(&self.context);
        let sink = Arc::clone(&self.sink);
        let serializer = Arc::clone(&self.serializer);
        self.inner
            .add_completion_listener(Box::new(move |completion: &Completion| {
                let payload = match lock(&context).as_ref() {
                    Some(ctx) => ctx.payload(completion, serializer.as_ref()),
                    None => return,
                };
                tracing::debug!(
                    id = ?payload.id,
                    status = completion.status,
                    "legacy request completed"
                );
                sink.send(Envelope::network(payload));
            }));
    }
}

impl LegacyRequest for ObservedRequest {
    fn open(&mut self, method: &str, url: &str, options: &OpenOptions) -> Result<(), RequestError> {
        *lock(&self.context) = Some(RequestContext::open(method, url));
        self.listen();
        self.inner.open(method, url, options)
    }

    fn set_request_header(&mut self, key: &str, value: &str) -> Result<(), RequestError> {
        match lock(&self.context).as_mut() {
            Some(ctx) => {
                ctx.headers.insert(key.to_owned(), Value::from(value));
            }
            None => tracing::debug!(key, "request header set before open"),
        }
        self.inner.set_request_header(key, value)
    }

    fn send(&mut self, body: Option<Value>) -> Result<(), RequestError> {
        match lock(&self.context).as_mut() {
            Some(ctx) => ctx.body = body.clone(),
            None => tracing::debug!("request sent before open"),
        }
        self.inner.send(body)
    }

    fn add_completion_listener(&mut self, listener: CompletionListener) {
        self.inner.add_completion_listener(listener);
    }
}

/// Request constructor that hands out [`ObservedRequest`]s.
pub struct ObservedRequestFactory {
    inner: Arc<dyn RequestFactory>,
    sink: Arc<dyn MessageSink>,
    serializer: Arc<dyn ValueSerializer>,
}

impl ObservedRequestFactory {
    pub fn new(
        inner: Arc<dyn RequestFactory>,
        sink: Arc<dyn MessageSink>,
        serializer: Arc<dyn ValueSerializer>,
    ) -> Self {
        Self {
            inner,
            sink,
            serializer,
        }
    }
}

impl RequestFactory for ObservedRequestFactory {
    fn create(&self) -> Box<dyn LegacyRequest> {
        Box::new(ObservedRequest::new(
            self.inner.create(),
            Arc::clone(&self.sink),
            Arc::clone(&self.serializer),
        ))
    }
}

/// Replaces the host's request constructor with an observed one.
///
/// Returns the replaced constructor, or `None` if the host has none.
pub fn install(
    globals: &mut Globals,
    sink: Arc<dyn MessageSink>,
    serializer: Arc<dyn ValueSerializer>,
) -> Option<Arc<dyn RequestFactory>> {
    let original = globals.requests.take()?;
    let observed = ObservedRequestFactory::new(Arc::clone(&original), sink, serializer);
    globals.requests = Some(Arc::new(observed));
    tracing::debug!("legacy request observer installed");
    Some(original)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::serializer::JsonSerializer;
    use crate::sink::MemorySink;
    use conan_protocol::MessageType;

    /// What the fake request object saw.
    #[derive(Default)]
    pub(crate) struct FakeState {
        pub(crate) opened: Vec<(String, String, OpenOptions)>,
        pub(crate) headers: Vec<(String, String)>,
        pub(crate) sent: Vec<Option<Value>>,
        pub(crate) listeners: Vec<CompletionListener>,
    }

    /// Request object that records calls and completes on demand.
    #[derive(Clone, Default)]
    pub(crate) struct FakeRequest {
        pub(crate) state: Arc<Mutex<FakeState>>,
    }

    impl FakeRequest {
        pub(crate) fn complete(&self, completion: &Completion) {
            let state = lock(&self.state);
            for listener in &state.listeners {
                listener(completion);
            }
        }
    }

    impl LegacyRequest for FakeRequest {
        fn open(
            &mut self,
            method: &str,
            url: &str,
            options: &OpenOptions,
        ) -> Result<(), RequestError> {
            lock(&self.state)
                .opened
                .push((method.into(), url.into(), options.clone()));
            Ok(())
        }

        fn set_request_header(&mut self, key: &str, value: &str) -> Result<(), RequestError> {
            let mut state = lock(&self.state);
            if state.opened.is_empty() {
                return Err(RequestError::InvalidState("not opened".into()));
            }
            state.headers.push((key.into(), value.into()));
            Ok(())
        }

        fn send(&mut self, body: Option<Value>) -> Result<(), RequestError> {
            lock(&self.state).sent.push(body);
            Ok(())
        }

        fn add_completion_listener(&mut self, listener: CompletionListener) {
            lock(&self.state).listeners.push(listener);
        }
    }

    fn completion(status: u16) -> Completion {
        Completion {
            status,
            timeout: 0,
            response: Value::from("{\"ok\":true}"),
            response_url: "https://example.com/api/items".into(),
        }
    }

    fn observed(fake: &FakeRequest, sink: &Arc<MemorySink>) -> ObservedRequest {
        ObservedRequest::new(
            Box::new(fake.clone()),
            sink.clone(),
            Arc::new(JsonSerializer),
        )
    }

    #[test]
    fn completed_request_emits_network_envelope() {
        let fake = FakeRequest::default();
        let sink = Arc::new(MemorySink::new());
        let mut req = observed(&fake, &sink);

        req.open("POST", "/api/items", &OpenOptions::default()).unwrap();
        req.set_request_header("Content-Type", "application/json")
            .unwrap();
        req.send(Some(Value::from("{\"name\":\"a\"}"))).unwrap();
        assert!(sink.is_empty());

        fake.complete(&completion(201));

        let sent = sink.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), MessageType::Network);
        let payload = sent[0].network_payload().unwrap();
        assert_eq!(payload.method, "POST");
        assert_eq!(payload.url, "/api/items");
        assert_eq!(payload.status, Some(201));
        assert_eq!(payload.timeout, Some(0));
        assert_eq!(payload.res, Some(Value::from("{\"ok\":true}")));
        assert_eq!(
            payload.res_url.as_deref(),
            Some("https://example.com/api/items")
        );
        assert_eq!(payload.body, Some(Value::from("{\"name\":\"a\"}")));
        assert!(payload.id.is_some());

        let headers: serde_json::Value =
            serde_json::from_str(payload.headers.as_deref().unwrap()).unwrap();
        assert_eq!(
            headers,
            serde_json::json!({"Content-Type": "application/json"})
        );
    }

    #[test]
    fn calls_are_delegated_unchanged() {
        let fake = FakeRequest::default();
        let sink = Arc::new(MemorySink::new());
        let mut req = observed(&fake, &sink);

        let options = OpenOptions {
            asynchronous: false,
            user: Some("u".into()),
            password: None,
        };
        req.open("PUT", "/x", &options).unwrap();
        req.set_request_header("A", "1").unwrap();
        req.send(None).unwrap();

        let state = lock(&fake.state);
        assert_eq!(
            state.opened,
            vec![("PUT".to_string(), "/x".to_string(), options)]
        );
        assert_eq!(state.headers, vec![("A".to_string(), "1".to_string())]);
        assert_eq!(state.sent, vec![None]);
    }

    #[test]
    fn later_headers_overwrite_earlier() {
        let fake = FakeRequest::default();
        let sink = Arc::new(MemorySink::new());
        let mut req = observed(&fake, &sink);

        req.open("GET", "/", &OpenOptions::default()).unwrap();
        req.set_request_header("X-Trace", "1").unwrap();
        req.set_request_header("X-Trace", "2").unwrap();
        fake.complete(&completion(200));

        let sent = sink.take();
        let headers: serde_json::Value =
            serde_json::from_str(sent[0].network_payload().unwrap().headers.as_deref().unwrap())
                .unwrap();
        assert_eq!(headers, serde_json::json!({"X-Trace": "2"}));
        // The original still saw both calls.
        assert_eq!(lock(&fake.state).headers.len(), 2);
    }

    #[test]
    fn empty_method_defaults_to_get() {
        let fake = FakeRequest::default();
        let sink = Arc::new(MemorySink::new());
        let mut req = observed(&fake, &sink);

        req.open("", "/", &OpenOptions::default()).unwrap();
        fake.complete(&completion(0));

        assert_eq!(sink.take()[0].network_payload().unwrap().method, "GET");
    }

    #[test]
    fn reopen_starts_new_scope_with_single_listener() {
        let fake = FakeRequest::default();
        let sink = Arc::new(MemorySink::new());
        let mut req = observed(&fake, &sink);

        req.open("GET", "/first", &OpenOptions::default()).unwrap();
        req.set_request_header("A", "1").unwrap();
        fake.complete(&completion(200));

        req.open("DELETE", "/second", &OpenOptions::default())
            .unwrap();
        fake.complete(&completion(204));

        assert_eq!(lock(&fake.state).listeners.len(), 1);
        let sent = sink.take();
        assert_eq!(sent.len(), 2);
        let second = sent[1].network_payload().unwrap();
        assert_eq!(second.method, "DELETE");
        assert_eq!(second.url, "/second");
        assert_eq!(second.headers.as_deref(), Some("{}"));
    }

    #[test]
    fn errors_from_original_propagate() {
        let fake = FakeRequest::default();
        let sink = Arc::new(MemorySink::new());
        let mut req = observed(&fake, &sink);

        // Header before open: the wrapper records nothing and returns the
        // original's error untouched.
        let err = req.set_request_header("A", "1").unwrap_err();
        assert_eq!(err, RequestError::InvalidState("not opened".into()));
        assert!(sink.is_empty());
    }

    #[test]
    fn user_listeners_still_fire() {
        let fake = FakeRequest::default();
        let sink = Arc::new(MemorySink::new());
        let mut req = observed(&fake, &sink);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        req.add_completion_listener(Box::new(move |c: &Completion| {
            lock(&seen2).push(c.status);
        }));
        req.open("GET", "/", &OpenOptions::default()).unwrap();
        fake.complete(&completion(404));

        assert_eq!(*lock(&seen), vec![404]);
        assert_eq!(sink.len(), 1);
    }

    struct FakeFactory {
        last: Mutex<Option<FakeRequest>>,
    }

    impl RequestFactory for FakeFactory {
        fn create(&self) -> Box<dyn LegacyRequest> {
            let fake = FakeRequest::default();
            *lock(&self.last) = Some(fake.clone());
            Box::new(fake)
        }
    }

    #[test]
    fn install_wraps_factory() {
        let factory = Arc::new(FakeFactory {
            last: Mutex::new(None),
        });
        let sink = Arc::new(MemorySink::new());
        let mut globals = Globals {
            requests: Some(factory.clone()),
            ..Globals::default()
        };

        let original = install(&mut globals, sink.clone(), Arc::new(JsonSerializer));
        assert!(original.is_some());

        let mut req = globals.requests.as_ref().unwrap().create();
        req.open("GET", "/ping", &OpenOptions::default()).unwrap();
        req.send(None).unwrap();

        let fake = lock(&factory.last).clone().unwrap();
        fake.complete(&completion(200));
        assert_eq!(sink.take()[0].network_payload().unwrap().url, "/ping");
    }
}
