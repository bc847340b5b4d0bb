//! Classification of fetch call arguments.

use std::collections::BTreeMap;

use conan_protocol::constants::{BARE_URL_METHOD, DEFAULT_METHOD};
use conan_protocol::{NetworkPayload, Value};

use super::fetch::{FetchArg, Request};
use crate::serializer::ValueSerializer;

/// Shape of a fetch call, decided by its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchCall<'a> {
    /// A single request descriptor.
    Descriptor(&'a Request),
    /// A single URL-like value.
    BareUrl(&'a Value),
    /// A URL followed by an options object.
    UrlWithOptions { url: String, options: &'a Value },
    /// Any other arity.
    Unknown,
}

impl<'a> FetchCall<'a> {
    pub fn classify(args: &'a [FetchArg]) -> Self {
        match args {
            [FetchArg::Request(request)] => FetchCall::Descriptor(request),
            [FetchArg::Value(url)] => FetchCall::BareUrl(url),
            [target, FetchArg::Value(options)] => FetchCall::UrlWithOptions {
                url: match target {
                    FetchArg::Request(request) => request.url.clone(),
                    FetchArg::Value(url) => url.to_string(),
                },
                options,
            },
            _ => FetchCall::Unknown,
        }
    }

    /// Payload fields known before the call settles.
    pub fn payload(&self, serializer: &dyn ValueSerializer) -> NetworkPayload {
        match self {
            FetchCall::Descriptor(request) => {
                let method = if request.method.is_empty() {
                    DEFAULT_METHOD
                } else {
                    request.method.as_str()
                };
                let mut payload = NetworkPayload::new(method, request.url.clone());
                payload.headers = Some(serializer.serialize(&request.headers.to_value()));
                payload
            }
            FetchCall::BareUrl(url) => NetworkPayload::new(BARE_URL_METHOD, url.to_string()),
            FetchCall::UrlWithOptions { url, options } => merge_options(url, options, serializer),
            FetchCall::Unknown => NetworkPayload::new(DEFAULT_METHOD, String::new()),
        }
    }
}

/// Shallow-merges `options` over `{ url }`.
fn merge_options(url: &str, options: &Value, serializer: &dyn ValueSerializer) -> NetworkPayload {
    let mut payload = NetworkPayload::new(DEFAULT_METHOD, url);
    let mut headers = Value::Object(BTreeMap::new());

    let fields = match options {
        Value::Object(map) => Some(map),
        Value::Instance(inst) => Some(&inst.fields),
        _ => None,
    };
    for (key, value) in fields.into_iter().flatten() {
        match key.as_str() {
            "url" => {
                if let Some(url) = text_of(value) {
                    payload.url = url;
                }
            }
            "method" => {
                if let Some(method) = text_of(value) {
                    payload.method = method;
                }
            }
            "headers" => headers = value.clone(),
            "body" => payload.body = Some(value.clone()),
            _ => {
                payload.extra.insert(key.clone(), value.clone());
            }
        }
    }

    payload.headers = Some(serializer.serialize(&headers));
    payload
}

/// String form of a set option; unset and empty options yield `None`.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Undefined | Value::Null => None,
        other => Some(other.to_string()).filter(|s| !s.is_empty()),
    }
}
