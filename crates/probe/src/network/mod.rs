//! Network observers.
//!
//! Two request APIs are covered: the legacy request object
//! (`open`/`setRequestHeader`/`send` plus a completion event) and the
//! fetch-style function. Both report every settled request as a `NetWork`
//! envelope.

mod call;
mod fetch;
mod legacy;

pub use call::FetchCall;
pub use fetch::{
    Fetch, FetchArg, FetchError, Headers, ObservedFetch, Request, Response,
    install as install_fetch,
};
pub use legacy::{
    Completion, CompletionListener, LegacyRequest, ObservedRequest, ObservedRequestFactory,
    OpenOptions, RequestError, RequestFactory, install as install_requests,
};
