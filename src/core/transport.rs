//! HTTP transport underneath the fetch gateway.
//!
//! [`Transport`] is the only place a request leaves the process. The browser
//! build uses [`BrowserTransport`] (gloo-net over the Fetch API); tests drive
//! the gateway with [`mock::MockTransport`].

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use gloo_net::http::{Method as GlooMethod, RequestBuilder};
use js_sys::{Array, Uint8Array};
use wasm_bindgen::JsValue;
use web_sys::{Blob, BlobPropertyBag, FormData};

use crate::core::error::ApiError;

/// HTTP methods used by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// One part of a multipart form.
#[derive(Clone, Debug, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// Opaque multipart payload. The gateway never sets a content type for it;
/// the browser adds the boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Build the browser `FormData` for this payload.
    pub fn to_form_data(&self) -> Result<FormData, ApiError> {
        let form = FormData::new().map_err(js_error)?;
        for part in &self.parts {
            match part {
                FormPart::Text { name, value } => {
                    form.append_with_str(name, value).map_err(js_error)?;
                }
                FormPart::File {
                    name,
                    filename,
                    content_type,
                    bytes,
                } => {
                    let chunks = Array::of1(&Uint8Array::from(bytes.as_slice()));
                    let options = BlobPropertyBag::new();
                    options.set_type(content_type);
                    let blob = Blob::new_with_u8_array_sequence_and_options(&chunks, &options)
                        .map_err(js_error)?;
                    form.append_with_blob_and_filename(name, &blob, filename)
                        .map_err(js_error)?;
                }
            }
        }
        Ok(form)
    }
}

/// Request body as handed to the transport.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Serialized JSON text.
    Json(String),
    Multipart(MultipartForm),
}

/// A fully prepared request: absolute URL, headers, encoded body.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response: status line and body text.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends prepared requests.
///
/// Implementations resolve with any HTTP response (including non-2xx) and
/// reject only when no response was received.
pub trait Transport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'static, Result<HttpResponse, ApiError>>;
}

fn js_error(value: JsValue) -> ApiError {
    ApiError::Transport(
        value
            .as_string()
            .unwrap_or_else(|| format!("{:?}", value)),
    )
}

fn gloo_error(err: gloo_net::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

// =============================================================================
// Browser Transport
// =============================================================================

/// Fetch API transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserTransport;

impl Transport for BrowserTransport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'static, Result<HttpResponse, ApiError>> {
        async move {
            let method = match request.method {
                Method::Get => GlooMethod::GET,
                Method::Post => GlooMethod::POST,
                Method::Put => GlooMethod::PUT,
                Method::Delete => GlooMethod::DELETE,
            };
            let mut builder = RequestBuilder::new(&request.url).method(method);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let prepared = match request.body {
                RequestBody::Empty => builder.build(),
                RequestBody::Json(text) => builder.body(text),
                RequestBody::Multipart(form) => builder.body(form.to_form_data()?),
            }
            .map_err(gloo_error)?;

            let response = prepared.send().await.map_err(gloo_error)?;
            let body = response.text().await.map_err(gloo_error)?;
            Ok(HttpResponse {
                status: response.status(),
                status_text: response.status_text(),
                body,
            })
        }
        .boxed_local()
    }
}

// =============================================================================
// Mock Transport
// =============================================================================

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    //! Scripted transport for tests.

    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures::FutureExt;
    use futures::channel::oneshot;
    use futures::future::LocalBoxFuture;
    use serde_json::Value;

    use super::{HttpRequest, HttpResponse, Method, Transport};
    use crate::core::error::ApiError;

    struct Reply {
        outcome: Result<HttpResponse, String>,
        gate: Option<oneshot::Receiver<()>>,
    }

    /// Replies are registered per `(method, url)`. Queued replies are consumed
    /// in order and the last one repeats. Unscripted requests get a 404.
    ///
    /// Every reply yields to the executor once before completing, so callers
    /// started in the same tick overlap the way real requests do.
    #[derive(Default)]
    pub struct MockTransport {
        routes: RefCell<HashMap<(Method, String), VecDeque<Reply>>>,
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn push(&self, method: Method, url: &str, reply: Reply) {
            self.routes
                .borrow_mut()
                .entry((method, url.to_string()))
                .or_default()
                .push_back(reply);
        }

        pub fn respond(&self, method: Method, url: &str, response: HttpResponse) {
            self.push(
                method,
                url,
                Reply {
                    outcome: Ok(response),
                    gate: None,
                },
            );
        }

        pub fn respond_json(&self, method: Method, url: &str, status: u16, body: Value) {
            self.respond(method, url, HttpResponse::new(status, "", body.to_string()));
        }

        /// Reply that completes only after the returned sender fires (or is dropped).
        pub fn respond_gated(
            &self,
            method: Method,
            url: &str,
            response: HttpResponse,
        ) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.push(
                method,
                url,
                Reply {
                    outcome: Ok(response),
                    gate: Some(rx),
                },
            );
            tx
        }

        /// Reply with a transport failure.
        pub fn fail(&self, method: Method, url: &str, message: &str) {
            self.push(
                method,
                url,
                Reply {
                    outcome: Err(message.to_string()),
                    gate: None,
                },
            );
        }

        /// Every request sent so far, in order.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.borrow().clone()
        }

        /// Number of requests sent to `url` with `method`.
        pub fn calls(&self, method: Method, url: &str) -> usize {
            self.requests
                .borrow()
                .iter()
                .filter(|r| r.method == method && r.url == url)
                .count()
        }

        pub fn total_calls(&self) -> usize {
            self.requests.borrow().len()
        }

        fn next_reply(
            &self,
            method: Method,
            url: &str,
        ) -> (Result<HttpResponse, String>, Option<oneshot::Receiver<()>>) {
            let mut routes = self.routes.borrow_mut();
            let Some(queue) = routes.get_mut(&(method, url.to_string())) else {
                return (Ok(HttpResponse::new(404, "Not Found", "")), None);
            };
            if queue.len() > 1 {
                if let Some(reply) = queue.pop_front() {
                    return (reply.outcome, reply.gate);
                }
            }
            match queue.front_mut() {
                Some(reply) => (reply.outcome.clone(), reply.gate.take()),
                None => (Ok(HttpResponse::new(404, "Not Found", "")), None),
            }
        }
    }

    impl Transport for MockTransport {
        fn send(
            &self,
            request: HttpRequest,
        ) -> LocalBoxFuture<'static, Result<HttpResponse, ApiError>> {
            let (outcome, gate) = self.next_reply(request.method, &request.url);
            self.requests.borrow_mut().push(request);
            async move {
                YieldOnce(false).await;
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                outcome.map_err(ApiError::Transport)
            }
            .boxed_local()
        }
    }

    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }
}
