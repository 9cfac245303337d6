// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! RBAC admission middleware.
//!
//! [`AdmissionLayer`] resolves each request under its protected path prefix
//! into [`RequestAttributes`](warden_rbac_core::RequestAttributes) and asks the
//! [`Authorizer`] for a decision.
//!
//! - Permitted requests reach the inner service unchanged.
//! - Denied requests get `403 Forbidden` with a `WWW-Authenticate:
//!   Forbidden,<reason>` header.
//! - Requests whose policy could not be evaluated get `500`.
//! - Requests without an identity pass through; rejecting anonymous callers is
//!   the authentication layer's job.
//!
//! # Example
//!
//! ```ignore
//! Router::new()
//!     .fallback(forward_auth)
//!     .layer(AdmissionLayer::new(authorizer).except(["/public"]));
//! ```

use std::{
	future::Future,
	pin::Pin,
	sync::Arc,
	task::{Context, Poll},
};

use axum::{
	body::Body,
	http::{header, HeaderValue, Method, Request, StatusCode, Uri},
	response::{IntoResponse, Response},
	Json,
};
use pin_project_lite::pin_project;
use tower::{Layer, Service};
use tracing::{debug, info, warn};
use warden_rbac_core::{Authorizer, Decision, Denial};
use warden_server_config::AdmissionConfig;

use crate::error::{ErrorResponse, ServerError};
use crate::identity::{identity_of, IdentityHeaders};
use crate::request_info::{self, RequestInfoError};

pub const FORWARDED_METHOD_HEADER: &str = "x-forwarded-method";
pub const FORWARDED_URI_HEADER: &str = "x-forwarded-uri";

#[derive(Clone)]
struct AdmissionPolicy {
	authorizer: Authorizer,
	path: String,
	except: Vec<String>,
	identity_headers: Option<IdentityHeaders>,
	trust_forwarded_headers: bool,
}

/// Layer that admits or rejects requests by RBAC policy.
#[derive(Clone)]
pub struct AdmissionLayer {
	policy: Arc<AdmissionPolicy>,
}

impl AdmissionLayer {
	/// Guards every path. Identity is only read from request extensions.
	pub fn new(authorizer: Authorizer) -> Self {
		Self {
			policy: Arc::new(AdmissionPolicy {
				authorizer,
				path: "/".to_string(),
				except: Vec::new(),
				identity_headers: None,
				trust_forwarded_headers: false,
			}),
		}
	}

	pub fn from_config(
		authorizer: Authorizer,
		config: &AdmissionConfig,
	) -> Result<Self, ServerError> {
		let identity_headers = IdentityHeaders::from_config(config)?;

		Ok(Self::new(authorizer)
			.path(config.path.clone())
			.except(config.except.iter().cloned())
			.identity_headers(identity_headers)
			.trust_forwarded_headers(config.trust_forwarded_headers))
	}

	/// Only paths starting with `prefix` are checked.
	pub fn path(mut self, prefix: impl Into<String>) -> Self {
		Arc::make_mut(&mut self.policy).path = prefix.into();
		self
	}

	/// Paths starting with any of `prefixes` are never checked.
	pub fn except<I, S>(mut self, prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Arc::make_mut(&mut self.policy).except = prefixes.into_iter().map(Into::into).collect();
		self
	}

	/// Falls back to these headers when no [`Identity`](crate::identity::Identity)
	/// extension is present.
	pub fn identity_headers(mut self, headers: Option<IdentityHeaders>) -> Self {
		Arc::make_mut(&mut self.policy).identity_headers = headers;
		self
	}

	/// Check the method and URI named by `X-Forwarded-Method` and
	/// `X-Forwarded-Uri` instead of the request's own.
	pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
		Arc::make_mut(&mut self.policy).trust_forwarded_headers = trust;
		self
	}
}

impl<S> Layer<S> for AdmissionLayer {
	type Service = AdmissionService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		AdmissionService {
			inner,
			policy: self.policy.clone(),
		}
	}
}

/// Service wrapper for [`AdmissionLayer`].
#[derive(Clone)]
pub struct AdmissionService<S> {
	inner: S,
	policy: Arc<AdmissionPolicy>,
}

impl<S> Service<Request<Body>> for AdmissionService<S>
where
	S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
	S::Future: Send,
{
	type Response = Response;
	type Error = S::Error;
	type Future = AdmissionFuture<S::Future>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		if let Some(resp) = self.policy.check(&req) {
			return AdmissionFuture::Rejected { resp: Some(resp) };
		}

		AdmissionFuture::Inner {
			fut: self.inner.call(req),
		}
	}
}

pin_project! {
	/// Future for [`AdmissionService`].
	#[project = AdmissionFutureProj]
	pub enum AdmissionFuture<F> {
		Inner { #[pin] fut: F },
		Rejected { resp: Option<Response> },
	}
}

impl<F, E> Future for AdmissionFuture<F>
where
	F: Future<Output = Result<Response, E>>,
{
	type Output = Result<Response, E>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match self.project() {
			AdmissionFutureProj::Inner { fut } => fut.poll(cx),
			AdmissionFutureProj::Rejected { resp } => {
				Poll::Ready(Ok(resp.take().expect("polled after completion")))
			}
		}
	}
}

struct Target {
	method: Method,
	path: String,
	query: Option<String>,
}

impl AdmissionPolicy {
	/// Returns the rejection response, or `None` to let the request through.
	fn check(&self, req: &Request<Body>) -> Option<Response> {
		let target = self.target(req);
		let path = match request_info::decode_path(&target.path) {
			Ok(path) => path,
			Err(e) => {
				info!(error = %e, "admission rejected undecodable path");
				return Some(bad_request_response(&e));
			}
		};

		if !path_matches(&path, &self.path)
			|| self.except.iter().any(|prefix| path_matches(&path, prefix))
		{
			return None;
		}

		let Some(identity) = identity_of(req, self.identity_headers.as_ref()) else {
			debug!(path = %path, "no identity on request, skipping admission");
			return None;
		};

		let resolved = request_info::resolve(&target.method, &path, target.query.as_deref());
		let info = match resolved {
			Ok(info) => info,
			Err(e) => {
				info!(user = %identity.user, error = %e, "admission rejected unresolvable request");
				return Some(bad_request_response(&e));
			}
		};

		match self.authorizer.authorize(&info.into_attributes(identity)) {
			Decision::Permit => None,
			Decision::Deny(denial) => Some(forbidden_response(&denial)),
			Decision::EvaluationError(_) => Some(evaluation_error_response()),
		}
	}

	fn target(&self, req: &Request<Body>) -> Target {
		let mut target = Target {
			method: req.method().clone(),
			path: req.uri().path().to_string(),
			query: req.uri().query().map(str::to_string),
		};

		if !self.trust_forwarded_headers {
			return target;
		}

		if let Some(method) = header_str(req, FORWARDED_METHOD_HEADER)
			.and_then(|m| Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes()).ok())
		{
			target.method = method;
		}
		if let Some(uri) = header_str(req, FORWARDED_URI_HEADER).and_then(|u| u.parse::<Uri>().ok()) {
			target.path = uri.path().to_string();
			target.query = uri.query().map(str::to_string);
		}
		target
	}
}

fn header_str<'a>(req: &'a Request<Body>, name: &str) -> Option<&'a str> {
	req.headers().get(name)?.to_str().ok()
}

/// Plain string prefix match; `/` and the empty prefix match everything.
fn path_matches(path: &str, prefix: &str) -> bool {
	prefix.is_empty() || prefix == "/" || path.starts_with(prefix)
}

pub(crate) fn forbidden_response(denial: &Denial) -> Response {
	let message = denial.to_string();
	let challenge = HeaderValue::from_str(&format!("Forbidden,{message}"));

	let mut resp = (
		StatusCode::FORBIDDEN,
		Json(ErrorResponse::new("forbidden", message)),
	)
		.into_response();

	match challenge {
		Ok(value) => {
			resp.headers_mut().insert(header::WWW_AUTHENTICATE, value);
		}
		Err(e) => warn!(error = %e, "denial reason is not a valid header value"),
	}
	resp
}

pub(crate) fn evaluation_error_response() -> Response {
	(
		StatusCode::INTERNAL_SERVER_ERROR,
		Json(ErrorResponse::new(
			"internal_error",
			"Authorization could not be evaluated",
		)),
	)
		.into_response()
}

fn bad_request_response(err: &RequestInfoError) -> Response {
	(
		StatusCode::BAD_REQUEST,
		Json(ErrorResponse::new("bad_request", err.to_string())),
	)
		.into_response()
}
