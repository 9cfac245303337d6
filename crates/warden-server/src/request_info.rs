// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Derives Kubernetes-style request attributes from an HTTP method and URI.
//!
//! Paths under `/api` and `/apis` are resource requests:
//!
//! ```text
//! /api/{version}/namespaces/{namespace}/{resource}/{name}/{subresource}
//! /apis/{group}/{version}/{resource}/{name}
//! /apis/{group}/{version}/watch/namespaces/{namespace}/{resource}
//! ```
//!
//! Everything else is a non-resource request against the literal path.
//! Callers percent-decode the path with [`decode_path`] before resolving it.

use std::borrow::Cow;

use axum::http::Method;
use thiserror::Error;
use warden_rbac_core::RequestAttributes;

use crate::identity::Identity;

const API_PREFIXES: [&str; 2] = ["api", "apis"];
const GROUPLESS_API_PREFIX: &str = "api";
const SPECIAL_VERBS: [&str; 2] = ["proxy", "watch"];
const NAMESPACE_SUBRESOURCES: [&str; 2] = ["status", "finalize"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestInfoError {
	#[error("unable to determine kind and namespace from url {path}")]
	Incomplete { path: String },

	#[error("url path {path} is not valid percent-encoded UTF-8")]
	InvalidEncoding { path: String },
}

/// What a request targets, before any identity is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
	pub is_resource_request: bool,
	pub path: String,
	pub verb: String,
	pub api_group: String,
	pub api_version: String,
	pub namespace: String,
	pub resource: String,
	pub subresource: String,
	pub name: String,
}

impl RequestInfo {
	fn non_resource(method: &Method, path: &str) -> Self {
		Self {
			is_resource_request: false,
			path: path.to_string(),
			verb: method.as_str().to_lowercase(),
			..Default::default()
		}
	}

	/// Attaches the caller's identity.
	pub fn into_attributes(self, identity: Identity) -> RequestAttributes {
		RequestAttributes {
			user: identity.user,
			groups: identity.groups,
			verb: self.verb,
			is_resource_request: self.is_resource_request,
			api_group: self.api_group,
			resource: self.resource,
			subresource: self.subresource,
			resource_name: self.name,
			namespace: self.namespace,
			path: self.path,
		}
	}
}

/// Percent-decodes a raw URI path.
pub fn decode_path(path: &str) -> Result<Cow<'_, str>, RequestInfoError> {
	urlencoding::decode(path).map_err(|_| RequestInfoError::InvalidEncoding {
		path: path.to_string(),
	})
}

/// Resolves the request info for `method` on a decoded `path` with an optional
/// raw query.
pub fn resolve(
	method: &Method,
	path: &str,
	query: Option<&str>,
) -> Result<RequestInfo, RequestInfoError> {
	let mut info = RequestInfo::non_resource(method, path);

	let segments = split_path(path);
	if segments.len() < 3 || !API_PREFIXES.contains(&segments[0]) {
		return Ok(info);
	}

	let prefix = segments[0];
	let mut parts = &segments[1..];

	if prefix != GROUPLESS_API_PREFIX {
		if parts.len() < 3 {
			return Ok(info);
		}
		info.api_group = parts[0].to_string();
		parts = &parts[1..];
	}

	info.is_resource_request = true;
	info.api_version = parts[0].to_string();
	parts = &parts[1..];

	if SPECIAL_VERBS.contains(&parts[0]) {
		if parts.len() < 2 {
			return Err(RequestInfoError::Incomplete {
				path: path.to_string(),
			});
		}
		info.verb = parts[0].to_string();
		parts = &parts[1..];
	} else {
		info.verb = verb_for_method(method).to_string();
	}

	if parts[0] == "namespaces" && parts.len() > 1 {
		info.namespace = parts[1].to_string();
		if parts.len() > 2 && !NAMESPACE_SUBRESOURCES.contains(&parts[2]) {
			parts = &parts[2..];
		}
	}

	if parts.len() >= 3 && info.verb != "proxy" {
		info.subresource = parts[2].to_string();
	}
	if parts.len() >= 2 {
		info.name = parts[1].to_string();
	}
	if let Some(resource) = parts.first() {
		info.resource = resource.to_string();
	}

	if info.name.is_empty() {
		match info.verb.as_str() {
			"get" if is_watch(query) => info.verb = "watch".to_string(),
			"get" => info.verb = "list".to_string(),
			"delete" => info.verb = "deletecollection".to_string(),
			_ => {}
		}
	}

	Ok(info)
}

fn split_path(path: &str) -> Vec<&str> {
	let trimmed = path.trim_matches('/');
	if trimmed.is_empty() {
		return Vec::new();
	}
	trimmed.split('/').collect()
}

fn verb_for_method(method: &Method) -> &'static str {
	match *method {
		Method::POST => "create",
		Method::GET | Method::HEAD => "get",
		Method::PUT => "update",
		Method::PATCH => "patch",
		Method::DELETE => "delete",
		_ => "",
	}
}

/// True when the first `watch` query parameter parses as a true boolean.
fn is_watch(query: Option<&str>) -> bool {
	let Some(value) = query
		.into_iter()
		.flat_map(|q| q.split('&'))
		.map(|pair| pair.split_once('=').unwrap_or((pair, "")))
		.find(|(key, _)| *key == "watch")
		.map(|(_, value)| value)
	else {
		return false;
	};

	urlencoding::decode(value)
		.is_ok_and(|value| matches!(value.as_ref(), "1" | "t" | "T" | "true" | "TRUE" | "True"))
}
