// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authenticated caller, as handed to us by the authentication layer.
//!
//! An authentication middleware running in the same process inserts an
//! [`Identity`] into the request extensions. A fronting proxy passes the same
//! information as headers instead, which [`IdentityHeaders`] reads.

use axum::http::{header::HeaderName, HeaderMap, Request};
use warden_server_config::AdmissionConfig;

use crate::error::ServerError;

/// A user and the groups they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	pub user: String,
	pub groups: Vec<String>,
}

impl Identity {
	pub fn new(user: impl Into<String>, groups: Vec<String>) -> Self {
		Self {
			user: user.into(),
			groups,
		}
	}
}

/// Header names carrying the caller's user name and comma-separated groups.
#[derive(Debug, Clone)]
pub struct IdentityHeaders {
	user: HeaderName,
	groups: HeaderName,
}

impl IdentityHeaders {
	pub fn new(user: &str, groups: &str) -> Result<Self, ServerError> {
		Ok(Self {
			user: header_name(user)?,
			groups: header_name(groups)?,
		})
	}

	/// The configured identity headers, or `None` when header identity is
	/// turned off.
	pub fn from_config(config: &AdmissionConfig) -> Result<Option<Self>, ServerError> {
		if !config.identity_headers {
			return Ok(None);
		}
		Self::new(&config.user_header, &config.groups_header).map(Some)
	}

	/// Reads an identity from `headers`. A missing or empty user header means
	/// there is no identity.
	pub fn extract(&self, headers: &HeaderMap) -> Option<Identity> {
		let user = headers.get(&self.user)?.to_str().ok()?.trim();
		if user.is_empty() {
			return None;
		}

		let groups = headers
			.get_all(&self.groups)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(|value| value.split(','))
			.map(str::trim)
			.filter(|group| !group.is_empty())
			.map(str::to_string)
			.collect();

		Some(Identity::new(user, groups))
	}
}

fn header_name(name: &str) -> Result<HeaderName, ServerError> {
	HeaderName::from_bytes(name.as_bytes()).map_err(|e| ServerError::InvalidHeader {
		name: name.to_string(),
		message: e.to_string(),
	})
}

/// Finds the caller's identity: an [`Identity`] extension first, then the
/// identity headers when they are trusted.
pub fn identity_of<B>(req: &Request<B>, headers: Option<&IdentityHeaders>) -> Option<Identity> {
	if let Some(identity) = req.extensions().get::<Identity>() {
		return Some(identity.clone());
	}
	headers.and_then(|h| h.extract(req.headers()))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn default_headers() -> IdentityHeaders {
		IdentityHeaders::new("X-Token-Username", "X-Token-Groups").unwrap()
	}

	fn request(builder: axum::http::request::Builder) -> Request<()> {
		builder.body(()).unwrap()
	}

	#[test]
	fn groups_are_split_and_trimmed() {
		let req = request(
			Request::get("/")
				.header("x-token-username", "alice")
				.header("X-Token-Groups", "admins, dev,,ops"),
		);
		assert_eq!(
			default_headers().extract(req.headers()),
			Some(Identity::new(
				"alice",
				vec!["admins".to_string(), "dev".to_string(), "ops".to_string()]
			))
		);
	}

	#[test]
	fn repeated_group_headers_are_combined() {
		let req = request(
			Request::get("/")
				.header("X-Token-Username", "alice")
				.header("X-Token-Groups", "a")
				.header("X-Token-Groups", "b"),
		);
		let identity = default_headers().extract(req.headers()).unwrap();
		assert_eq!(identity.groups, vec!["a".to_string(), "b".to_string()]);
	}

	#[test]
	fn missing_or_empty_user_is_no_identity() {
		let without = request(Request::get("/").header("X-Token-Groups", "a"));
		assert_eq!(default_headers().extract(without.headers()), None);

		let empty = request(Request::get("/").header("X-Token-Username", " "));
		assert_eq!(default_headers().extract(empty.headers()), None);
	}

	#[test]
	fn extension_wins_over_headers() {
		let mut req = request(Request::get("/").header("X-Token-Username", "mallory"));
		req.extensions_mut().insert(Identity::new("alice", vec![]));
		assert_eq!(
			identity_of(&req, Some(&default_headers())).map(|i| i.user),
			Some("alice".to_string())
		);
	}

	#[test]
	fn headers_ignored_when_not_trusted() {
		let req = request(Request::get("/").header("X-Token-Username", "mallory"));
		assert_eq!(identity_of(&req, None), None);
	}

	#[test]
	fn from_config_honours_switch() {
		let mut config = AdmissionConfig::default();
		assert!(IdentityHeaders::from_config(&config).unwrap().is_some());
		config.identity_headers = false;
		assert!(IdentityHeaders::from_config(&config).unwrap().is_none());
	}

	#[test]
	fn invalid_header_name_is_rejected() {
		assert!(matches!(
			IdentityHeaders::new("bad header", "X-Token-Groups"),
			Err(ServerError::InvalidHeader { .. })
		));
	}
}
