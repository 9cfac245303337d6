// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admission middleware configuration section.

use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_HEADER: &str = "X-Token-Username";
pub const DEFAULT_GROUPS_HEADER: &str = "X-Token-Groups";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdmissionConfigLayer {
	pub path: Option<String>,
	pub except: Option<Vec<String>>,
	pub trust_forwarded_headers: Option<bool>,
	pub identity_headers: Option<bool>,
	pub user_header: Option<String>,
	pub groups_header: Option<String>,
}

impl AdmissionConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.path.is_some() {
			self.path = other.path;
		}
		if other.except.is_some() {
			self.except = other.except;
		}
		if other.trust_forwarded_headers.is_some() {
			self.trust_forwarded_headers = other.trust_forwarded_headers;
		}
		if other.identity_headers.is_some() {
			self.identity_headers = other.identity_headers;
		}
		if other.user_header.is_some() {
			self.user_header = other.user_header;
		}
		if other.groups_header.is_some() {
			self.groups_header = other.groups_header;
		}
	}

	pub fn finalize(self) -> AdmissionConfig {
		let defaults = AdmissionConfig::default();
		AdmissionConfig {
			path: self.path.unwrap_or(defaults.path),
			except: self.except.unwrap_or(defaults.except),
			trust_forwarded_headers: self
				.trust_forwarded_headers
				.unwrap_or(defaults.trust_forwarded_headers),
			identity_headers: self.identity_headers.unwrap_or(defaults.identity_headers),
			user_header: self.user_header.unwrap_or(defaults.user_header),
			groups_header: self.groups_header.unwrap_or(defaults.groups_header),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmissionConfig {
	/// Path prefix the admission check applies to.
	pub path: String,
	/// Path prefixes exempt from the admission check.
	pub except: Vec<String>,
	/// Take method and URI from `X-Forwarded-Method` / `X-Forwarded-Uri`.
	pub trust_forwarded_headers: bool,
	/// Accept identity from request headers when no authenticated identity is
	/// attached to the request.
	pub identity_headers: bool,
	pub user_header: String,
	/// Comma-separated group list.
	pub groups_header: String,
}

impl Default for AdmissionConfig {
	fn default() -> Self {
		Self {
			path: "/".to_string(),
			except: Vec::new(),
			trust_forwarded_headers: false,
			identity_headers: true,
			user_header: DEFAULT_USER_HEADER.to_string(),
			groups_header: DEFAULT_GROUPS_HEADER.to_string(),
		}
	}
}
