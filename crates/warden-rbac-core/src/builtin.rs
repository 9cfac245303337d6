// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Requests that are permitted before any policy is consulted.
//!
//! These are low-sensitivity endpoints the console needs before a user has any
//! bindings, such as fetching the current user or listing workspaces.

use serde::{Deserialize, Serialize};

use crate::types::RequestAttributes;

/// Permits `verb` on an exact request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathGrant {
	pub path: String,
	pub verb: String,
}

/// Permits `verb` on a combined resource (`resource` or `resource/subresource`)
/// in any API group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGrant {
	pub resource: String,
	pub verb: String,
}

/// Fixed allow-list checked ahead of the policy graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
	paths: Vec<PathGrant>,
	resources: Vec<ResourceGrant>,
}

impl AllowList {
	pub fn new(paths: Vec<PathGrant>, resources: Vec<ResourceGrant>) -> Self {
		Self { paths, resources }
	}

	/// An allow-list that permits nothing.
	pub fn empty() -> Self {
		Self::new(Vec::new(), Vec::new())
	}

	pub fn is_empty(&self) -> bool {
		self.paths.is_empty() && self.resources.is_empty()
	}

	pub fn paths(&self) -> &[PathGrant] {
		&self.paths
	}

	pub fn resources(&self) -> &[ResourceGrant] {
		&self.resources
	}

	/// Returns true if `attrs` is on the allow-list.
	pub fn permits(&self, attrs: &RequestAttributes) -> bool {
		let path_allowed = self
			.paths
			.iter()
			.any(|g| g.path == attrs.path && g.verb == attrs.verb);

		if path_allowed {
			return true;
		}

		if !attrs.is_resource_request || attrs.resource.is_empty() {
			return false;
		}

		let combined = attrs.combined_resource();
		self
			.resources
			.iter()
			.any(|g| g.resource == combined && g.verb == attrs.verb)
	}
}

fn path_grant(path: &str, verb: &str) -> PathGrant {
	PathGrant {
		path: path.to_string(),
		verb: verb.to_string(),
	}
}

fn resource_grant(resource: &str, verb: &str) -> ResourceGrant {
	ResourceGrant {
		resource: resource.to_string(),
		verb: verb.to_string(),
	}
}

impl Default for AllowList {
	fn default() -> Self {
		Self::new(
			vec![
				path_grant("/apis/account.kubesphere.io/v1alpha1/users/current", "get"),
				path_grant("/apis/kubesphere.io/v1alpha1/workspaces", "list"),
			],
			vec![
				resource_grant("rulesmapping", "get"),
				resource_grant("workspaces/rules", "get"),
				resource_grant("workspaces/roles", "get"),
				resource_grant("workspaces/namespaces", "get"),
				resource_grant("workspaces/devops", "get"),
			],
		)
	}
}
