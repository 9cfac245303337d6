// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization outcomes.

use std::fmt;

use crate::error::StoreError;
use crate::types::RequestAttributes;

/// Reason attached to every policy denial.
pub const PERMISSION_UNDEFINED: &str = "permission undefined";

/// Outcome of one authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
	/// The request is granted by the allow-list or by at least one rule.
	Permit,
	/// No rule grants the request.
	Deny(Denial),
	/// The policy store could not be consulted; the request was neither
	/// permitted nor denied by policy.
	EvaluationError(StoreError),
}

impl Decision {
	pub fn is_permit(&self) -> bool {
		matches!(self, Decision::Permit)
	}

	pub fn is_deny(&self) -> bool {
		matches!(self, Decision::Deny(_))
	}

	pub fn is_evaluation_error(&self) -> bool {
		matches!(self, Decision::EvaluationError(_))
	}
}

/// What a denied request was trying to reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeniedTarget {
	Resource {
		api_group: String,
		resource: String,
		name: String,
	},
	Path(String),
}

/// A policy denial.
///
/// The [`Display`](fmt::Display) form follows the Kubernetes "forbidden" message
/// shape, e.g. `configmaps "cfg-2" is forbidden: permission undefined`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
	pub target: DeniedTarget,
	pub reason: &'static str,
}

impl Denial {
	/// Builds the "permission undefined" denial for `attrs`.
	pub fn permission_undefined(attrs: &RequestAttributes) -> Self {
		let target = if attrs.is_resource_request {
			DeniedTarget::Resource {
				api_group: attrs.api_group.clone(),
				resource: attrs.resource.clone(),
				name: attrs.resource_name.clone(),
			}
		} else {
			DeniedTarget::Path(attrs.path.clone())
		};

		Self {
			target,
			reason: PERMISSION_UNDEFINED,
		}
	}
}

impl fmt::Display for Denial {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.target {
			DeniedTarget::Resource {
				api_group,
				resource,
				name,
			} => {
				if resource.is_empty() {
					return write!(f, "forbidden: {}", self.reason);
				}
				if api_group.is_empty() {
					f.write_str(resource)?;
				} else {
					write!(f, "{resource}.{api_group}")?;
				}
				if !name.is_empty() {
					write!(f, " \"{name}\"")?;
				}
				write!(f, " is forbidden: {}", self.reason)
			}
			DeniedTarget::Path(path) => {
				write!(f, "path \"{path}\" is forbidden: {}", self.reason)
			}
		}
	}
}
