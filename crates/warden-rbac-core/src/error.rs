// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::types::PolicyKind;

/// Result type alias for policy store lookups.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by a [`PolicyStore`](crate::PolicyStore).
///
/// `NotFound` marks a dangling reference and is recovered from by skipping the
/// binding. Every other variant is an infrastructure failure that aborts the
/// decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
	#[error("{kind} not found: {}", qualified_name(.namespace.as_deref(), .name))]
	NotFound {
		kind: PolicyKind,
		namespace: Option<String>,
		name: String,
	},

	#[error("Policy store has not synced {kind} objects yet")]
	NotSynced { kind: PolicyKind },

	#[error("Policy store unavailable: {message}")]
	Unavailable { message: String },
}

impl StoreError {
	pub fn not_found(kind: PolicyKind, namespace: Option<&str>, name: &str) -> Self {
		StoreError::NotFound {
			kind,
			namespace: namespace.map(str::to_string),
			name: name.to_string(),
		}
	}

	/// Returns true for dangling references, which are not infrastructure failures.
	pub fn is_not_found(&self) -> bool {
		matches!(self, StoreError::NotFound { .. })
	}
}

fn qualified_name(namespace: Option<&str>, name: &str) -> String {
	match namespace {
		Some(ns) => format!("{ns}/{name}"),
		None => name.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn not_found_display_includes_namespace() {
		let err = StoreError::not_found(PolicyKind::Role, Some("team-a"), "editor");
		assert_eq!(err.to_string(), "Role not found: team-a/editor");
		assert!(err.is_not_found());
	}

	#[test]
	fn cluster_scoped_not_found_display() {
		let err = StoreError::not_found(PolicyKind::ClusterRole, None, "admin");
		assert_eq!(err.to_string(), "ClusterRole not found: admin");
	}

	#[test]
	fn infrastructure_errors_are_not_dangling_references() {
		assert!(!StoreError::NotSynced {
			kind: PolicyKind::RoleBinding
		}
		.is_not_found());
		assert!(!StoreError::Unavailable {
			message: "timeout".to_string()
		}
		.is_not_found());
	}
}
