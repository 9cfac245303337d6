// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Binding subject matching.

use crate::types::{Subject, SubjectKind, SERVICE_ACCOUNT_USER_PREFIX};

/// Returns true if any of `subjects` refers to the requesting identity.
///
/// Comparison is exact. No subject name acts as a wildcard, including `"*"`.
/// `binding_namespace` is the namespace of a RoleBinding, or `None` for a
/// ClusterRoleBinding.
pub fn covers(
	subjects: &[Subject],
	binding_namespace: Option<&str>,
	user: &str,
	groups: &[String],
) -> bool {
	subjects
		.iter()
		.any(|subject| applies_to(subject, binding_namespace, user, groups))
}

/// Returns true if a single subject refers to the requesting identity.
///
/// A ServiceAccount subject without a namespace belongs to the binding's
/// namespace; under a ClusterRoleBinding it matches nothing.
pub fn applies_to(
	subject: &Subject,
	binding_namespace: Option<&str>,
	user: &str,
	groups: &[String],
) -> bool {
	match subject.kind {
		SubjectKind::User => subject.name == user,
		SubjectKind::Group => groups.iter().any(|g| *g == subject.name),
		SubjectKind::ServiceAccount => {
			let namespace = subject
				.namespace
				.as_deref()
				.filter(|ns| !ns.is_empty())
				.or(binding_namespace);
			let Some(namespace) = namespace else {
				return false;
			};
			service_account_parts(user) == Some((namespace, subject.name.as_str()))
		}
	}
}

/// Splits `system:serviceaccount:<namespace>:<name>` into its parts.
fn service_account_parts(user: &str) -> Option<(&str, &str)> {
	let rest = user.strip_prefix(SERVICE_ACCOUNT_USER_PREFIX)?;
	let (namespace, name) = rest.split_once(':')?;
	if namespace.is_empty() || name.is_empty() || name.contains(':') {
		return None;
	}
	Some((namespace, name))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn groups(names: &[&str]) -> Vec<String> {
		names.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn user_subject_matches_exact_username() {
		let subjects = vec![Subject::user("alice")];
		assert!(covers(&subjects, None, "alice", &[]));
		assert!(!covers(&subjects, None, "Alice", &[]));
		assert!(!covers(&subjects, None, "alice2", &[]));
	}

	#[test]
	fn group_subject_matches_membership() {
		let subjects = vec![Subject::group("editors")];
		assert!(covers(&subjects, None, "bob", &groups(&["viewers", "editors"])));
		assert!(!covers(&subjects, None, "bob", &groups(&["viewers"])));
	}

	#[test]
	fn group_subject_does_not_match_username() {
		let subjects = vec![Subject::group("editors")];
		assert!(!covers(&subjects, None, "editors", &[]));
	}

	#[test]
	fn user_subject_does_not_match_group() {
		let subjects = vec![Subject::user("admins")];
		assert!(!covers(&subjects, None, "bob", &groups(&["admins"])));
	}

	#[test]
	fn star_is_not_a_wildcard_subject() {
		let subjects = vec![Subject::user("*"), Subject::group("*")];
		assert!(!covers(&subjects, None, "alice", &groups(&["editors"])));
		assert!(covers(&subjects, None, "*", &[]));
	}

	#[test]
	fn any_subject_in_list_is_enough() {
		let subjects = vec![Subject::user("carol"), Subject::group("ops")];
		assert!(covers(&subjects, None, "dave", &groups(&["ops"])));
		assert!(covers(&subjects, None, "carol", &[]));
	}

	#[test]
	fn empty_subject_list_covers_nobody() {
		assert!(!covers(&[], None, "alice", &groups(&["editors"])));
	}

	#[test]
	fn service_account_subject_matches_serviceaccount_username() {
		let subjects = vec![Subject::service_account("kube-system", "builder")];
		assert!(covers(
			&subjects,
			None,
			"system:serviceaccount:kube-system:builder",
			&[]
		));
		assert!(!covers(
			&subjects,
			None,
			"system:serviceaccount:default:builder",
			&[]
		));
		assert!(!covers(&subjects, None, "builder", &[]));
	}

	#[test]
	fn service_account_subject_without_namespace_matches_nothing() {
		let subject = Subject {
			kind: SubjectKind::ServiceAccount,
			name: "builder".to_string(),
			namespace: None,
		};
		assert!(!applies_to(
			&subject,
			None,
			"system:serviceaccount::builder",
			&[]
		));
	}

	#[test]
	fn service_account_subject_without_namespace_inherits_binding_namespace() {
		let subjects = vec![Subject {
			kind: SubjectKind::ServiceAccount,
			name: "builder".to_string(),
			namespace: None,
		}];
		assert!(covers(
			&subjects,
			Some("ci"),
			"system:serviceaccount:ci:builder",
			&[]
		));
		assert!(!covers(
			&subjects,
			Some("ci"),
			"system:serviceaccount:other:builder",
			&[]
		));
		assert!(!covers(
			&subjects,
			None,
			"system:serviceaccount:ci:builder",
			&[]
		));
	}

	#[test]
	fn explicit_service_account_namespace_wins_over_binding() {
		let subjects = vec![Subject::service_account("kube-system", "builder")];
		assert!(covers(
			&subjects,
			Some("ci"),
			"system:serviceaccount:kube-system:builder",
			&[]
		));
		assert!(!covers(
			&subjects,
			Some("ci"),
			"system:serviceaccount:ci:builder",
			&[]
		));
	}
}
