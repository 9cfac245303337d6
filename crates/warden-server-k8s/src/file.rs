// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Static policy loaded from a JSON file.
//!
//! The file holds a [`PolicySet`]: four top-level lists named `roles`,
//! `clusterRoles`, `roleBindings` and `clusterRoleBindings`, with objects in
//! the same camelCase shape as the Kubernetes API.

use std::path::Path;

use tracing::info;
use warden_rbac_core::{InMemoryPolicyStore, PolicySet};

use crate::error::{SyncError, SyncResult};

/// Reads and parses a policy file.
pub fn read_policy_file(path: impl AsRef<Path>) -> SyncResult<PolicySet> {
	let path = path.as_ref();
	let content = std::fs::read_to_string(path).map_err(|e| SyncError::FileRead {
		path: path.to_path_buf(),
		source: e,
	})?;

	serde_json::from_str(&content).map_err(|e| SyncError::FileParse {
		path: path.to_path_buf(),
		source: e,
	})
}

/// Loads a policy file into `store`, replacing its contents and marking every
/// collection synced.
pub fn load_policy_file(store: &InMemoryPolicyStore, path: impl AsRef<Path>) -> SyncResult<()> {
	let path = path.as_ref();
	let policies = read_policy_file(path)?;

	info!(
		path = %path.display(),
		roles = policies.roles.len(),
		cluster_roles = policies.cluster_roles.len(),
		role_bindings = policies.role_bindings.len(),
		cluster_role_bindings = policies.cluster_role_bindings.len(),
		"policy file loaded"
	);

	store.load(policies);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;
	use std::sync::Arc;
	use warden_rbac_core::{
		Authorizer, Decision, PolicyStore, RequestAttributes, RoleRef, Subject, SubjectKind,
	};

	const POLICY: &str = r#"{
		"clusterRoles": [
			{
				"name": "pod-reader",
				"rules": [{ "apiGroups": ["*"], "resources": ["pods"], "verbs": ["get", "list"] }]
			}
		],
		"clusterRoleBindings": [
			{
				"name": "alice-reads-pods",
				"subjects": [{ "kind": "User", "name": "alice" }],
				"roleRef": { "kind": "ClusterRole", "name": "pod-reader" }
			}
		],
		"roleBindings": [
			{
				"namespace": "ci",
				"name": "builder",
				"subjects": [{ "kind": "ServiceAccount", "name": "builder", "namespace": "ci" }],
				"roleRef": { "kind": "ClusterRole", "name": "pod-reader" }
			}
		]
	}"#;

	fn write_file(content: &str) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[test]
	fn parses_kubernetes_shaped_policy() {
		let file = write_file(POLICY);
		let policies = read_policy_file(file.path()).unwrap();

		assert_eq!(policies.cluster_roles[0].rules[0].verbs, vec!["get", "list"]);
		assert_eq!(
			policies.cluster_role_bindings[0].role_ref,
			RoleRef::cluster_role("pod-reader")
		);
		assert_eq!(policies.cluster_role_bindings[0].subjects, vec![Subject::user("alice")]);
		assert_eq!(
			policies.role_bindings[0].subjects[0].kind,
			SubjectKind::ServiceAccount
		);
		assert!(policies.roles.is_empty());
	}

	#[test]
	fn load_marks_store_synced() {
		let file = write_file(POLICY);
		let store = InMemoryPolicyStore::new();
		assert!(!store.is_synced());

		load_policy_file(&store, file.path()).unwrap();
		assert!(store.is_synced());
		assert_eq!(store.list_cluster_role_bindings().unwrap().len(), 1);
		assert!(store.list_role_bindings("default").unwrap().is_empty());
	}

	#[test]
	fn missing_file_is_a_read_error() {
		let err = read_policy_file("/nonexistent/policy.json").unwrap_err();
		assert!(matches!(err, SyncError::FileRead { .. }));
	}

	#[test]
	fn malformed_file_is_a_parse_error() {
		let file = write_file("{ not json");
		let err = read_policy_file(file.path()).unwrap_err();
		assert!(matches!(err, SyncError::FileParse { .. }));
		assert!(err.to_string().contains("Failed to parse policy file"));
	}

	#[test]
	fn service_account_subject_without_namespace_uses_binding_namespace() {
		let file = write_file(
			r#"{
				"roles": [
					{
						"namespace": "ci",
						"name": "reader",
						"rules": [{ "apiGroups": [""], "resources": ["pods"], "verbs": ["get"] }]
					}
				],
				"roleBindings": [
					{
						"namespace": "ci",
						"name": "builder",
						"subjects": [{ "kind": "ServiceAccount", "name": "builder" }],
						"roleRef": { "kind": "Role", "name": "reader" }
					}
				]
			}"#,
		);
		let store = Arc::new(InMemoryPolicyStore::new());
		load_policy_file(&store, file.path()).unwrap();
		let authz = Authorizer::new(store);

		let get_pods = |user: &str, namespace: &str| {
			RequestAttributes::resource(user, "get", "", "pods").in_namespace(namespace)
		};
		assert_eq!(
			authz.authorize(&get_pods("system:serviceaccount:ci:builder", "ci")),
			Decision::Permit
		);
		assert!(authz
			.authorize(&get_pods("system:serviceaccount:other:builder", "ci"))
			.is_deny());
		assert!(authz
			.authorize(&get_pods("system:serviceaccount:ci:builder", "other"))
			.is_deny());
	}
}
