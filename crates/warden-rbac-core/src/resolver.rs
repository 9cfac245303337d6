// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Binding resolution: from a subject to the rules granted to it in one scope.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::store::PolicyStore;
use crate::subject;
use crate::types::{ClusterRole, PolicyRule, Role, RoleRef, RoleRefKind};

/// The scope a set of bindings is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
	Cluster,
	Namespace(&'a str),
}

impl fmt::Display for Scope<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Scope::Cluster => f.write_str("cluster"),
			Scope::Namespace(ns) => write!(f, "namespace/{ns}"),
		}
	}
}

#[derive(Debug, Clone)]
enum ResolvedRules {
	Role(Arc<Role>),
	ClusterRole(Arc<ClusterRole>),
}

/// A binding that covers the subject, together with its resolved role.
#[derive(Debug, Clone)]
pub struct ResolvedRole {
	pub binding: String,
	pub role_ref: RoleRef,
	rules: ResolvedRules,
}

impl ResolvedRole {
	pub fn rules(&self) -> &[PolicyRule] {
		match &self.rules {
			ResolvedRules::Role(role) => &role.rules,
			ResolvedRules::ClusterRole(role) => &role.rules,
		}
	}
}

/// Resolves bindings to the rules they grant a subject.
pub struct BindingResolver<'a> {
	store: &'a dyn PolicyStore,
}

impl<'a> BindingResolver<'a> {
	pub fn new(store: &'a dyn PolicyStore) -> Self {
		Self { store }
	}

	/// Dispatches to the cluster or namespace resolver.
	pub fn resolve(
		&self,
		scope: Scope<'_>,
		user: &str,
		groups: &[String],
	) -> StoreResult<Vec<ResolvedRole>> {
		match scope {
			Scope::Cluster => self.resolve_cluster_rules(user, groups),
			Scope::Namespace(namespace) => self.resolve_namespace_rules(namespace, user, groups),
		}
	}

	/// Resolves every ClusterRoleBinding that covers the subject.
	///
	/// Bindings whose ClusterRole is missing are skipped. Any other store error
	/// is returned.
	pub fn resolve_cluster_rules(
		&self,
		user: &str,
		groups: &[String],
	) -> StoreResult<Vec<ResolvedRole>> {
		let bindings = self.store.list_cluster_role_bindings()?;
		let mut resolved = Vec::new();

		for binding in bindings
			.iter()
			.filter(|b| subject::covers(&b.subjects, None, user, groups))
		{
			let role = self.store.get_cluster_role(&binding.role_ref.name);
			if let Some(role) = skip_dangling(role, Scope::Cluster, &binding.name)? {
				resolved.push(ResolvedRole {
					binding: binding.name.clone(),
					role_ref: RoleRef::cluster_role(&binding.role_ref.name),
					rules: ResolvedRules::ClusterRole(role),
				});
			}
		}

		Ok(resolved)
	}

	/// Resolves every RoleBinding in `namespace` that covers the subject.
	///
	/// A binding may reference a Role in the same namespace or a ClusterRole;
	/// either way its rules only apply within `namespace`.
	pub fn resolve_namespace_rules(
		&self,
		namespace: &str,
		user: &str,
		groups: &[String],
	) -> StoreResult<Vec<ResolvedRole>> {
		let bindings = self.store.list_role_bindings(namespace)?;
		let scope = Scope::Namespace(namespace);
		let mut resolved = Vec::new();

		for binding in bindings
			.iter()
			.filter(|b| subject::covers(&b.subjects, Some(namespace), user, groups))
		{
			let rules = match binding.role_ref.kind {
				RoleRefKind::Role => {
					let role = self.store.get_role(namespace, &binding.role_ref.name);
					skip_dangling(role, scope, &binding.name)?.map(ResolvedRules::Role)
				}
				RoleRefKind::ClusterRole => {
					let role = self.store.get_cluster_role(&binding.role_ref.name);
					skip_dangling(role, scope, &binding.name)?.map(ResolvedRules::ClusterRole)
				}
			};

			if let Some(rules) = rules {
				resolved.push(ResolvedRole {
					binding: binding.name.clone(),
					role_ref: binding.role_ref.clone(),
					rules,
				});
			}
		}

		Ok(resolved)
	}
}

/// Turns a dangling role reference into `None` and logs it.
fn skip_dangling<T>(
	lookup: Result<T, StoreError>,
	scope: Scope<'_>,
	binding: &str,
) -> StoreResult<Option<T>> {
	match lookup {
		Ok(role) => Ok(Some(role)),
		Err(err) if err.is_not_found() => {
			warn!(
				scope = %scope,
				binding,
				error = %err,
				"binding references a missing role, skipping"
			);
			Ok(None)
		}
		Err(err) => Err(err),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::{InMemoryPolicyStore, PolicySet};
	use crate::types::{ClusterRoleBinding, PolicyKind, RoleBinding, Subject};

	fn get_pods() -> PolicyRule {
		PolicyRule::new()
			.with_verbs(["get"])
			.with_api_groups([""])
			.with_resources(["pods"])
	}

	fn cluster_role(name: &str) -> ClusterRole {
		ClusterRole {
			name: name.to_string(),
			rules: vec![get_pods()],
		}
	}

	fn crb(name: &str, subjects: Vec<Subject>, role: &str) -> ClusterRoleBinding {
		ClusterRoleBinding {
			name: name.to_string(),
			subjects,
			role_ref: RoleRef::cluster_role(role),
		}
	}

	fn rb(namespace: &str, name: &str, subjects: Vec<Subject>, role_ref: RoleRef) -> RoleBinding {
		RoleBinding {
			namespace: namespace.to_string(),
			name: name.to_string(),
			subjects,
			role_ref,
		}
	}

	fn groups(names: &[&str]) -> Vec<String> {
		names.iter().map(|s| s.to_string()).collect()
	}

	mod cluster_scope {
		use super::*;

		#[test]
		fn resolves_bindings_for_matching_subjects_only() {
			let store = InMemoryPolicyStore::from_policy_set(PolicySet {
				cluster_roles: vec![cluster_role("viewer")],
				cluster_role_bindings: vec![
					crb("alice-view", vec![Subject::user("alice")], "viewer"),
					crb("bob-view", vec![Subject::user("bob")], "viewer"),
					crb("ops-view", vec![Subject::group("ops")], "viewer"),
				],
				..Default::default()
			});
			let resolver = BindingResolver::new(&store);

			let resolved = resolver
				.resolve_cluster_rules("alice", &groups(&["ops"]))
				.unwrap();
			let names: Vec<_> = resolved.iter().map(|r| r.binding.as_str()).collect();
			assert_eq!(names, vec!["alice-view", "ops-view"]);
			assert_eq!(resolved[0].rules(), &[get_pods()]);
		}

		#[test]
		fn dangling_reference_is_skipped() {
			let store = InMemoryPolicyStore::from_policy_set(PolicySet {
				cluster_roles: vec![cluster_role("viewer")],
				cluster_role_bindings: vec![
					crb("a-dangling", vec![Subject::user("alice")], "deleted"),
					crb("b-valid", vec![Subject::user("alice")], "viewer"),
				],
				..Default::default()
			});
			let resolved = BindingResolver::new(&store)
				.resolve_cluster_rules("alice", &[])
				.unwrap();
			assert_eq!(resolved.len(), 1);
			assert_eq!(resolved[0].binding, "b-valid");
		}

		#[test]
		fn unsynced_store_is_an_error() {
			let store = InMemoryPolicyStore::new();
			let err = BindingResolver::new(&store)
				.resolve_cluster_rules("alice", &[])
				.unwrap_err();
			assert!(!err.is_not_found());
		}

		#[test]
		fn unsynced_roles_are_an_error_not_a_skip() {
			let store = InMemoryPolicyStore::new();
			store.replace(
				PolicyKind::ClusterRoleBinding,
				vec![crb("alice-view", vec![Subject::user("alice")], "viewer").into()],
			);
			let err = BindingResolver::new(&store)
				.resolve_cluster_rules("alice", &[])
				.unwrap_err();
			assert_eq!(
				err,
				StoreError::NotSynced {
					kind: PolicyKind::ClusterRole
				}
			);
		}
	}

	mod namespace_scope {
		use super::*;

		#[test]
		fn resolves_role_in_same_namespace() {
			let store = InMemoryPolicyStore::from_policy_set(PolicySet {
				roles: vec![
					Role {
						namespace: "team-a".to_string(),
						name: "editor".to_string(),
						rules: vec![get_pods()],
					},
					Role {
						namespace: "team-b".to_string(),
						name: "editor".to_string(),
						rules: Vec::new(),
					},
				],
				role_bindings: vec![rb(
					"team-a",
					"editors",
					vec![Subject::group("editors")],
					RoleRef::role("editor"),
				)],
				..Default::default()
			});
			let resolved = BindingResolver::new(&store)
				.resolve_namespace_rules("team-a", "bob", &groups(&["editors"]))
				.unwrap();
			assert_eq!(resolved.len(), 1);
			assert_eq!(resolved[0].rules(), &[get_pods()]);
		}

		#[test]
		fn role_from_another_namespace_is_dangling() {
			let store = InMemoryPolicyStore::from_policy_set(PolicySet {
				roles: vec![Role {
					namespace: "team-b".to_string(),
					name: "editor".to_string(),
					rules: vec![get_pods()],
				}],
				role_bindings: vec![rb(
					"team-a",
					"editors",
					vec![Subject::user("bob")],
					RoleRef::role("editor"),
				)],
				..Default::default()
			});
			let resolved = BindingResolver::new(&store)
				.resolve_namespace_rules("team-a", "bob", &[])
				.unwrap();
			assert!(resolved.is_empty());
		}

		#[test]
		fn role_binding_may_reference_cluster_role() {
			let store = InMemoryPolicyStore::from_policy_set(PolicySet {
				cluster_roles: vec![cluster_role("viewer")],
				role_bindings: vec![rb(
					"team-a",
					"view",
					vec![Subject::user("bob")],
					RoleRef::cluster_role("viewer"),
				)],
				..Default::default()
			});
			let resolver = BindingResolver::new(&store);
			let resolved = resolver
				.resolve(Scope::Namespace("team-a"), "bob", &[])
				.unwrap();
			assert_eq!(resolved.len(), 1);
			assert_eq!(resolved[0].role_ref, RoleRef::cluster_role("viewer"));
			assert!(resolver
				.resolve(Scope::Namespace("team-b"), "bob", &[])
				.unwrap()
				.is_empty());
		}
	}

	#[test]
	fn scope_display() {
		assert_eq!(Scope::Cluster.to_string(), "cluster");
		assert_eq!(Scope::Namespace("team-a").to_string(), "namespace/team-a");
	}
}
