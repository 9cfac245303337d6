// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role-based access control for Warden.
//!
//! This crate is the pure decision core. It knows nothing about HTTP or
//! Kubernetes; it evaluates [`RequestAttributes`] against a policy graph read
//! through the [`PolicyStore`] trait.
//!
//! - [`types`]: roles, bindings, subjects, rules and request attributes
//! - [`subject`]: does a binding's subject list cover the requester
//! - [`rule`]: does one rule grant one request
//! - [`resolver`]: which rules are granted to a subject in a scope
//! - [`authorizer`]: the end-to-end decision
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use warden_rbac_core::{
//! 	Authorizer, ClusterRole, ClusterRoleBinding, InMemoryPolicyStore, PolicyRule, PolicySet,
//! 	RequestAttributes, RoleRef, Subject,
//! };
//!
//! let store = InMemoryPolicyStore::from_policy_set(PolicySet {
//! 	cluster_roles: vec![ClusterRole {
//! 		name: "pod-reader".to_string(),
//! 		rules: vec![PolicyRule::new()
//! 			.with_api_groups(["*"])
//! 			.with_resources(["pods"])
//! 			.with_verbs(["get", "list"])],
//! 	}],
//! 	cluster_role_bindings: vec![ClusterRoleBinding {
//! 		name: "alice-reads-pods".to_string(),
//! 		subjects: vec![Subject::user("alice")],
//! 		role_ref: RoleRef::cluster_role("pod-reader"),
//! 	}],
//! 	..Default::default()
//! });
//!
//! let authorizer = Authorizer::new(Arc::new(store));
//! let get = RequestAttributes::resource("alice", "get", "", "pods");
//! assert!(authorizer.authorize(&get).is_permit());
//! ```

pub mod authorizer;
pub mod builtin;
pub mod decision;
pub mod error;
pub mod resolver;
pub mod rule;
pub mod store;
pub mod subject;
pub mod types;

pub use authorizer::Authorizer;
pub use builtin::{AllowList, PathGrant, ResourceGrant};
pub use decision::{Decision, DeniedTarget, Denial, PERMISSION_UNDEFINED};
pub use error::{StoreError, StoreResult};
pub use resolver::{BindingResolver, ResolvedRole, Scope};
pub use store::{InMemoryPolicyStore, PolicyObject, PolicySet, PolicySnapshot, PolicyStore};
pub use types::{
	ClusterRole, ClusterRoleBinding, PolicyKind, PolicyRule, RequestAttributes, Role, RoleBinding,
	RoleRef, RoleRefKind, Subject, SubjectKind, SERVICE_ACCOUNT_USER_PREFIX, WILDCARD,
};
