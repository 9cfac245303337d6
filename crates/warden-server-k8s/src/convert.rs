// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Conversion from `rbac.authorization.k8s.io/v1` objects to policy objects.
//!
//! Objects without a name, or namespaced objects without a namespace, are
//! skipped. Subjects of an unknown kind are dropped from their binding.

use std::fmt::Debug;

use k8s_openapi::api::rbac::v1 as k8s;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use warden_rbac_core::{
	ClusterRole, ClusterRoleBinding, PolicyKind, PolicyObject, PolicyRule, Role, RoleBinding, RoleRef,
	Subject, SubjectKind,
};

/// A Kubernetes RBAC object that maps onto one policy collection.
pub trait RbacObject:
	Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static
{
	const KIND: PolicyKind;

	/// Converts into a policy object, or `None` if the object is unusable.
	fn into_policy(self) -> Option<PolicyObject>;
}

impl RbacObject for k8s::Role {
	const KIND: PolicyKind = PolicyKind::Role;

	fn into_policy(self) -> Option<PolicyObject> {
		let (namespace, name) = namespaced_key(&self.metadata, Self::KIND)?;
		Some(
			Role {
				namespace,
				name,
				rules: rules(self.rules),
			}
			.into(),
		)
	}
}

impl RbacObject for k8s::ClusterRole {
	const KIND: PolicyKind = PolicyKind::ClusterRole;

	fn into_policy(self) -> Option<PolicyObject> {
		let name = required_name(&self.metadata, Self::KIND)?;
		Some(
			ClusterRole {
				name,
				rules: rules(self.rules),
			}
			.into(),
		)
	}
}

impl RbacObject for k8s::RoleBinding {
	const KIND: PolicyKind = PolicyKind::RoleBinding;

	fn into_policy(self) -> Option<PolicyObject> {
		let (namespace, name) = namespaced_key(&self.metadata, Self::KIND)?;
		let role_ref = role_ref(self.role_ref, Self::KIND, &name)?;
		let subjects = subjects(self.subjects);
		Some(
			RoleBinding {
				namespace,
				name,
				subjects,
				role_ref,
			}
			.into(),
		)
	}
}

impl RbacObject for k8s::ClusterRoleBinding {
	const KIND: PolicyKind = PolicyKind::ClusterRoleBinding;

	fn into_policy(self) -> Option<PolicyObject> {
		let name = required_name(&self.metadata, Self::KIND)?;
		let role_ref = role_ref(self.role_ref, Self::KIND, &name)?;
		Some(
			ClusterRoleBinding {
				name,
				subjects: subjects(self.subjects),
				role_ref,
			}
			.into(),
		)
	}
}

fn required_name(meta: &ObjectMeta, kind: PolicyKind) -> Option<String> {
	match meta.name.as_deref() {
		Some(name) if !name.is_empty() => Some(name.to_string()),
		_ => {
			warn!(kind = %kind, "policy object without a name, skipping");
			None
		}
	}
}

fn namespaced_key(meta: &ObjectMeta, kind: PolicyKind) -> Option<(String, String)> {
	let name = required_name(meta, kind)?;
	match meta.namespace.as_deref() {
		Some(namespace) if !namespace.is_empty() => Some((namespace.to_string(), name)),
		_ => {
			warn!(kind = %kind, name = %name, "namespaced policy object without a namespace, skipping");
			None
		}
	}
}

fn rules(rules: Option<Vec<k8s::PolicyRule>>) -> Vec<PolicyRule> {
	rules
		.unwrap_or_default()
		.into_iter()
		.map(|rule| PolicyRule {
			verbs: rule.verbs,
			api_groups: rule.api_groups.unwrap_or_default(),
			resources: rule.resources.unwrap_or_default(),
			resource_names: rule.resource_names.unwrap_or_default(),
			non_resource_urls: rule.non_resource_urls.unwrap_or_default(),
		})
		.collect()
}

fn role_ref(role_ref: k8s::RoleRef, kind: PolicyKind, binding: &str) -> Option<RoleRef> {
	match role_ref.kind.as_str() {
		"Role" => Some(RoleRef::role(role_ref.name)),
		"ClusterRole" => Some(RoleRef::cluster_role(role_ref.name)),
		other => {
			warn!(kind = %kind, binding, role_kind = other, "unknown roleRef kind, skipping binding");
			None
		}
	}
}

/// Converts binding subjects. A ServiceAccount subject keeps its namespace
/// as written; an absent one is resolved against the binding when matching.
fn subjects(subjects: Option<Vec<k8s::Subject>>) -> Vec<Subject> {
	subjects
		.unwrap_or_default()
		.into_iter()
		.filter_map(convert_subject)
		.collect()
}

fn convert_subject(subject: k8s::Subject) -> Option<Subject> {
	match subject.kind.as_str() {
		"User" => Some(Subject::user(subject.name)),
		"Group" => Some(Subject::group(subject.name)),
		"ServiceAccount" => Some(Subject {
			kind: SubjectKind::ServiceAccount,
			name: subject.name,
			namespace: subject.namespace.filter(|ns| !ns.is_empty()),
		}),
		other => {
			debug!(kind = other, name = %subject.name, "unknown subject kind dropped");
			None
		}
	}
}
