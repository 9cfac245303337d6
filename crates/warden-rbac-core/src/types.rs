// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy graph and request types.
//!
//! The policy graph mirrors Kubernetes RBAC:
//!
//! - [`Role`] / [`ClusterRole`]: named bundles of [`PolicyRule`]s
//! - [`RoleBinding`] / [`ClusterRoleBinding`]: grant a role's rules to [`Subject`]s
//!
//! [`RequestAttributes`] describes one request to be authorized. It is built once
//! by the attribute-extraction boundary and never mutated during a decision.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel meaning "every value" in any rule dimension.
pub const WILDCARD: &str = "*";

/// Username prefix Kubernetes assigns to service accounts.
pub const SERVICE_ACCOUNT_USER_PREFIX: &str = "system:serviceaccount:";

/// The four policy collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PolicyKind {
	Role,
	ClusterRole,
	RoleBinding,
	ClusterRoleBinding,
}

impl PolicyKind {
	pub const ALL: [PolicyKind; 4] = [
		PolicyKind::Role,
		PolicyKind::ClusterRole,
		PolicyKind::RoleBinding,
		PolicyKind::ClusterRoleBinding,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			PolicyKind::Role => "Role",
			PolicyKind::ClusterRole => "ClusterRole",
			PolicyKind::RoleBinding => "RoleBinding",
			PolicyKind::ClusterRoleBinding => "ClusterRoleBinding",
		}
	}
}

impl fmt::Display for PolicyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Kind of identity a binding subject refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
	User,
	Group,
	ServiceAccount,
}

/// A user, group or service account referenced by a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
	pub kind: SubjectKind,
	pub name: String,
	/// Only meaningful for [`SubjectKind::ServiceAccount`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub namespace: Option<String>,
}

impl Subject {
	pub fn user(name: impl Into<String>) -> Self {
		Self {
			kind: SubjectKind::User,
			name: name.into(),
			namespace: None,
		}
	}

	pub fn group(name: impl Into<String>) -> Self {
		Self {
			kind: SubjectKind::Group,
			name: name.into(),
			namespace: None,
		}
	}

	pub fn service_account(namespace: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			kind: SubjectKind::ServiceAccount,
			name: name.into(),
			namespace: Some(namespace.into()),
		}
	}
}

/// The atomic grant unit.
///
/// Every dimension is a list of accepted values where [`WILDCARD`] accepts
/// anything. An empty `resource_names` list places no restriction on names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
	#[serde(default)]
	pub verbs: Vec<String>,
	#[serde(default)]
	pub api_groups: Vec<String>,
	#[serde(default)]
	pub resources: Vec<String>,
	#[serde(default)]
	pub resource_names: Vec<String>,
	#[serde(default, rename = "nonResourceURLs")]
	pub non_resource_urls: Vec<String>,
}

fn owned<I, S>(values: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	values.into_iter().map(Into::into).collect()
}

impl PolicyRule {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder: set verbs.
	pub fn with_verbs<I, S>(mut self, verbs: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.verbs = owned(verbs);
		self
	}

	/// Builder: set API groups.
	pub fn with_api_groups<I, S>(mut self, groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.api_groups = owned(groups);
		self
	}

	/// Builder: set resources.
	pub fn with_resources<I, S>(mut self, resources: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.resources = owned(resources);
		self
	}

	/// Builder: set resource names.
	pub fn with_resource_names<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.resource_names = owned(names);
		self
	}

	/// Builder: set non-resource URL patterns.
	pub fn with_non_resource_urls<I, S>(mut self, urls: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.non_resource_urls = owned(urls);
		self
	}
}

/// Namespace-scoped bundle of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
	pub namespace: String,
	pub name: String,
	#[serde(default)]
	pub rules: Vec<PolicyRule>,
}

/// Cluster-scoped bundle of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRole {
	pub name: String,
	#[serde(default)]
	pub rules: Vec<PolicyRule>,
}

/// Which collection a binding's role reference points into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleRefKind {
	#[default]
	Role,
	ClusterRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
	#[serde(default)]
	pub kind: RoleRefKind,
	pub name: String,
}

impl RoleRef {
	pub fn role(name: impl Into<String>) -> Self {
		Self {
			kind: RoleRefKind::Role,
			name: name.into(),
		}
	}

	pub fn cluster_role(name: impl Into<String>) -> Self {
		Self {
			kind: RoleRefKind::ClusterRole,
			name: name.into(),
		}
	}
}

/// Grants the referenced role's rules to `subjects` within `namespace`.
///
/// A `ClusterRole` reference grants that cluster role's rules, still confined to
/// this binding's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
	pub namespace: String,
	pub name: String,
	#[serde(default)]
	pub subjects: Vec<Subject>,
	pub role_ref: RoleRef,
}

/// Grants the referenced cluster role's rules to `subjects` everywhere.
///
/// `role_ref.kind` is ignored; the reference always resolves to a [`ClusterRole`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRoleBinding {
	pub name: String,
	#[serde(default)]
	pub subjects: Vec<Subject>,
	pub role_ref: RoleRef,
}

/// Attributes of one request, as produced by the authentication layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestAttributes {
	pub user: String,
	pub groups: Vec<String>,
	pub verb: String,
	pub is_resource_request: bool,
	pub api_group: String,
	pub resource: String,
	pub subresource: String,
	pub resource_name: String,
	pub namespace: String,
	pub path: String,
}

impl RequestAttributes {
	/// Creates attributes for a resource request in the given API group.
	pub fn resource(
		user: impl Into<String>,
		verb: impl Into<String>,
		api_group: impl Into<String>,
		resource: impl Into<String>,
	) -> Self {
		Self {
			user: user.into(),
			verb: verb.into(),
			is_resource_request: true,
			api_group: api_group.into(),
			resource: resource.into(),
			..Default::default()
		}
	}

	/// Creates attributes for a non-resource request against a literal path.
	pub fn non_resource(
		user: impl Into<String>,
		verb: impl Into<String>,
		path: impl Into<String>,
	) -> Self {
		Self {
			user: user.into(),
			verb: verb.into(),
			is_resource_request: false,
			path: path.into(),
			..Default::default()
		}
	}

	/// Builder: set group memberships.
	pub fn with_groups<I, S>(mut self, groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.groups = owned(groups);
		self
	}

	/// Builder: set namespace.
	pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();
		self
	}

	/// Builder: set subresource.
	pub fn with_subresource(mut self, subresource: impl Into<String>) -> Self {
		self.subresource = subresource.into();
		self
	}

	/// Builder: set resource name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.resource_name = name.into();
		self
	}

	/// Builder: set the raw request path.
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self
	}

	/// `resource` or `resource/subresource`.
	pub fn combined_resource(&self) -> Cow<'_, str> {
		combine_resource(&self.resource, &self.subresource)
	}

	pub fn is_namespaced(&self) -> bool {
		!self.namespace.is_empty()
	}
}

pub(crate) fn combine_resource<'a>(resource: &'a str, subresource: &str) -> Cow<'a, str> {
	if subresource.is_empty() {
		Cow::Borrowed(resource)
	} else {
		Cow::Owned(format!("{resource}/{subresource}"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn combined_resource_without_subresource() {
		let attrs = RequestAttributes::resource("alice", "get", "", "pods");
		assert_eq!(attrs.combined_resource(), "pods");
	}

	#[test]
	fn combined_resource_with_subresource() {
		let attrs = RequestAttributes::resource("alice", "get", "", "pods").with_subresource("logs");
		assert_eq!(attrs.combined_resource(), "pods/logs");
	}

	#[test]
	fn namespaced_only_when_namespace_set() {
		let attrs = RequestAttributes::resource("alice", "get", "", "pods");
		assert!(!attrs.is_namespaced());
		assert!(attrs.in_namespace("team-a").is_namespaced());
	}

	#[test]
	fn policy_rule_deserializes_kubernetes_field_names() {
		let rule: PolicyRule = serde_json::from_str(
			r#"{"verbs":["get"],"apiGroups":[""],"resources":["pods"],"resourceNames":["web"],"nonResourceURLs":["/healthz"]}"#,
		)
		.unwrap();
		assert_eq!(rule.verbs, vec!["get"]);
		assert_eq!(rule.api_groups, vec![""]);
		assert_eq!(rule.resource_names, vec!["web"]);
		assert_eq!(rule.non_resource_urls, vec!["/healthz"]);
	}

	#[test]
	fn role_ref_kind_defaults_to_role() {
		let binding: RoleBinding = serde_json::from_str(
			r#"{"namespace":"team-a","name":"edit","subjects":[{"kind":"Group","name":"editors"}],"roleRef":{"name":"editor"}}"#,
		)
		.unwrap();
		assert_eq!(binding.role_ref, RoleRef::role("editor"));
		assert_eq!(binding.subjects, vec![Subject::group("editors")]);
	}

	#[test]
	fn request_attributes_deserialize_with_missing_fields() {
		let attrs: RequestAttributes =
			serde_json::from_str(r#"{"user":"bob","verb":"get","path":"/healthz"}"#).unwrap();
		assert_eq!(attrs.user, "bob");
		assert!(!attrs.is_resource_request);
		assert!(attrs.groups.is_empty());
	}
}
