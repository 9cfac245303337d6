// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read access to the policy graph.
//!
//! [`PolicyStore`] is the query interface the authorizer consumes.
//! [`InMemoryPolicyStore`] is the shared implementation: a copy-on-write
//! [`PolicySnapshot`] that a single background synchronizer replaces while any
//! number of request handlers read from it.
//!
//! # Consistency
//!
//! Each trait call reads whichever snapshot is current at that moment. A decision
//! that lists bindings and then fetches a role may therefore observe two
//! different snapshots if an update lands in between. This is accepted: the
//! store is eventually consistent, not linearizable.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::types::{ClusterRole, ClusterRoleBinding, PolicyKind, Role, RoleBinding};

/// Query interface over the current policy graph.
///
/// Lookups return a best-effort point-in-time view. `get_*` methods report
/// missing objects as [`StoreError::NotFound`]; every other error means the
/// store could not answer at all.
pub trait PolicyStore: Send + Sync {
	fn list_cluster_role_bindings(&self) -> StoreResult<Vec<Arc<ClusterRoleBinding>>>;

	fn get_cluster_role(&self, name: &str) -> StoreResult<Arc<ClusterRole>>;

	fn list_role_bindings(&self, namespace: &str) -> StoreResult<Vec<Arc<RoleBinding>>>;

	fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Arc<Role>>;
}

impl<T: PolicyStore + ?Sized> PolicyStore for Arc<T> {
	fn list_cluster_role_bindings(&self) -> StoreResult<Vec<Arc<ClusterRoleBinding>>> {
		(**self).list_cluster_role_bindings()
	}

	fn get_cluster_role(&self, name: &str) -> StoreResult<Arc<ClusterRole>> {
		(**self).get_cluster_role(name)
	}

	fn list_role_bindings(&self, namespace: &str) -> StoreResult<Vec<Arc<RoleBinding>>> {
		(**self).list_role_bindings(namespace)
	}

	fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Arc<Role>> {
		(**self).get_role(namespace, name)
	}
}

/// Any one policy object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyObject {
	Role(Role),
	ClusterRole(ClusterRole),
	RoleBinding(RoleBinding),
	ClusterRoleBinding(ClusterRoleBinding),
}

impl PolicyObject {
	pub fn kind(&self) -> PolicyKind {
		match self {
			PolicyObject::Role(_) => PolicyKind::Role,
			PolicyObject::ClusterRole(_) => PolicyKind::ClusterRole,
			PolicyObject::RoleBinding(_) => PolicyKind::RoleBinding,
			PolicyObject::ClusterRoleBinding(_) => PolicyKind::ClusterRoleBinding,
		}
	}

	pub fn name(&self) -> &str {
		match self {
			PolicyObject::Role(r) => &r.name,
			PolicyObject::ClusterRole(r) => &r.name,
			PolicyObject::RoleBinding(b) => &b.name,
			PolicyObject::ClusterRoleBinding(b) => &b.name,
		}
	}

	/// Namespace for namespaced kinds, `None` for cluster-scoped ones.
	pub fn namespace(&self) -> Option<&str> {
		match self {
			PolicyObject::Role(r) => Some(&r.namespace),
			PolicyObject::RoleBinding(b) => Some(&b.namespace),
			PolicyObject::ClusterRole(_) | PolicyObject::ClusterRoleBinding(_) => None,
		}
	}
}

impl From<Role> for PolicyObject {
	fn from(role: Role) -> Self {
		PolicyObject::Role(role)
	}
}

impl From<ClusterRole> for PolicyObject {
	fn from(role: ClusterRole) -> Self {
		PolicyObject::ClusterRole(role)
	}
}

impl From<RoleBinding> for PolicyObject {
	fn from(binding: RoleBinding) -> Self {
		PolicyObject::RoleBinding(binding)
	}
}

impl From<ClusterRoleBinding> for PolicyObject {
	fn from(binding: ClusterRoleBinding) -> Self {
		PolicyObject::ClusterRoleBinding(binding)
	}
}

/// A complete policy graph in serializable form, used for static policy files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySet {
	pub roles: Vec<Role>,
	pub cluster_roles: Vec<ClusterRole>,
	pub role_bindings: Vec<RoleBinding>,
	pub cluster_role_bindings: Vec<ClusterRoleBinding>,
}

impl PolicySet {
	pub fn into_objects(self) -> impl Iterator<Item = PolicyObject> {
		self
			.roles
			.into_iter()
			.map(PolicyObject::from)
			.chain(self.cluster_roles.into_iter().map(PolicyObject::from))
			.chain(self.role_bindings.into_iter().map(PolicyObject::from))
			.chain(self.cluster_role_bindings.into_iter().map(PolicyObject::from))
	}
}

type Namespaced<T> = BTreeMap<String, BTreeMap<String, Arc<T>>>;

/// Immutable view of the policy graph at one point in time.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
	roles: Namespaced<Role>,
	cluster_roles: BTreeMap<String, Arc<ClusterRole>>,
	role_bindings: Namespaced<RoleBinding>,
	cluster_role_bindings: BTreeMap<String, Arc<ClusterRoleBinding>>,
	synced: BTreeSet<PolicyKind>,
}

impl PolicySnapshot {
	/// Returns true once the initial listing of `kind` has completed.
	pub fn is_synced(&self, kind: PolicyKind) -> bool {
		self.synced.contains(&kind)
	}

	/// Returns true once every collection has completed its initial listing.
	pub fn is_fully_synced(&self) -> bool {
		PolicyKind::ALL.iter().all(|kind| self.is_synced(*kind))
	}

	/// Number of stored objects of `kind`.
	pub fn count(&self, kind: PolicyKind) -> usize {
		match kind {
			PolicyKind::Role => self.roles.values().map(BTreeMap::len).sum(),
			PolicyKind::ClusterRole => self.cluster_roles.len(),
			PolicyKind::RoleBinding => self.role_bindings.values().map(BTreeMap::len).sum(),
			PolicyKind::ClusterRoleBinding => self.cluster_role_bindings.len(),
		}
	}

	fn require_synced(&self, kind: PolicyKind) -> StoreResult<()> {
		if self.is_synced(kind) {
			Ok(())
		} else {
			Err(StoreError::NotSynced { kind })
		}
	}

	fn insert(&mut self, object: PolicyObject) {
		match object {
			PolicyObject::Role(role) => {
				self
					.roles
					.entry(role.namespace.clone())
					.or_default()
					.insert(role.name.clone(), Arc::new(role));
			}
			PolicyObject::ClusterRole(role) => {
				self.cluster_roles.insert(role.name.clone(), Arc::new(role));
			}
			PolicyObject::RoleBinding(binding) => {
				self
					.role_bindings
					.entry(binding.namespace.clone())
					.or_default()
					.insert(binding.name.clone(), Arc::new(binding));
			}
			PolicyObject::ClusterRoleBinding(binding) => {
				self
					.cluster_role_bindings
					.insert(binding.name.clone(), Arc::new(binding));
			}
		}
	}

	fn remove(&mut self, kind: PolicyKind, namespace: Option<&str>, name: &str) -> bool {
		match (kind, namespace) {
			(PolicyKind::Role, Some(ns)) => remove_namespaced(&mut self.roles, ns, name),
			(PolicyKind::RoleBinding, Some(ns)) => remove_namespaced(&mut self.role_bindings, ns, name),
			(PolicyKind::ClusterRole, _) => self.cluster_roles.remove(name).is_some(),
			(PolicyKind::ClusterRoleBinding, _) => self.cluster_role_bindings.remove(name).is_some(),
			(PolicyKind::Role | PolicyKind::RoleBinding, None) => false,
		}
	}

	fn clear(&mut self, kind: PolicyKind) {
		match kind {
			PolicyKind::Role => self.roles.clear(),
			PolicyKind::ClusterRole => self.cluster_roles.clear(),
			PolicyKind::RoleBinding => self.role_bindings.clear(),
			PolicyKind::ClusterRoleBinding => self.cluster_role_bindings.clear(),
		}
	}
}

fn remove_namespaced<T>(map: &mut Namespaced<T>, namespace: &str, name: &str) -> bool {
	let Some(inner) = map.get_mut(namespace) else {
		return false;
	};
	let removed = inner.remove(name).is_some();
	if inner.is_empty() {
		map.remove(namespace);
	}
	removed
}

impl PolicyStore for PolicySnapshot {
	fn list_cluster_role_bindings(&self) -> StoreResult<Vec<Arc<ClusterRoleBinding>>> {
		self.require_synced(PolicyKind::ClusterRoleBinding)?;
		Ok(self.cluster_role_bindings.values().cloned().collect())
	}

	fn get_cluster_role(&self, name: &str) -> StoreResult<Arc<ClusterRole>> {
		self.require_synced(PolicyKind::ClusterRole)?;
		self
			.cluster_roles
			.get(name)
			.cloned()
			.ok_or_else(|| StoreError::not_found(PolicyKind::ClusterRole, None, name))
	}

	fn list_role_bindings(&self, namespace: &str) -> StoreResult<Vec<Arc<RoleBinding>>> {
		self.require_synced(PolicyKind::RoleBinding)?;
		Ok(
			self
				.role_bindings
				.get(namespace)
				.map(|bindings| bindings.values().cloned().collect())
				.unwrap_or_default(),
		)
	}

	fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Arc<Role>> {
		self.require_synced(PolicyKind::Role)?;
		self
			.roles
			.get(namespace)
			.and_then(|roles| roles.get(name))
			.cloned()
			.ok_or_else(|| StoreError::not_found(PolicyKind::Role, Some(namespace), name))
	}
}

/// Thread-safe policy store holding the current [`PolicySnapshot`].
///
/// Readers clone the current `Arc` and release the lock immediately, so a slow
/// decision never blocks the synchronizer. Writers copy the snapshot if it is
/// still shared, modify the copy, and publish it.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
	current: RwLock<Arc<PolicySnapshot>>,
}

impl InMemoryPolicyStore {
	/// Creates an empty store with no collection synced.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a store holding `policies` with every collection marked synced.
	pub fn from_policy_set(policies: PolicySet) -> Self {
		let store = Self::new();
		store.load(policies);
		store
	}

	/// Returns the current snapshot.
	pub fn snapshot(&self) -> Arc<PolicySnapshot> {
		self.current.read().clone()
	}

	/// Returns true once every collection has completed its initial listing.
	pub fn is_synced(&self) -> bool {
		self.snapshot().is_fully_synced()
	}

	/// Inserts or replaces one object.
	pub fn apply(&self, object: PolicyObject) {
		debug!(kind = %object.kind(), namespace = ?object.namespace(), name = object.name(), "policy object applied");
		self.update(|snapshot| snapshot.insert(object));
	}

	/// Removes one object. Removing an unknown object is a no-op.
	pub fn remove(&self, kind: PolicyKind, namespace: Option<&str>, name: &str) {
		self.update(|snapshot| {
			if snapshot.remove(kind, namespace, name) {
				debug!(kind = %kind, namespace = ?namespace, name, "policy object removed");
			}
		});
	}

	/// Replaces the whole `kind` collection and marks it synced.
	///
	/// Objects of any other kind are ignored.
	pub fn replace(&self, kind: PolicyKind, objects: Vec<PolicyObject>) {
		self.update(|snapshot| {
			snapshot.clear(kind);
			for object in objects.into_iter().filter(|o| o.kind() == kind) {
				snapshot.insert(object);
			}
			snapshot.synced.insert(kind);
			debug!(kind = %kind, count = snapshot.count(kind), "policy collection replaced");
		});
	}

	/// Replaces every collection with `policies` and marks all of them synced.
	pub fn load(&self, policies: PolicySet) {
		self.update(|snapshot| {
			let mut next = PolicySnapshot::default();
			for object in policies.into_objects() {
				next.insert(object);
			}
			next.synced.extend(PolicyKind::ALL);
			*snapshot = next;
		});
	}

	fn update<F>(&self, f: F)
	where
		F: FnOnce(&mut PolicySnapshot),
	{
		let mut current = self.current.write();
		f(Arc::make_mut(&mut *current));
	}
}

impl PolicyStore for InMemoryPolicyStore {
	fn list_cluster_role_bindings(&self) -> StoreResult<Vec<Arc<ClusterRoleBinding>>> {
		self.snapshot().list_cluster_role_bindings()
	}

	fn get_cluster_role(&self, name: &str) -> StoreResult<Arc<ClusterRole>> {
		self.snapshot().get_cluster_role(name)
	}

	fn list_role_bindings(&self, namespace: &str) -> StoreResult<Vec<Arc<RoleBinding>>> {
		self.snapshot().list_role_bindings(namespace)
	}

	fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Arc<Role>> {
		self.snapshot().get_role(namespace, name)
	}
}
