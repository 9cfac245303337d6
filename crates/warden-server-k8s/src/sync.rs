// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Watches cluster RBAC objects and mirrors them into an [`InMemoryPolicyStore`].

use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::rbac::v1 as k8s;
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use warden_rbac_core::{InMemoryPolicyStore, PolicyObject};

use crate::convert::RbacObject;
use crate::error::SyncResult;

/// Keeps an [`InMemoryPolicyStore`] in step with the cluster's RBAC objects.
pub struct PolicySync {
	client: Client,
	store: Arc<InMemoryPolicyStore>,
}

impl PolicySync {
	/// Connects using the ambient cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn connect(store: Arc<InMemoryPolicyStore>) -> SyncResult<Self> {
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self::new(client, store))
	}

	pub fn new(client: Client, store: Arc<InMemoryPolicyStore>) -> Self {
		Self { client, store }
	}

	/// Runs the four RBAC watchers until `shutdown` is cancelled.
	///
	/// Watch failures are retried with backoff; whatever was synced before the
	/// failure keeps being served.
	#[instrument(skip_all)]
	pub async fn run(self, shutdown: CancellationToken) {
		info!("starting RBAC watchers");

		let watchers = futures::future::join4(
			watch::<k8s::Role>(Api::all(self.client.clone()), self.store.clone()),
			watch::<k8s::ClusterRole>(Api::all(self.client.clone()), self.store.clone()),
			watch::<k8s::RoleBinding>(Api::all(self.client.clone()), self.store.clone()),
			watch::<k8s::ClusterRoleBinding>(Api::all(self.client.clone()), self.store.clone()),
		);

		tokio::select! {
			_ = watchers => warn!("RBAC watchers exited"),
			_ = shutdown.cancelled() => info!("RBAC watchers stopped"),
		}
	}
}

async fn watch<K: RbacObject>(api: Api<K>, store: Arc<InMemoryPolicyStore>) {
	let mut events = watcher::watcher(api, watcher::Config::default())
		.default_backoff()
		.boxed();
	let mut applier = EventApplier::<K>::new(store);

	while let Some(event) = events.next().await {
		match event {
			Ok(event) => applier.apply(event),
			Err(err) => warn!(kind = %K::KIND, error = %err, "RBAC watch failed, retrying"),
		}
	}
}

/// Applies the watch events of one kind to the store.
///
/// An initial (re)list is buffered and swapped in as a whole on `InitDone`, so
/// readers never see a half-listed collection.
pub struct EventApplier<K> {
	store: Arc<InMemoryPolicyStore>,
	relist: Option<Vec<PolicyObject>>,
	_kind: PhantomData<fn() -> K>,
}

impl<K: RbacObject> EventApplier<K> {
	pub fn new(store: Arc<InMemoryPolicyStore>) -> Self {
		Self {
			store,
			relist: None,
			_kind: PhantomData,
		}
	}

	pub fn apply(&mut self, event: Event<K>) {
		match event {
			Event::Init => {
				debug!(kind = %K::KIND, "listing");
				self.relist = Some(Vec::new());
			}
			Event::InitApply(obj) => {
				if let Some(object) = obj.into_policy() {
					self.relist.get_or_insert_with(Vec::new).push(object);
				}
			}
			Event::InitDone => {
				let objects = self.relist.take().unwrap_or_default();
				info!(kind = %K::KIND, count = objects.len(), "RBAC collection synced");
				self.store.replace(K::KIND, objects);
			}
			Event::Apply(obj) => {
				if let Some(object) = obj.into_policy() {
					self.store.apply(object);
				}
			}
			Event::Delete(obj) => {
				let namespace = obj.namespace();
				self.store.remove(K::KIND, namespace.as_deref(), &obj.name_any());
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
	use warden_rbac_core::{PolicyKind, PolicyStore, StoreError};

	fn cluster_role(name: &str) -> k8s::ClusterRole {
		k8s::ClusterRole {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			..Default::default()
		}
	}

	fn role(namespace: &str, name: &str) -> k8s::Role {
		k8s::Role {
			metadata: ObjectMeta {
				namespace: Some(namespace.to_string()),
				name: Some(name.to_string()),
				..Default::default()
			},
			rules: None,
		}
	}

	fn applier<K: RbacObject>() -> (Arc<InMemoryPolicyStore>, EventApplier<K>) {
		let store = Arc::new(InMemoryPolicyStore::new());
		(store.clone(), EventApplier::new(store))
	}

	#[test]
	fn kind_is_unsynced_until_init_done() {
		let (store, mut applier) = applier::<k8s::ClusterRole>();
		applier.apply(Event::Init);
		applier.apply(Event::InitApply(cluster_role("viewer")));

		assert!(!store.snapshot().is_synced(PolicyKind::ClusterRole));
		assert_eq!(
			store.get_cluster_role("viewer").unwrap_err(),
			StoreError::NotSynced {
				kind: PolicyKind::ClusterRole
			}
		);

		applier.apply(Event::InitDone);
		assert!(store.snapshot().is_synced(PolicyKind::ClusterRole));
		assert_eq!(store.get_cluster_role("viewer").unwrap().name, "viewer");
	}

	#[test]
	fn relist_replaces_previous_contents() {
		let (store, mut applier) = applier::<k8s::ClusterRole>();
		applier.apply(Event::Init);
		applier.apply(Event::InitApply(cluster_role("old")));
		applier.apply(Event::InitDone);

		applier.apply(Event::Init);
		applier.apply(Event::InitApply(cluster_role("new")));
		assert!(store.snapshot().is_synced(PolicyKind::ClusterRole));
		assert!(store.get_cluster_role("old").is_ok());

		applier.apply(Event::InitDone);
		assert!(store.get_cluster_role("old").unwrap_err().is_not_found());
		assert!(store.get_cluster_role("new").is_ok());
	}

	#[test]
	fn apply_and_delete_update_one_object() {
		let (store, mut applier) = applier::<k8s::Role>();
		applier.apply(Event::Init);
		applier.apply(Event::InitDone);

		applier.apply(Event::Apply(role("team-a", "editor")));
		assert!(store.get_role("team-a", "editor").is_ok());
		assert!(store.get_role("team-b", "editor").unwrap_err().is_not_found());

		applier.apply(Event::Delete(role("team-a", "editor")));
		assert!(store.get_role("team-a", "editor").unwrap_err().is_not_found());
	}

	#[test]
	fn unusable_objects_are_skipped() {
		let (store, mut applier) = applier::<k8s::Role>();
		applier.apply(Event::Init);
		applier.apply(Event::InitApply(k8s::Role::default()));
		applier.apply(Event::InitApply(role("team-a", "editor")));
		applier.apply(Event::InitDone);

		assert_eq!(store.snapshot().count(PolicyKind::Role), 1);
	}
}
