// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health HTTP handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use warden_rbac_core::PolicyKind;

use crate::api::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Ok,
	Syncing,
}

/// Number of policy objects currently held, per collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCounts {
	pub roles: usize,
	pub cluster_roles: usize,
	pub role_bindings: usize,
	pub cluster_role_bindings: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub policies: PolicyCounts,
}

/// GET /healthz - 200 once every policy collection is synced, 503 before.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let snapshot = state.store.snapshot();

	let (http_status, status) = if snapshot.is_fully_synced() {
		(StatusCode::OK, HealthStatus::Ok)
	} else {
		(StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Syncing)
	};

	let response = HealthResponse {
		status,
		policies: PolicyCounts {
			roles: snapshot.count(PolicyKind::Role),
			cluster_roles: snapshot.count(PolicyKind::ClusterRole),
			role_bindings: snapshot.count(PolicyKind::RoleBinding),
			cluster_role_bindings: snapshot.count(PolicyKind::ClusterRoleBinding),
		},
	};

	(http_status, Json(response))
}
