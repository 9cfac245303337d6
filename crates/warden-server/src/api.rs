// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;

use axum::{
	middleware,
	routing::{get, post},
	Router,
};
use warden_rbac_core::{Authorizer, InMemoryPolicyStore};
use warden_server_config::ServerConfig;

use crate::admission::AdmissionLayer;
use crate::error::ServerError;
use crate::identity::IdentityHeaders;
use crate::routes;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
	pub authorizer: Authorizer,
	pub store: Arc<InMemoryPolicyStore>,
	pub admission: AdmissionLayer,
	/// Where review callers' identity is read from, besides request extensions.
	pub identity_headers: Option<IdentityHeaders>,
}

/// Builds the application state over `store` from the resolved configuration.
pub fn create_app_state(
	config: &ServerConfig,
	store: Arc<InMemoryPolicyStore>,
) -> Result<AppState, ServerError> {
	let authorizer =
		Authorizer::new(store.clone()).with_allow_list(config.builtin.allow_list());
	let admission = AdmissionLayer::from_config(authorizer.clone(), &config.admission)?;
	let identity_headers = IdentityHeaders::from_config(&config.admission)?;

	Ok(AppState {
		authorizer,
		store,
		admission,
		identity_headers,
	})
}

/// Creates the router.
///
/// `/healthz` is open. `/v1/authorize` requires an identity allowed to `post`
/// to it. Every other request is a forward-auth check guarded by the
/// admission layer.
pub fn create_router(state: AppState) -> Router {
	let forward_auth = Router::new()
		.fallback(routes::forward_auth::forward_auth)
		.layer(state.admission.clone());

	let review = Router::new()
		.route(
			routes::authorize::REVIEW_PATH,
			post(routes::authorize::authorize),
		)
		.layer(middleware::from_fn_with_state(
			state.clone(),
			routes::authorize::review_guard,
		));

	Router::new()
		.route("/healthz", get(routes::health::health_check))
		.merge(review)
		.with_state(state)
		.fallback_service(forward_auth)
}
