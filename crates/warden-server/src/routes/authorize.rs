// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization review endpoint.
//!
//! Callers must carry an identity that RBAC allows to `post` to
//! [`REVIEW_PATH`], as a non-resource URL.

use axum::{
	extract::{Request, State},
	http::StatusCode,
	middleware::Next,
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use warden_rbac_core::{Decision, RequestAttributes};

use crate::admission::{evaluation_error_response, forbidden_response};
use crate::api::AppState;
use crate::error::ErrorResponse;
use crate::identity::identity_of;

pub const REVIEW_PATH: &str = "/v1/authorize";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
	Permit,
	Deny,
	Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeResponse {
	pub decision: DecisionKind,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

impl From<Decision> for AuthorizeResponse {
	fn from(decision: Decision) -> Self {
		match decision {
			Decision::Permit => Self {
				decision: DecisionKind::Permit,
				reason: None,
			},
			Decision::Deny(denial) => Self {
				decision: DecisionKind::Deny,
				reason: Some(denial.to_string()),
			},
			Decision::EvaluationError(_) => Self {
				decision: DecisionKind::Error,
				reason: Some("Authorization could not be evaluated".to_string()),
			},
		}
	}
}

/// Admits review callers that are themselves authorized to post reviews.
pub async fn review_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
	let Some(identity) = identity_of(&request, state.identity_headers.as_ref()) else {
		info!("review rejected: no identity on request");
		return (
			StatusCode::UNAUTHORIZED,
			Json(ErrorResponse::new(
				"unauthorized",
				"An authenticated identity is required",
			)),
		)
			.into_response();
	};

	let caller = RequestAttributes::non_resource(identity.user, "post", REVIEW_PATH)
		.with_groups(identity.groups);
	match state.authorizer.authorize(&caller) {
		Decision::Permit => next.run(request).await,
		Decision::Deny(denial) => forbidden_response(&denial),
		Decision::EvaluationError(_) => evaluation_error_response(),
	}
}

/// POST /v1/authorize - evaluate the posted request attributes.
///
/// Permit and deny are both answered with 200; an evaluation error is a 500.
#[instrument(skip_all, fields(user = %attrs.user))]
pub async fn authorize(
	State(state): State<AppState>,
	Json(attrs): Json<RequestAttributes>,
) -> impl IntoResponse {
	let response = AuthorizeResponse::from(state.authorizer.authorize(&attrs));
	let status = match response.decision {
		DecisionKind::Error => StatusCode::INTERNAL_SERVER_ERROR,
		DecisionKind::Permit | DecisionKind::Deny => StatusCode::OK,
	};
	(status, Json(response))
}
