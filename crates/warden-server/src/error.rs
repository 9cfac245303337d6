// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use warden_server_config::ConfigError;
use warden_server_k8s::SyncError;

/// Server error types.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// Configuration could not be loaded or is invalid.
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	/// Policy could not be loaded.
	#[error("Policy error: {0}")]
	Policy(#[from] SyncError),

	/// A configured header name is not a valid HTTP header name.
	#[error("Invalid header name {name:?}: {message}")]
	InvalidHeader { name: String, message: String },

	/// Invalid request payload.
	#[error("Invalid request: {0}")]
	BadRequest(String),

	/// Socket or filesystem failure.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: message.into(),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, error_response) = match &self {
			ServerError::BadRequest(msg) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse::new("bad_request", msg.clone()),
			),
			other => {
				tracing::error!(error = %other, "internal error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse::new("internal_error", "An internal error occurred"),
				)
			}
		};

		(status, Json(error_response)).into_response()
	}
}
