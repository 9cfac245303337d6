// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::http::StatusCode;

/// Forward-auth target. Only reached once admission has let the request
/// through.
pub async fn forward_auth() -> StatusCode {
	StatusCode::NO_CONTENT
}
