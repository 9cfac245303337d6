// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for policy synchronization.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while loading policy into the store.
#[derive(Error, Debug)]
pub enum SyncError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	#[error("Failed to read policy file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse policy file {path}: {source}")]
	FileParse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

impl From<kube::Error> for SyncError {
	fn from(err: kube::Error) -> Self {
		SyncError::ApiError {
			message: err.to_string(),
		}
	}
}
