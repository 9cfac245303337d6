// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP admission server for Warden.
//!
//! Puts the [`warden_rbac_core::Authorizer`] behind an HTTP boundary: an
//! admission middleware for in-process use or forward-auth, a review endpoint,
//! and a health probe that reports policy sync state.

pub mod admission;
pub mod api;
pub mod error;
pub mod identity;
pub mod request_info;
pub mod routes;

pub use admission::{AdmissionLayer, AdmissionService};
pub use api::{create_app_state, create_router, AppState};
pub use error::{ErrorResponse, ServerError};
pub use identity::{Identity, IdentityHeaders};
pub use request_info::{RequestInfo, RequestInfoError};
pub use warden_server_config::ServerConfig;
