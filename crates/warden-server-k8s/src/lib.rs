// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy sources for the Warden policy store.
//!
//! This crate provides:
//! - Kubernetes RBAC watchers that keep an `InMemoryPolicyStore` current
//! - Conversion from `rbac.authorization.k8s.io/v1` objects
//! - A static JSON policy file loader

mod convert;
mod error;
mod file;
mod sync;

pub use convert::RbacObject;
pub use error::{SyncError, SyncResult};
pub use file::{load_policy_file, read_policy_file};
pub use sync::{EventApplier, PolicySync};
