// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for warden-server.

pub mod admission;
pub mod builtin;
pub mod http;
pub mod logging;
pub mod policy;

pub use admission::{AdmissionConfig, AdmissionConfigLayer};
pub use builtin::{BuiltinConfig, BuiltinConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use policy::{PolicyConfig, PolicyConfigLayer, PolicySource};
