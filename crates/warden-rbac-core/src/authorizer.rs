// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! RBAC authorization decisions.
//!
//! [`Authorizer::authorize`] evaluates a request in three stages and stops at
//! the first grant:
//!
//! 1. **Allow-list**: requests on the built-in [`AllowList`] are permitted
//! 2. **Cluster scope**: rules from ClusterRoleBindings covering the subject
//! 3. **Namespace scope**: only for namespaced requests, rules from the
//!    namespace's RoleBindings
//!
//! A request no rule grants is denied with "permission undefined". A policy
//! store failure in either scope yields [`Decision::EvaluationError`] instead,
//! so callers can distinguish "not allowed" from "could not decide".

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::builtin::AllowList;
use crate::decision::{Decision, Denial};
use crate::error::StoreResult;
use crate::resolver::{BindingResolver, Scope};
use crate::rule;
use crate::store::PolicyStore;
use crate::types::RequestAttributes;

/// Decides whether requests are permitted by the policy graph.
///
/// Cheap to share: holds only the store handle and the allow-list.
#[derive(Clone)]
pub struct Authorizer {
	store: Arc<dyn PolicyStore>,
	allow_list: AllowList,
}

impl Authorizer {
	/// Creates an authorizer over `store` using the default allow-list.
	pub fn new(store: Arc<dyn PolicyStore>) -> Self {
		Self {
			store,
			allow_list: AllowList::default(),
		}
	}

	/// Builder: replace the allow-list.
	pub fn with_allow_list(mut self, allow_list: AllowList) -> Self {
		self.allow_list = allow_list;
		self
	}

	pub fn allow_list(&self) -> &AllowList {
		&self.allow_list
	}

	/// Evaluates one request.
	#[instrument(
		level = "debug",
		skip(self, attrs),
		fields(
			user = %attrs.user,
			verb = %attrs.verb,
			resource = %attrs.combined_resource(),
			namespace = %attrs.namespace,
			path = %attrs.path,
		)
	)]
	pub fn authorize(&self, attrs: &RequestAttributes) -> Decision {
		if self.allow_list.permits(attrs) {
			debug!("permitted by built-in allow-list");
			return Decision::Permit;
		}

		match self.check_scope(Scope::Cluster, attrs) {
			Ok(true) => return Decision::Permit,
			Ok(false) => {}
			Err(err) => return evaluation_failed(Scope::Cluster, err),
		}

		if attrs.is_namespaced() {
			let scope = Scope::Namespace(&attrs.namespace);
			match self.check_scope(scope, attrs) {
				Ok(true) => return Decision::Permit,
				Ok(false) => {}
				Err(err) => return evaluation_failed(scope, err),
			}
		}

		let denial = Denial::permission_undefined(attrs);
		info!(reason = %denial, "request denied");
		Decision::Deny(denial)
	}

	/// Returns true if any rule granted in `scope` matches the request.
	fn check_scope(&self, scope: Scope<'_>, attrs: &RequestAttributes) -> StoreResult<bool> {
		let resolver = BindingResolver::new(self.store.as_ref());
		let roles = resolver.resolve(scope, &attrs.user, &attrs.groups)?;

		let grant = roles.iter().find(|resolved| {
			resolved
				.rules()
				.iter()
				.any(|r| rule::matches_request(r, attrs))
		});

		if let Some(resolved) = grant {
			debug!(
				scope = %scope,
				binding = %resolved.binding,
				role = %resolved.role_ref.name,
				"permitted by binding"
			);
			return Ok(true);
		}

		Ok(false)
	}
}

fn evaluation_failed(scope: Scope<'_>, err: crate::error::StoreError) -> Decision {
	warn!(scope = %scope, error = %err, "policy evaluation failed");
	Decision::EvaluationError(err)
}
