// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy rule matching.
//!
//! A rule is tested against either the resource dimensions of a request
//! (API group, resource, subresource, name, verb) or its literal path, never
//! both. [`matches_request`] picks the right matcher from
//! [`RequestAttributes::is_resource_request`].
//!
//! Resource entries support three wildcard shapes:
//!
//! | entry | matches |
//! |-------|---------|
//! | `*` | every resource and subresource |
//! | `pods/*` | every subresource of `pods` (and `pods` itself) |
//! | `*/status` | the `status` subresource of every resource |
//!
//! Non-resource URL entries match exactly, or by prefix when they end in `*`.

use crate::types::{combine_resource, PolicyRule, RequestAttributes, WILDCARD};

/// Returns true if `rule` grants the request described by `attrs`.
pub fn matches_request(rule: &PolicyRule, attrs: &RequestAttributes) -> bool {
	if attrs.is_resource_request {
		matches_resource_rule(
			rule,
			&attrs.api_group,
			&attrs.resource,
			&attrs.subresource,
			&attrs.resource_name,
			&attrs.verb,
		)
	} else {
		matches_non_resource_rule(rule, &attrs.verb, &attrs.path)
	}
}

/// Returns true if `rule` grants `verb` on the given resource coordinates.
pub fn matches_resource_rule(
	rule: &PolicyRule,
	api_group: &str,
	resource: &str,
	subresource: &str,
	resource_name: &str,
	verb: &str,
) -> bool {
	if !verb_matches(rule, verb) {
		return false;
	}

	if resource.is_empty() {
		return false;
	}

	if !has_value_or_wildcard(&rule.api_groups, api_group) {
		return false;
	}

	if !rule.resource_names.is_empty() && !has_value(&rule.resource_names, resource_name) {
		return false;
	}

	let combined = combine_resource(resource, subresource);

	rule
		.resources
		.iter()
		.any(|entry| resource_entry_matches(entry, resource, subresource, &combined))
}

/// Returns true if `rule` grants `verb` on the literal `path`.
pub fn matches_non_resource_rule(rule: &PolicyRule, verb: &str, path: &str) -> bool {
	if !verb_matches(rule, verb) {
		return false;
	}

	if path.is_empty() {
		return false;
	}

	rule
		.non_resource_urls
		.iter()
		.any(|pattern| path_matches(path, pattern))
}

fn verb_matches(rule: &PolicyRule, verb: &str) -> bool {
	has_value_or_wildcard(&rule.verbs, verb)
}

fn resource_entry_matches(entry: &str, resource: &str, subresource: &str, combined: &str) -> bool {
	if entry == WILDCARD || entry == combined {
		return true;
	}

	if !subresource.is_empty() {
		if let Some(sub) = entry.strip_prefix("*/") {
			if sub == subresource {
				return true;
			}
		}
	}

	matches!(entry.strip_suffix("/*"), Some(res) if res == resource)
}

/// Matches a request path against a non-resource URL pattern.
pub fn path_matches(path: &str, pattern: &str) -> bool {
	if pattern == WILDCARD || pattern == path {
		return true;
	}

	match pattern.strip_suffix('*') {
		Some(prefix) => path.starts_with(prefix),
		None => false,
	}
}

fn has_value(values: &[String], value: &str) -> bool {
	values.iter().any(|v| v == value)
}

fn has_value_or_wildcard(values: &[String], value: &str) -> bool {
	values.iter().any(|v| v == value || v == WILDCARD)
}
