//! Per-section validators: engine, call timings, and lifecycle service.

use crate::schema::HuddleConfig;

use super::helpers::validate_range;

/// An app id is required before any join; whitespace is never valid.
pub(crate) fn validate_engine(errors: &mut Vec<String>, config: &HuddleConfig) {
    let app_id = &config.engine.app_id;
    if !app_id.is_empty() && app_id.trim().len() != app_id.len() {
        errors.push("engine.app_id must not contain surrounding whitespace".into());
    }
}

/// Validate call timing constraints.
pub(crate) fn validate_call(errors: &mut Vec<String>, config: &HuddleConfig) {
    let call = &config.call;
    validate_range(
        errors,
        "call.join_wait_timeout_ms",
        call.join_wait_timeout_ms,
        100,
        30000,
    );
    validate_range(
        errors,
        "call.join_timeout_ms",
        call.join_timeout_ms,
        1000,
        120000,
    );
    validate_range(
        errors,
        "call.acquisition_timeout_ms",
        call.acquisition_timeout_ms,
        1000,
        60000,
    );
    validate_range(
        errors,
        "call.tick_interval_ms",
        call.tick_interval_ms,
        100,
        10000,
    );
}

/// Validate lifecycle service constraints.
pub(crate) fn validate_lifecycle(errors: &mut Vec<String>, config: &HuddleConfig) {
    let lifecycle = &config.lifecycle;
    validate_range(
        errors,
        "lifecycle.request_timeout_secs",
        lifecycle.request_timeout_secs,
        1,
        120,
    );
    if lifecycle.enabled {
        if lifecycle.base_url.is_empty() {
            errors.push("lifecycle.base_url is required when lifecycle.enabled = true".into());
        } else if !lifecycle.base_url.starts_with("http://")
            && !lifecycle.base_url.starts_with("https://")
        {
            errors.push(format!(
                "lifecycle.base_url = {} must start with http:// or https://",
                lifecycle.base_url
            ));
        }
    }
}
