use std::cmp::Ordering;

use crate::{
    envelope::Resource,
    resources::{AppAttributes, BuildAttributes},
};

pub fn build_status(build: &Resource<BuildAttributes>) -> String {
    let a = build.attributes.as_ref();
    if let Some(state) = a.and_then(|a| a.processing_state.as_deref()) {
        return state.to_string();
    }
    if a.and_then(|a| a.expired).unwrap_or(false) {
        return "EXPIRED".to_string();
    }
    "UNKNOWN".to_string()
}

/// Newest upload first; builds without a date sort last, by id descending.
pub fn compare_builds_desc(a: &Resource<BuildAttributes>, b: &Resource<BuildAttributes>) -> Ordering {
    let uploaded_a = a.attributes.as_ref().and_then(|x| x.uploaded_date.as_deref());
    let uploaded_b = b.attributes.as_ref().and_then(|x| x.uploaded_date.as_deref());
    match (uploaded_a, uploaded_b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => b.id.cmp(&a.id),
    }
}

pub fn app_label(app: &Resource<AppAttributes>) -> String {
    if let Some(attrs) = &app.attributes {
        if let Some(name) = attrs.name.as_deref().filter(|s| !s.is_empty()) {
            return name.to_string();
        }
        if let Some(bundle_id) = attrs.bundle_id.as_deref().filter(|s| !s.is_empty()) {
            return bundle_id.to_string();
        }
    }
    app.id.clone()
}

pub fn build_label(build: &Resource<BuildAttributes>) -> String {
    build
        .attributes
        .as_ref()
        .and_then(|a| a.version.clone())
        .unwrap_or_else(|| build.id.clone())
}
