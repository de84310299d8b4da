use std::collections::HashMap;

use ckan::Resource;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::facade::FreshnessCheck;

static FORMAT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(csv|json|xlsx?|xml)$").expect("valid regex"));

/// Resource name without a trailing data-format extension.
pub fn base_name(name: &str) -> &str {
    match FORMAT_SUFFIX.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    }
}

/// One entry per distinct base name, in order of first appearance. Each
/// group is represented by its CSV member, else its JSON member, else the
/// first one listed.
pub fn preferred_resources(resources: &[Resource]) -> Vec<&Resource> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Resource>> = HashMap::new();
    for resource in resources {
        let key = base_name(&resource.name);
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(resource);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let group = groups.remove(key)?;
            let csv = group.iter().find(|r| r.is_csv());
            let json = group.iter().find(|r| r.format.eq_ignore_ascii_case("json"));
            csv.or(json).or_else(|| group.first()).copied()
        })
        .collect()
}

/// Size with binary units and one decimal, or `N/A` when unknown or zero.
pub fn format_bytes(bytes: Option<u64>) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let bytes = match bytes {
        Some(b) if b > 0 => b,
        _ => return "N/A".to_owned(),
    };

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// Whether to offer a table preview. A failed or negative freshness check
/// withdraws eligibility; the resource itself is left as fetched.
pub fn preview_eligibility(resource: &Resource, check: Option<&FreshnessCheck>) -> bool {
    if !resource.is_previewable() {
        return false;
    }
    match check {
        Some(check) if check.resource_id == resource.id => check.datastore_live,
        _ => true,
    }
}
