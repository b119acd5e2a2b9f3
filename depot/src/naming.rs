use crate::classify::{MULTIPART_FORM_DATA, OCTET_STREAM};

/// Token used as the base name of units that arrived without a filename.
pub const ANONYMOUS_BASE: &str = "payload";

pub trait ObjectNamer {
    /// Storage key for one unit. Always starts with `"{event_id}_"`.
    fn name(&self, event_id: &str, filename: Option<&str>, content_type: &str) -> String;
}

#[derive(Clone, Default)]
pub struct DefaultNamer {}

impl ObjectNamer for DefaultNamer {
    fn name(&self, event_id: &str, filename: Option<&str>, content_type: &str) -> String {
        match filename.map(basename).filter(|name| !name.is_empty()) {
            Some(filename) => format!("{event_id}_{filename}"),
            None => format!(
                "{event_id}_{ANONYMOUS_BASE}{}",
                extension_for(content_type)
            ),
        }
    }
}

/// Last path component, with both `/` and `\` treated as separators.
pub fn basename(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
}

fn extension_for(content_type: &str) -> &'static str {
    const PRIORITY: &[(&str, &str)] = &[
        ("json", ".json"),
        ("text", ".txt"),
        ("image", ".img"),
        ("multipart", ".multipart"),
    ];

    PRIORITY
        .iter()
        .find(|(needle, _)| content_type.contains(needle))
        .map(|(_, ext)| *ext)
        .unwrap_or(".bin")
}

/// Content type to report for a stored object, judged from its name alone.
pub fn stored_content_type(object_name: &str) -> &'static str {
    if object_name.ends_with(".json") {
        "application/json"
    } else if object_name.ends_with(".txt") {
        "text/plain"
    } else if object_name.ends_with(".multipart") {
        MULTIPART_FORM_DATA
    } else {
        OCTET_STREAM
    }
}

/// Filename the unit was uploaded under, or `None` for anonymous payloads.
pub fn original_filename(event_id: &str, object_name: &str) -> Option<String> {
    let remainder = object_name
        .strip_prefix(event_id)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(object_name);

    if remainder.starts_with(ANONYMOUS_BASE) {
        None
    } else {
        Some(remainder.to_string())
    }
}
