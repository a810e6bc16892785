//! Human readable locations for tree document ids
//!
//! Storage Access Framework ids look like `primary:Music/NCM` or
//! `1234-ABCD:Downloads`. The part after the colon is a path on that volume.
//! Ids of virtual providers (downloads, media store) carry no usable path.

/// Label used for the device's built-in storage volume.
pub const INTERNAL_STORAGE_LABEL: &str = "Internal storage";

/// Best-effort readable path for a tree document id. Never required for
/// correctness; `None` means the location cannot be shown.
pub fn path_hint(document_id: &str) -> Option<String> {
    if document_id.is_empty() || is_numeric(document_id) {
        return None;
    }
    if document_id.starts_with("msf:") || document_id.starts_with("raw:") {
        return None;
    }

    let (volume, path) = document_id.split_once(':')?;
    let hint = if volume == "primary" {
        if path.is_empty() {
            INTERNAL_STORAGE_LABEL.to_string()
        } else {
            format!("{}/{}", INTERNAL_STORAGE_LABEL, path)
        }
    } else {
        path.to_string()
    };

    if hint.is_empty() || is_numeric(&hint) {
        return None;
    }
    Some(hint)
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
