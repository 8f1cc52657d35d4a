//! Opaque record identifiers

/// Generate a new identifier with a short uppercase prefix, e.g. `SUB-1F3A9C2D`.
pub fn new_id(prefix: &str) -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, raw[..12].to_uppercase())
}
