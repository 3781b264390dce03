//! Binary class names and resource paths.

const CLASS_SUFFIX: &str = ".class";

/// Map a binary name (`a.b.C`, `a.b.C$Inner`) to its resource path
/// (`a/b/C.class`).
pub fn binary_name_to_resource(binary_name: &str) -> String {
    let mut path = binary_name.replace('.', "/");
    path.push_str(CLASS_SUFFIX);
    path
}

/// Inverse of [`binary_name_to_resource`]. Returns `None` for resource paths
/// that do not name a class file.
pub fn resource_to_binary_name(resource: &str) -> Option<String> {
    let stem = resource.strip_suffix(CLASS_SUFFIX)?;
    if stem.is_empty() || stem.starts_with('/') || stem.ends_with('/') {
        return None;
    }
    Some(stem.replace('/', "."))
}
