//! Slash-delimited logical paths used as tree keys.
//!
//! Paths are relative to the listing root and never carry a leading or
//! trailing slash once normalized. The root itself is the empty string.

/// Label shown for the root of the tree.
pub const ROOT_LABEL: &str = "Root";

/// Strip leading and trailing slashes.
pub fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Join a folder path and a child segment (or sub-path).
pub fn join(base: &str, name: &str) -> String {
    let base = normalize(base);
    let name = normalize(name);
    match (base.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, name),
    }
}

/// Parent folder of `path`; the root is its own parent.
pub fn parent(path: &str) -> &str {
    let path = normalize(path);
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Non-empty segments of `path`.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Strip `folder` from the front of an item name, giving the name relative to
/// that folder. Names outside `folder` are returned unchanged.
pub fn relative_to<'a>(folder: &str, name: &'a str) -> &'a str {
    let folder = normalize(folder);
    let name = normalize(name);
    if folder.is_empty() {
        return name;
    }
    match name.strip_prefix(folder) {
        Some(rest) if rest.starts_with('/') => &rest[1..],
        Some("") => "",
        _ => name,
    }
}

/// One clickable element of the path header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    /// Folder to navigate to when the crumb is activated.
    pub route: String,
}

/// Build the `Root/a/b` crumb trail for `path`.
///
/// The root path yields no crumbs, as there is nothing to navigate up to.
pub fn breadcrumbs(path: &str) -> Vec<Crumb> {
    let path = normalize(path);
    if path.is_empty() {
        return Vec::new();
    }
    let mut crumbs = vec![Crumb {
        label: ROOT_LABEL.to_string(),
        route: String::new(),
    }];
    let mut route = String::new();
    for part in segments(path) {
        route = join(&route, part);
        crumbs.push(Crumb {
            label: part.to_string(),
            route: route.clone(),
        });
    }
    crumbs
}
