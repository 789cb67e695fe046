use std::path::MAIN_SEPARATOR;

pub const ROOT_PATH: &str = "/";
const HIDDEN_MARKER: char = '.';

/// Percent-escaped form of the platform separator, e.g. `%2F`.
pub fn escaped_separator() -> String {
    format!("%{:02X}", MAIN_SEPARATOR as u32)
}

/// Local name to store title: escaped separators become literal ones again.
pub fn to_remote_title(local_name: &str) -> String {
    local_name.replace(&escaped_separator(), &MAIN_SEPARATOR.to_string())
}

/// Store title to local name: literal separators are escaped.
pub fn to_local_name(title: &str) -> String {
    title.replace(MAIN_SEPARATOR, &escaped_separator())
}

pub fn is_root(path: &str) -> bool {
    segments(path).next().is_none()
}

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Splits `/a/b/c` into `("/a/b", "c")`. Top-level entries get `/` as parent.
/// Returns `None` for the root and for relative single names.
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let (rest, last) = trimmed.rsplit_once('/')?;
    if last.is_empty() {
        return None;
    }
    let parent = if rest.is_empty() { ROOT_PATH } else { rest };
    Some((parent, last))
}

pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

pub fn is_hidden(name: &str, hide_hidden: bool) -> bool {
    hide_hidden && name.starts_with(HIDDEN_MARKER)
}
