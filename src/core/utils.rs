//! Lexical helpers for `/`-separated paths. None of them touch a file system.

/// Normalizes `path` lexically:
/// - repeated separators are collapsed, trailing separators dropped;
/// - `.` components are removed;
/// - `..` removes the preceding normal component; at the root it is dropped, in a
///   relative path without a preceding component it is kept.
///
/// An empty result is `.` (or `/` for rooted paths).
pub fn normalize(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    match (rooted, parts.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", parts.join("/")),
        (false, true) => ".".to_string(),
        (false, false) => parts.join("/"),
    }
}

/// Joins `base` and `name` and normalizes the result.
/// Empty arguments are ignored; a leading `/` in `name` does not reset the base.
pub fn join(base: &str, name: &str) -> String {
    match (base.is_empty(), name.is_empty()) {
        (true, true) => String::new(),
        (true, false) => normalize(name),
        (false, true) => normalize(base),
        (false, false) => normalize(&format!("{base}/{name}")),
    }
}

/// Returns all but the last component of `path`, normalized.
/// `dir("x.txt")` is `.`, `dir("/x.txt")` is `/`.
pub fn dir(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(pos) => normalize(&path[..pos]),
        None => ".".to_string(),
    }
}

/// Returns true if `target` is `base` itself or lies below it.
///
/// The check is made on components of both normalized paths, so `foo` does not
/// contain `foobar`, and a rooted path never lies below a relative one.
pub fn is_sub_path(base: &str, target: &str) -> bool {
    let base = normalize(base);
    let target = normalize(target);
    if base.starts_with('/') != target.starts_with('/') {
        return false;
    }

    let mut base_parts = components(&base);
    let mut target_parts = components(&target);
    loop {
        match (base_parts.next(), target_parts.next()) {
            (None, None) => return true,
            (None, Some(part)) => {
                return part != ".." && target_parts.all(|part| part != "..");
            }
            (Some(_), None) => return false,
            (Some(b), Some(t)) if b != t => return false,
            _ => {}
        }
    }
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty() && *part != ".")
}
