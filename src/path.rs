//! Canonical path keys for the virtual project filesystem
//!
//! Every path-accepting cache entry point runs its input through
//! [`normalize`] so that different spellings of the same file (percent
//! encoded, doubled separators, `.`/`..` segments) land on one key.
//! Virtual paths always use `/` regardless of the host platform.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;

/// Characters escaped inside a single address segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-decode a raw path, one segment at a time.
///
/// Each segment is decoded until no escapes remain, which keeps
/// double-encoded input stable. A segment whose next pass would produce
/// invalid UTF-8 keeps its last valid form without blocking its neighbours.
pub fn decode(raw: &str) -> Cow<'_, str> {
    if !raw.contains('%') {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(
        raw.split('/')
            .map(decode_segment)
            .collect::<Vec<_>>()
            .join("/"),
    )
}

fn decode_segment(segment: &str) -> Cow<'_, str> {
    let mut current = Cow::Borrowed(segment);
    loop {
        match percent_decode_str(&current).decode_utf8() {
            Ok(Cow::Owned(decoded)) => current = Cow::Owned(decoded),
            _ => return current,
        }
    }
}

/// Decode, then normalize separators and `.`/`..` segments.
///
/// Runs until the key stops changing, since dropping a segment with `..`
/// or splitting on a decoded `%2F` can expose escapes for another pass.
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_decoded(&decode(raw));
    loop {
        let next = normalize_decoded(&decode(&current));
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_decoded(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join two path fragments and normalize the result
pub fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        return normalize_decoded(rest);
    }
    normalize_decoded(&format!("{}/{}", base, rest))
}

/// Resolve `target` against `base_dir`; absolute targets win
pub fn resolve(base_dir: &str, target: &str) -> String {
    if target.starts_with('/') {
        normalize_decoded(target)
    } else {
        join(base_dir, target)
    }
}

/// Parent directory of a normalized path
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

/// Final segment of a path
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Extension including the leading dot, or an empty string.
///
/// Dotfiles such as `.gitignore` have no extension.
pub fn extname(path: &str) -> &str {
    let base = basename(path);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &base[idx..],
    }
}

/// Prefix that every descendant of `dir` starts with
pub fn subtree_prefix(dir: &str) -> Cow<'_, str> {
    if dir.ends_with('/') {
        Cow::Borrowed(dir)
    } else {
        Cow::Owned(format!("{}/", dir))
    }
}

/// Whether `path` is `dir` itself or nested anywhere below it
pub fn is_within(path: &str, dir: &str) -> bool {
    path == dir || path.starts_with(&*subtree_prefix(dir))
}

/// Path relative to `root`, without a leading separator.
///
/// Paths outside `root` are returned with the leading separator stripped.
pub fn relative_to<'a>(path: &'a str, root: &str) -> &'a str {
    let root = root.trim_end_matches('/');
    let rest = match path.strip_prefix(root) {
        Some(rest) if root.is_empty() || rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };
    rest.trim_start_matches('/')
}

/// Percent-encode each segment of a relative path for use in an address
pub fn encode_segments(relative: &str) -> String {
    relative
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}
