use thiserror::Error;

use super::member::{Group, Member};

/// Error walking a slash-delimited member path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("no member at path `{0}`")]
    NotFound(String),
    #[error("cannot descend through a leaf member at `{0}`")]
    NotAGroup(String),
}

/// Split a path into segments. Leading and trailing slashes are trimmed;
/// an empty path (or one that is all slashes) yields `None` and addresses
/// the whole top-level collection.
///
/// Interior empty segments (`a//b`) are kept and will fail lookup, the same
/// way any other missing key does.
pub(crate) fn split(path: &str) -> Option<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.split('/').collect())
    }
}

/// Lookup-only descent. Every segment must resolve; every non-final segment
/// must resolve to a group.
pub(crate) fn descend<'a>(
    group: &'a Group,
    segments: &[&str],
    full_path: &str,
) -> Result<&'a Member, PathError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Err(PathError::NotFound(full_path.to_string()));
    };
    let member = group
        .get(segment)
        .ok_or_else(|| PathError::NotFound(full_path.to_string()))?;
    if rest.is_empty() {
        return Ok(member);
    }
    match member {
        Member::Group(inner) => descend(inner, rest, full_path),
        _ => Err(PathError::NotAGroup(full_path.to_string())),
    }
}

/// Mutable variant of [`descend`]; still lookup-only.
pub(crate) fn descend_mut<'a>(
    group: &'a mut Group,
    segments: &[&str],
    full_path: &str,
) -> Result<&'a mut Member, PathError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Err(PathError::NotFound(full_path.to_string()));
    };
    let member = group
        .get_mut(segment)
        .ok_or_else(|| PathError::NotFound(full_path.to_string()))?;
    if rest.is_empty() {
        return Ok(member);
    }
    match member {
        Member::Group(inner) => descend_mut(inner, rest, full_path),
        _ => Err(PathError::NotAGroup(full_path.to_string())),
    }
}

/// Create-mode descent: missing segments are created as empty groups on the
/// way down. A scalar or block sitting in the middle of the path is still an
/// error; create mode never overwrites existing members.
pub(crate) fn descend_create<'a>(
    group: &'a mut Group,
    segments: &[&str],
    full_path: &str,
) -> Result<&'a mut Member, PathError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Err(PathError::NotFound(full_path.to_string()));
    };
    let member = group.ensure(segment);
    if rest.is_empty() {
        return Ok(member);
    }
    match member {
        Member::Group(inner) => descend_create(inner, rest, full_path),
        _ => Err(PathError::NotAGroup(full_path.to_string())),
    }
}
