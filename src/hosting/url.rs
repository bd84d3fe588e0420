//! Hosting URL parsing: extract owner/repository identity from either
//! transport form. Pure and side-effect free; validation precedes parsing so
//! a malformed URL fails cleanly with no partial result.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::HostingError;

/// Owner and repository name derived from a hosting URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub name: String,
}

fn https_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://[\w.-]+/[\w.-]+/[\w.-]+$").expect("valid https pattern")
    })
}

fn ssh_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\w.-]+@[\w.-]+:[\w.-]+/[\w.-]+$").expect("valid ssh pattern")
    })
}

/// Parse a repository URL in HTTPS form (`https://<host>/<owner>/<name>[.git]`)
/// or SSH shorthand form (`<user>@<host>:<owner>/<name>[.git]`).
///
/// A trailing `.git` is immaterial to the result. Anything not matching one
/// of the two shapes, or yielding an empty owner or name, is rejected.
pub fn parse_repo_url(url: &str) -> Result<RepositoryIdentity, HostingError> {
    let invalid = || HostingError::InvalidRepositoryUrl(url.to_string());

    let path = if https_pattern().is_match(url) {
        // Everything after the host segment.
        let after_scheme = url.split_once("://").map(|(_, rest)| rest).ok_or_else(invalid)?;
        after_scheme.split_once('/').map(|(_, path)| path).ok_or_else(invalid)?
    } else if ssh_pattern().is_match(url) {
        url.split_once(':').map(|(_, path)| path).ok_or_else(invalid)?
    } else {
        return Err(invalid());
    };

    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, name) = path.split_once('/').ok_or_else(invalid)?;

    if owner.is_empty() || name.is_empty() {
        return Err(invalid());
    }

    Ok(RepositoryIdentity {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}
