//! Request path grammar.
//!
//! ```text
//! /{prefix}/{tenant}/{suffix...}
//!     prefix: route family ("select", "delete", ...)
//!     tenant: accountID[:projectID], both u32
//!     suffix: route-specific remainder, e.g. "loki/api/v1/query"
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Malformed path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path must start with `/`")]
    MissingLeadingSlash,
    #[error("cannot find {{tenant}} in path")]
    MissingTenant,
    #[error("cannot find {{suffix}} in path")]
    MissingSuffix,
    #[error("auth error: {0}")]
    Token(#[from] TokenError),
}

/// Invalid tenant token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("cannot parse accountID from {0:?}")]
    AccountId(String),
    #[error("cannot parse projectID from {0:?}")]
    ProjectId(String),
}

/// Tenant scope embedded in the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TenantToken {
    pub account_id: u32,
    pub project_id: u32,
}

impl FromStr for TenantToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, project) = match s.split_once(':') {
            Some((a, p)) => (a, Some(p)),
            None => (s, None),
        };
        let account_id = account
            .parse()
            .map_err(|_| TokenError::AccountId(account.to_string()))?;
        let project_id = match project {
            Some(p) => p.parse().map_err(|_| TokenError::ProjectId(p.to_string()))?,
            None => 0,
        };
        Ok(Self {
            account_id,
            project_id,
        })
    }
}

impl fmt::Display for TenantToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.account_id, self.project_id)
    }
}

/// Collapse runs of `/` into a single separator.
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(c);
    }
    out
}

/// Leading path segment, used to pick the route family before the rest of
/// the path is validated.
pub fn prefix_of(path: &str) -> Result<&str, PathError> {
    let rest = path
        .strip_prefix('/')
        .ok_or(PathError::MissingLeadingSlash)?;
    Ok(rest.split('/').next().unwrap_or(rest))
}

/// A path split into its three parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub prefix: String,
    pub tenant: TenantToken,
    pub suffix: String,
}

impl ParsedPath {
    /// Parse an already-normalized path.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let rest = path
            .strip_prefix('/')
            .ok_or(PathError::MissingLeadingSlash)?;
        let (prefix, rest) = rest.split_once('/').ok_or(PathError::MissingTenant)?;
        let (token, suffix) = rest.split_once('/').ok_or(PathError::MissingSuffix)?;

        Ok(Self {
            prefix: prefix.to_string(),
            tenant: token.parse()?,
            suffix: suffix.to_string(),
        })
    }
}
