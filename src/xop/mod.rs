//! XOP packaging: envelope optimization and multipart/related framing.

pub mod envelope;
pub mod package;

use crate::model::cid::{CidDomain, DEFAULT_ROOT_LOCAL_PART};

/// Default charset declared for the root part.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Per-package identity settings, normally derived from [`crate::config::Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSettings {
    /// Domain of every generated CID.
    pub cid_domain: CidDomain,
    /// Local part of the root part's CID.
    pub root_local_part: String,
    /// Charset declared on the root part.
    pub charset: String,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            cid_domain: CidDomain::default(),
            root_local_part: DEFAULT_ROOT_LOCAL_PART.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
        }
    }
}
