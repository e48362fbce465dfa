//! Content-ID generation and formatting.
//!
//! A CID looks like a `Message-ID`: `<local-part@domain>`. The bracketed
//! form goes into MIME `Content-ID` headers, the plain form into XML
//! `href="cid:..."` references.

use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

/// Domain used when no configuration overrides it.
pub const DEFAULT_CID_DOMAIN: &str = "mtomxop";

/// Local part of the root (SOAP envelope) part's CID.
pub const DEFAULT_ROOT_LOCAL_PART: &str = "rootpart";

/// The domain suffix appended to every generated CID.
///
/// Passed explicitly into attachment and envelope constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CidDomain(String);

impl CidDomain {
    pub fn new(domain: impl Into<String>) -> Self {
        Self(domain.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate a fresh bracketed CID with a random local part.
    pub fn generate(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4().simple(), self.0)
    }

    /// The fixed bracketed CID of the root part, e.g. `<rootpart@mtomxop>`.
    pub fn root_cid(&self, local_part: &str) -> String {
        format!("<{local_part}@{}>", self.0)
    }
}

impl Default for CidDomain {
    fn default() -> Self {
        Self::new(DEFAULT_CID_DOMAIN)
    }
}

impl std::fmt::Display for CidDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip the surrounding `<` `>` of a header-form CID.
///
/// Values that are not bracketed are returned unchanged.
pub fn plain_cid(cid: &str) -> &str {
    cid.strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(cid)
}

/// Base64 form of a plain CID, as a SOAP toolkit renders it inside a
/// `base64Binary` element before optimization.
pub fn encode_cid(plain: &str) -> String {
    STANDARD.encode(plain.as_bytes())
}
