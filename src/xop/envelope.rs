//! The SOAP envelope as the root part of an XOP package.
//!
//! A SOAP toolkit renders binary fields as base64 text. For an attachment
//! the caller puts the base64 of its plain CID in that field; optimization
//! finds the element whose text is exactly that value, drops the text and
//! inserts `<xop:Include href="cid:..."/>` as its first child.

use tracing::debug;
use xmltree::{Element, EmitterConfig, Namespace, XMLNode};

use crate::error::{MtomError, Result};
use crate::model::attachment::Attachment;
use crate::xop::PackageSettings;

/// Namespace of the `xop:Include` element (W3C XOP 1.0).
pub const XOP_INCLUDE_NS: &str = "http://www.w3.org/2004/08/xop/include";

/// Prefix bound to [`XOP_INCLUDE_NS`] on every inserted include element.
pub const XOP_PREFIX: &str = "xop";

/// Content type of the root part.
pub const ROOT_CONTENT_TYPE: &str = "application/xop+xml";

/// The `type` parameter of the root part, repeated as `start-info` in the HTTP header.
pub const ROOT_START_INFO: &str = "text/xml";

/// Transfer encoding of the root part.
pub const ROOT_TRANSFER_ENCODING: &str = "8bit";

/// An XOP-optimized SOAP envelope, ready to be framed as the root part.
///
/// Construction consumes the caller's tree: it is mutated in place and
/// owned by the envelope from then on.
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    xop_env: Element,
    cid: String,
    charset: String,
    included: Vec<String>,
    mime_headers: String,
}

impl SoapEnvelope {
    /// Optimize `env` against `files` and compute the root part headers.
    pub fn new(mut env: Element, files: &[Attachment], settings: &PackageSettings) -> Self {
        let included = optimize_envelope(&mut env, files);
        let cid = settings.cid_domain.root_cid(&settings.root_local_part);
        let charset = settings.charset.clone();
        let mime_headers = root_mime_headers(&charset, &cid);

        Self {
            xop_env: env,
            cid,
            charset,
            included,
            mime_headers,
        }
    }

    /// Parse raw envelope bytes, then optimize them.
    pub fn parse(xml: &[u8], files: &[Attachment], settings: &PackageSettings) -> Result<Self> {
        let env = parse_envelope(xml)?;
        Ok(Self::new(env, files, settings))
    }

    /// Bracketed CID of the root part, e.g. `<rootpart@mtomxop>`.
    pub fn cid(&self) -> &str {
        &self.cid
    }

    /// Root CID without angle brackets, as used in the `start` parameter.
    pub fn plain_cid(&self) -> &str {
        crate::model::cid::plain_cid(&self.cid)
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Plain CIDs of the attachments that were found and replaced, in
    /// registration order.
    pub fn included_cids(&self) -> &[String] {
        &self.included
    }

    /// MIME headers of the root part, terminated by the blank line.
    pub fn mime_headers(&self) -> &str {
        &self.mime_headers
    }

    /// The optimized tree.
    pub fn element(&self) -> &Element {
        &self.xop_env
    }

    pub fn into_element(self) -> Element {
        self.xop_env
    }

    /// Serialize the optimized tree, with XML declaration and no indentation.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let config = EmitterConfig::new()
            .perform_indent(false)
            .write_document_declaration(true);
        self.xop_env
            .write_with_config(&mut buf, config)
            .map_err(|e| MtomError::Xml(format!("failed to serialize envelope: {e}")))?;
        Ok(buf)
    }

    /// Build a standalone `xop:Include` element referencing `plain_cid`.
    ///
    /// `inherited` are the bindings in scope at the insertion point. They are
    /// kept on the new element; only the `xop` prefix is forced to the XOP
    /// namespace.
    pub fn create_xop_include(plain_cid: &str, inherited: Option<&Namespace>) -> Element {
        let mut namespaces = Namespace::empty();
        if let Some(prev) = inherited {
            namespaces.0.extend(prev.0.clone());
        }
        namespaces
            .0
            .insert(XOP_PREFIX.to_string(), XOP_INCLUDE_NS.to_string());

        let mut include = Element::new("Include");
        include.prefix = Some(XOP_PREFIX.to_string());
        include.namespace = Some(XOP_INCLUDE_NS.to_string());
        include.namespaces = Some(namespaces);
        include
            .attributes
            .insert("href".to_string(), format!("cid:{plain_cid}"));
        include
    }
}

/// Parse envelope bytes produced by an external SOAP toolkit.
pub fn parse_envelope(xml: &[u8]) -> Result<Element> {
    Element::parse(xml).map_err(|e| MtomError::Xml(format!("failed to parse envelope: {e}")))
}

/// Replace each attachment's base64 CID text with an `xop:Include` reference.
///
/// Attachments whose encoded CID does not appear as the exact text of some
/// element are skipped without error. Returns the plain CIDs that were
/// replaced.
pub fn optimize_envelope(env: &mut Element, files: &[Attachment]) -> Vec<String> {
    let mut included = Vec::new();

    for file in files {
        let plain = file.plain_cid();
        let encoded = file.encoded_cid();

        let Some((el, scope)) = find_by_text(env, &encoded, &Namespace::empty()) else {
            debug!(cid = %plain, file_name = %file.file_name(), "CID not referenced in envelope, skipping");
            continue;
        };

        let include = SoapEnvelope::create_xop_include(plain, Some(&scope));
        el.children
            .retain(|node| !matches!(node, XMLNode::Text(_) | XMLNode::CData(_)));
        el.children.insert(0, XMLNode::Element(include));

        debug!(cid = %plain, element = %el.name, "Inserted xop:Include");
        included.push(plain.to_string());
    }

    included
}

/// Depth-first search (document order) for the first element with a direct
/// text node equal to `text`. Also returns the namespace bindings in scope.
fn find_by_text<'a>(
    el: &'a mut Element,
    text: &str,
    inherited: &Namespace,
) -> Option<(&'a mut Element, Namespace)> {
    let mut scope = inherited.clone();
    if let Some(ns) = &el.namespaces {
        scope.0.extend(ns.0.clone());
    }

    if has_direct_text(el, text) {
        return Some((el, scope));
    }

    for child in el.children.iter_mut() {
        if let XMLNode::Element(child) = child {
            if let Some(found) = find_by_text(child, text, &scope) {
                return Some(found);
            }
        }
    }
    None
}

fn has_direct_text(el: &Element, text: &str) -> bool {
    el.children.iter().any(|node| match node {
        XMLNode::Text(t) | XMLNode::CData(t) => t == text,
        _ => false,
    })
}

fn root_mime_headers(charset: &str, cid: &str) -> String {
    format!(
        "Content-Type: {ROOT_CONTENT_TYPE}; charset={charset}; type=\"{ROOT_START_INFO}\"\r\n\
         Content-Transfer-Encoding: {ROOT_TRANSFER_ENCODING}\r\n\
         Content-ID: {cid}\r\n\r\n"
    )
}
