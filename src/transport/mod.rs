//! Transport adapter: collects attachments, packages outgoing envelopes and
//! hands them to an HTTP sender.
//!
//! The adapter owns no HTTP logic itself. Anything implementing [`HttpPost`]
//! can deliver the package; [`http::ReqwestSender`] is the default.

pub mod http;

use std::collections::HashSet;

use tracing::{debug, warn};
use xmltree::Element;

use crate::error::{MtomError, Result};
use crate::model::attachment::Attachment;
use crate::xop::envelope::SoapEnvelope;
use crate::xop::package::{self, HttpHeaders, XopPackage};
use crate::xop::PackageSettings;

/// Response returned by an [`HttpPost`] collaborator. Not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

/// Something that can POST a byte body with headers to an address.
pub trait HttpPost {
    fn post(&self, address: &str, body: Vec<u8>, headers: &HttpHeaders) -> Result<HttpResponse>;
}

impl<T: HttpPost + ?Sized> HttpPost for &T {
    fn post(&self, address: &str, body: Vec<u8>, headers: &HttpHeaders) -> Result<HttpResponse> {
        (**self).post(address, body, headers)
    }
}

impl<T: HttpPost + ?Sized> HttpPost for Box<T> {
    fn post(&self, address: &str, body: Vec<u8>, headers: &HttpHeaders) -> Result<HttpResponse> {
        (**self).post(address, body, headers)
    }
}

/// An entry offered to [`MtomTransport::add_files`].
///
/// Callers assembling the list from dynamic input (scripts, deserialized
/// requests) use `Other` for anything that did not resolve to an attachment;
/// registration rejects it.
#[derive(Debug, Clone)]
pub enum PackagePart {
    Attachment(Attachment),
    /// Description of a non-attachment value, e.g. its type name.
    Other(String),
}

impl From<Attachment> for PackagePart {
    fn from(att: Attachment) -> Self {
        Self::Attachment(att)
    }
}

/// Serialize `envelope` and `files` into an XOP package.
///
/// Returns the body bytes and the computed HTTP headers.
pub fn build_package(
    envelope: Element,
    files: &[Attachment],
    settings: &PackageSettings,
) -> Result<(Vec<u8>, HttpHeaders)> {
    let soap_env = SoapEnvelope::new(envelope, files, settings);
    let xop_pack = XopPackage::new(&soap_env, files)?;
    let headers = xop_pack.http_headers();
    Ok((xop_pack.into_body(), headers))
}

/// Combine caller headers with computed MTOM headers.
///
/// Computed headers win on collision; names are compared case-insensitively.
pub fn merge_headers(caller: HttpHeaders, computed: HttpHeaders) -> HttpHeaders {
    let mut merged: HttpHeaders = caller
        .into_iter()
        .filter(|(name, _)| !computed.keys().any(|c| c.eq_ignore_ascii_case(name)))
        .collect();
    merged.extend(computed);
    merged
}

/// MTOM-aware transport: registers attachments and posts XOP packages.
pub struct MtomTransport<S: HttpPost> {
    sender: S,
    settings: PackageSettings,
    files: Vec<Attachment>,
    headers: HttpHeaders,
}

impl<S: HttpPost> MtomTransport<S> {
    pub fn new(sender: S) -> Self {
        Self::with_settings(sender, PackageSettings::default())
    }

    pub fn with_settings(sender: S, settings: PackageSettings) -> Self {
        Self {
            sender,
            settings,
            files: Vec::new(),
            headers: HttpHeaders::new(),
        }
    }

    pub fn settings(&self) -> &PackageSettings {
        &self.settings
    }

    /// Registered attachments, in registration order.
    pub fn files(&self) -> &[Attachment] {
        &self.files
    }

    /// Default headers sent with every request.
    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    /// Register attachments for the next packages.
    ///
    /// Entries are appended to those already registered. If any entry is not
    /// an attachment nothing is registered. Colliding CIDs are regenerated,
    /// the first registered keeps its CID.
    pub fn add_files(&mut self, files: Vec<PackagePart>) -> Result<()> {
        if let Some(PackagePart::Other(kind)) =
            files.iter().find(|f| matches!(f, PackagePart::Other(_)))
        {
            return Err(MtomError::TypeMismatch(format!(
                "files in the list must be attachments, not {kind}"
            )));
        }

        self.files
            .extend(files.into_iter().filter_map(|part| match part {
                PackagePart::Attachment(att) => Some(att),
                PackagePart::Other(_) => None,
            }));
        self.ensure_unique_cids();
        Ok(())
    }

    /// Register attachments known statically to be attachments.
    pub fn add_attachments(&mut self, files: impl IntoIterator<Item = Attachment>) {
        self.files.extend(files);
        self.ensure_unique_cids();
    }

    /// Add or replace default headers.
    pub fn update_headers(&mut self, headers: HttpHeaders) {
        self.headers.extend(headers);
    }

    /// MTOM headers for a package rooted at `start_cid` with `boundary`.
    pub fn generate_http_headers(start_cid: &str, boundary: &str) -> HttpHeaders {
        package::generate_http_headers(start_cid, boundary)
    }

    /// Package `envelope` with the registered attachments.
    pub fn build_package(&self, envelope: Element) -> Result<(Vec<u8>, HttpHeaders)> {
        build_package(envelope, &self.files, &self.settings)
    }

    /// Package `envelope` and POST it to `address`.
    ///
    /// Header precedence, lowest first: default headers, `headers`, computed
    /// MTOM headers.
    pub fn post_xml(
        &self,
        address: &str,
        envelope: Element,
        headers: HttpHeaders,
    ) -> Result<HttpResponse> {
        let (body, mtom_headers) = self.build_package(envelope)?;

        let mut caller = self.headers.clone();
        caller.extend(headers);
        let headers = merge_headers(caller, mtom_headers);

        debug!(address, size = body.len(), "Posting XOP package");
        self.sender.post(address, body, &headers)
    }

    fn ensure_unique_cids(&mut self) {
        let mut seen = HashSet::new();
        for file in &mut self.files {
            while !seen.insert(file.cid().to_string()) {
                warn!(
                    cid = %file.cid(),
                    file_name = %file.file_name(),
                    "Duplicate CID, generating a new one"
                );
                file.regenerate_cid();
            }
        }
    }
}
