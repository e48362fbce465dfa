//! multipart/related framing of an XOP package.
//!
//! Layout, byte for byte:
//!
//! ```text
//! --<boundary>\r\n
//! <root part headers>\r\n\r\n<optimized envelope>\r\n
//! --<boundary>\r\n
//! <attachment headers>\r\n\r\n<raw payload>\r\n
//! ...
//! --<boundary>--
//! ```
//!
//! The closing delimiter has no trailing CRLF.

use std::collections::BTreeMap;

use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::model::attachment::Attachment;
use crate::model::cid::plain_cid;
use crate::xop::envelope::{SoapEnvelope, ROOT_CONTENT_TYPE, ROOT_START_INFO};

/// HTTP header name → value.
pub type HttpHeaders = BTreeMap<String, String>;

/// A fully serialized XOP package.
#[derive(Debug, Clone)]
pub struct XopPackage {
    boundary: String,
    start_cid: String,
    body: Vec<u8>,
    part_count: usize,
}

impl XopPackage {
    /// Frame `soap_env` followed by `files` (in order) under a fresh boundary.
    pub fn new(soap_env: &SoapEnvelope, files: &[Attachment]) -> Result<Self> {
        Self::with_boundary(soap_env, files, generate_boundary())
    }

    /// Frame the package under a caller-chosen boundary.
    pub fn with_boundary(
        soap_env: &SoapEnvelope,
        files: &[Attachment],
        boundary: impl Into<String>,
    ) -> Result<Self> {
        let boundary = boundary.into();
        let xml = soap_env.to_bytes()?;
        let delimiter = format!("--{boundary}\r\n");

        let capacity = delimiter.len() * (files.len() + 1)
            + soap_env.mime_headers().len()
            + xml.len()
            + files
                .iter()
                .map(|f| f.mime_headers().len() + f.data().len() + 2)
                .sum::<usize>()
            + boundary.len()
            + 6;
        let mut body = Vec::with_capacity(capacity);

        body.extend_from_slice(delimiter.as_bytes());
        body.extend_from_slice(soap_env.mime_headers().as_bytes());
        body.extend_from_slice(&xml);
        body.extend_from_slice(b"\r\n");

        for file in files {
            body.extend_from_slice(delimiter.as_bytes());
            body.extend_from_slice(file.mime_headers().as_bytes());
            body.extend_from_slice(file.data());
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{boundary}--").as_bytes());

        info!(
            parts = files.len() + 1,
            size = body.len(),
            boundary = %boundary,
            "Built XOP package"
        );

        Ok(Self {
            boundary,
            start_cid: soap_env.cid().to_string(),
            body,
            part_count: files.len() + 1,
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Bracketed CID of the root part.
    pub fn start_cid(&self) -> &str {
        &self.start_cid
    }

    /// Number of MIME parts, root part included.
    pub fn part_count(&self) -> usize {
        self.part_count
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// HTTP headers describing this package.
    pub fn http_headers(&self) -> HttpHeaders {
        generate_http_headers(&self.start_cid, &self.boundary)
    }
}

/// A new random boundary of the form `uuid:<v4 uuid>`.
pub fn generate_boundary() -> String {
    format!("uuid:{}", Uuid::new_v4())
}

/// `MIME-Version` and `Content-Type` headers for a package whose root part
/// is `start_cid` (bracketed or plain) and whose boundary is `boundary`.
pub fn generate_http_headers(start_cid: &str, boundary: &str) -> HttpHeaders {
    let mut headers = HttpHeaders::new();
    headers.insert("MIME-Version".to_string(), "1.0".to_string());
    headers.insert(
        "Content-Type".to_string(),
        format!(
            "multipart/related; type=\"{ROOT_CONTENT_TYPE}\"; start=\"<{}>\"; \
             start-info=\"{ROOT_START_INFO}\"; boundary=\"{boundary}\"",
            plain_cid(start_cid)
        ),
    );
    headers
}
