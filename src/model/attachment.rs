//! Binary attachments carried as separate MIME parts of an XOP package.
//!
//! Unlike a parsed mail attachment, the payload is read eagerly: once an
//! [`Attachment`] exists its bytes are in memory and never change.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MtomError, Result};
use crate::model::cid::{self, CidDomain};
use crate::model::media_type::guess_media_type;

/// Transfer encoding of every attachment part. Payloads are never re-encoded.
pub const CONTENT_TRANSFER_ENCODING: &str = "binary";

/// Disposition of every attachment part.
pub const CONTENT_DISPOSITION: &str = "attachment";

/// Where the attachment's bytes come from.
#[derive(Debug, Clone)]
pub enum AttachmentSource {
    /// A file on disk. The filename is the path's basename.
    Path(PathBuf),
    /// An in-memory buffer. A filename is mandatory for this variant; it is
    /// optional here only so a missing name is reported as an error rather
    /// than being impossible to express for dynamic callers.
    Bytes {
        data: Vec<u8>,
        file_name: Option<String>,
    },
}

/// One binary payload to be embedded in an XOP package.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Original path, `None` for in-memory sources.
    file_path: Option<PathBuf>,

    /// Display filename (must contain the extension for media-type inference).
    file_name: String,

    /// Raw payload, inserted verbatim into the package.
    data: Vec<u8>,

    /// MIME content type inferred from `file_name`.
    content_type: String,

    /// Bracketed Content-ID, e.g. `<4f1c...@mtomxop>`.
    cid: String,

    /// Domain used whenever the CID is regenerated.
    domain: CidDomain,
}

impl Attachment {
    /// Build an attachment from `source`, reading files eagerly.
    pub fn new(source: AttachmentSource, domain: &CidDomain) -> Result<Self> {
        let (file_path, file_name, data) = match source {
            AttachmentSource::Path(path) => {
                let file_name = basename(&path)?;
                let data = std::fs::read(&path).map_err(|e| MtomError::io(&path, e))?;
                (Some(path), file_name, data)
            }
            AttachmentSource::Bytes { data, file_name } => match file_name {
                Some(name) if !name.is_empty() => (None, name, data),
                _ => {
                    return Err(MtomError::InvalidInput(
                        "file_name must be provided for in-memory attachments".into(),
                    ))
                }
            },
        };

        let content_type = guess_media_type(&file_name).to_string();
        let cid = domain.generate();

        debug!(
            file_name = %file_name,
            content_type = %content_type,
            size = data.len(),
            cid = %cid,
            "Created attachment"
        );

        Ok(Self {
            file_path,
            file_name,
            data,
            content_type,
            cid,
            domain: domain.clone(),
        })
    }

    /// Read the file at `path` into a new attachment.
    pub fn from_path(path: impl AsRef<Path>, domain: &CidDomain) -> Result<Self> {
        Self::new(AttachmentSource::Path(path.as_ref().to_path_buf()), domain)
    }

    /// Wrap an in-memory buffer. `file_name` must be non-empty.
    pub fn from_bytes(
        data: impl Into<Vec<u8>>,
        file_name: impl Into<String>,
        domain: &CidDomain,
    ) -> Result<Self> {
        Self::new(
            AttachmentSource::Bytes {
                data: data.into(),
                file_name: Some(file_name.into()),
            },
            domain,
        )
    }

    /// Replace the CID with a freshly generated one.
    pub fn regenerate_cid(&mut self) {
        self.cid = self.domain.generate();
    }

    /// Override the CID. Brackets are added if missing.
    pub fn set_cid(&mut self, cid: &str) {
        self.cid = format!("<{}>", cid::plain_cid(cid));
    }

    /// Bracketed CID, as used in the `Content-ID` header.
    pub fn cid(&self) -> &str {
        &self.cid
    }

    /// CID without angle brackets, as referenced from XML.
    pub fn plain_cid(&self) -> &str {
        cid::plain_cid(&self.cid)
    }

    /// Base64 of the plain CID: the text a SOAP toolkit puts in the
    /// envelope where the binary content belongs.
    pub fn encoded_cid(&self) -> String {
        cid::encode_cid(self.plain_cid())
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Change the display filename. The content type is not touched until
    /// [`Attachment::refresh_content_type`] is called.
    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Infer the content type again from the current filename.
    pub fn refresh_content_type(&mut self) -> Result<&str> {
        if self.file_name.is_empty() {
            return Err(MtomError::Precondition(
                "file_name is required for setting content_type".into(),
            ));
        }
        self.content_type = guess_media_type(&self.file_name).to_string();
        Ok(&self.content_type)
    }

    /// MIME headers of this part, terminated by the blank line.
    pub fn mime_headers(&self) -> String {
        format!(
            "Content-Type: {}\r\n\
             Content-Transfer-Encoding: {CONTENT_TRANSFER_ENCODING}\r\n\
             Content-ID: {}\r\n\
             Content-Disposition: {CONTENT_DISPOSITION}; name=\"{}\"\r\n\r\n",
            self.content_type, self.cid, self.file_name
        )
    }
}

/// Extract the final path component as the display filename.
fn basename(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            MtomError::InvalidInput(format!(
                "'{}' does not name a file",
                path.display()
            ))
        })
}
