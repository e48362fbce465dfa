//! `mtomxop` packages SOAP envelopes and binary attachments as MTOM/XOP
//! `multipart/related` messages.
//!
//! The flow is: build [`model::attachment::Attachment`]s, register them with
//! a [`transport::MtomTransport`], then hand it the rendered envelope. The
//! envelope is optimized ([`xop::envelope`]), framed ([`xop::package`]) and
//! posted through an [`transport::HttpPost`] implementation.

pub mod config;
pub mod error;
pub mod model;
pub mod transport;
pub mod xop;

pub use error::{MtomError, Result};
pub use model::attachment::{Attachment, AttachmentSource};
pub use model::cid::CidDomain;
pub use transport::{
    build_package, merge_headers, HttpPost, HttpResponse, MtomTransport, PackagePart,
};
pub use xop::envelope::SoapEnvelope;
pub use xop::package::{HttpHeaders, XopPackage};
pub use xop::PackageSettings;
