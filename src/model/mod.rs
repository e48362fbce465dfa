//! Core data model: attachments, Content-IDs and media types.

pub mod attachment;
pub mod cid;
pub mod media_type;
