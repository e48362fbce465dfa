//! Media type inference from file extensions.

use std::path::Path;

/// Media type used when the extension is missing or unknown.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Guess the media type of `file_name` from its extension.
///
/// The lookup is case-insensitive: `REPORT.PDF` and `report.pdf` both map
/// to `application/pdf`.
pub fn guess_media_type(file_name: &str) -> &'static str {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(media_type_for_extension)
        .unwrap_or(DEFAULT_MEDIA_TYPE)
}

fn media_type_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        // Text
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "json" => "application/json",
        "js" => "text/javascript",
        "md" => "text/markdown",
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        // Audio / video
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        // Documents
        "pdf" => "application/pdf",
        "rtf" => "application/rtf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        // Archives
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "7z" => "application/x-7z-compressed",
        // Signed / certificate payloads commonly sent to SOAP services
        "p7s" => "application/pkcs7-signature",
        "p7m" => "application/pkcs7-mime",
        "cer" | "crt" => "application/x-x509-ca-cert",
        "eml" => "message/rfc822",
        _ => DEFAULT_MEDIA_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_pdf() {
        assert_eq!(guess_media_type("python.pdf"), "application/pdf");
    }

    #[test]
    fn test_guess_is_case_insensitive() {
        assert_eq!(guess_media_type("scan.PDF"), guess_media_type("scan.pdf"));
        assert_eq!(guess_media_type("photo.JpEg"), "image/jpeg");
    }

    #[test]
    fn test_unknown_or_missing_extension() {
        assert_eq!(guess_media_type("f1"), DEFAULT_MEDIA_TYPE);
        assert_eq!(guess_media_type("data.unknownext"), DEFAULT_MEDIA_TYPE);
        assert_eq!(guess_media_type(".hidden"), DEFAULT_MEDIA_TYPE);
    }
}
