//! Integration tests for attachment registration, envelope optimization,
//! package framing and HTTP delivery.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use assert_fs::prelude::*;
use mail_parser::MessageParser;
use predicates::prelude::*;

use mtomxop::transport::http::ReqwestSender;
use mtomxop::xop::envelope::parse_envelope;
use mtomxop::{
    Attachment, AttachmentSource, CidDomain, HttpHeaders, MtomError, MtomTransport, PackagePart,
    PackageSettings,
};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn envelope_for(att: &Attachment) -> xmltree::Element {
    let template = std::fs::read_to_string(fixture("upload_envelope.xml")).unwrap();
    let xml = template.replace("{{cid:0}}", &att.encoded_cid());
    parse_envelope(xml.as_bytes()).unwrap()
}

fn boundary_of(headers: &HttpHeaders) -> String {
    headers["Content-Type"]
        .split("boundary=\"")
        .nth(1)
        .and_then(|s| s.strip_suffix('"'))
        .expect("boundary parameter")
        .to_string()
}

struct NoopSender;

impl mtomxop::HttpPost for NoopSender {
    fn post(
        &self,
        _address: &str,
        _body: Vec<u8>,
        _headers: &HttpHeaders,
    ) -> mtomxop::Result<mtomxop::HttpResponse> {
        Err(MtomError::Http("not used".into()))
    }
}

// ─── python.pdf end to end ──────────────────────────────────────────

#[test]
fn test_python_pdf_package_layout() {
    let pdf = std::fs::read(fixture("python.pdf")).unwrap();
    let att = Attachment::from_path(fixture("python.pdf"), &CidDomain::default()).unwrap();
    let plain = att.plain_cid().to_string();
    let envelope = envelope_for(&att);

    let mut transport = MtomTransport::new(NoopSender);
    transport.add_files(vec![att.into()]).unwrap();
    let (body, headers) = transport.build_package(envelope).unwrap();

    let boundary = boundary_of(&headers);
    let delimiter = format!("--{boundary}\r\n");
    let text = String::from_utf8_lossy(&body).into_owned();

    // Opening boundary, then the root part headers ending in a blank line
    assert!(text.starts_with(&format!(
        "{delimiter}Content-Type: application/xop+xml; charset=UTF-8; type=\"text/xml\"\r\n\
         Content-Transfer-Encoding: 8bit\r\n\
         Content-ID: <rootpart@mtomxop>\r\n\r\n<?xml"
    )));

    let include = text
        .find(&format!("href=\"cid:{plain}\""))
        .expect("xop:Include reference");
    assert!(text.contains("<xop:Include"));

    let second = text.rfind(&delimiter).unwrap();
    assert!(include < second);
    assert_eq!(text.matches(&delimiter).count(), 2);

    let attachment_headers = format!(
        "{delimiter}Content-Type: application/pdf\r\n\
         Content-Transfer-Encoding: binary\r\n\
         Content-ID: <{plain}>\r\n\
         Content-Disposition: attachment; name=\"python.pdf\"\r\n\r\n"
    );
    assert_eq!(&text[second..second + attachment_headers.len()], attachment_headers);

    // Raw bytes, then the closing delimiter without trailing CRLF
    let payload_start = second + attachment_headers.len();
    let closing = format!("\r\n--{boundary}--");
    assert_eq!(&body[payload_start..payload_start + pdf.len()], pdf.as_slice());
    assert_eq!(&body[payload_start + pdf.len()..], closing.as_bytes());
}

#[test]
fn test_http_headers_describe_package() {
    let att = Attachment::from_path(fixture("python.pdf"), &CidDomain::default()).unwrap();
    let envelope = envelope_for(&att);
    let mut transport = MtomTransport::new(NoopSender);
    transport.add_attachments([att]);

    let (_, headers) = transport.build_package(envelope).unwrap();
    assert_eq!(headers["MIME-Version"], "1.0");
    let content_type = &headers["Content-Type"];
    assert!(content_type.starts_with("multipart/related; type=\"application/xop+xml\""));
    assert!(content_type.contains("start=\"<rootpart@mtomxop>\""));
    assert!(content_type.contains("start-info=\"text/xml\""));
}

#[test]
fn test_package_parses_as_multipart_related() {
    let pdf = std::fs::read(fixture("python.pdf")).unwrap();
    let att = Attachment::from_path(fixture("python.pdf"), &CidDomain::default()).unwrap();
    let envelope = envelope_for(&att);
    let mut transport = MtomTransport::new(NoopSender);
    transport.add_attachments([att]);
    let (body, headers) = transport.build_package(envelope).unwrap();

    let mut message = format!(
        "MIME-Version: 1.0\r\nContent-Type: {}\r\n\r\n",
        headers["Content-Type"]
    )
    .into_bytes();
    message.extend_from_slice(&body);

    let parsed = MessageParser::default().parse(message.as_slice()).expect("parse");
    assert!(
        parsed.attachments().any(|part| part.contents() == pdf.as_slice()),
        "PDF part should be recovered byte for byte"
    );
}

#[test]
fn test_boundaries_differ_between_packages() {
    let att = Attachment::from_bytes(b"data".to_vec(), "a.bin", &CidDomain::default()).unwrap();
    let mut transport = MtomTransport::new(NoopSender);
    transport.add_attachments([att.clone()]);

    let (_, first) = transport.build_package(envelope_for(&att)).unwrap();
    let (_, second) = transport.build_package(envelope_for(&att)).unwrap();
    assert_ne!(boundary_of(&first), boundary_of(&second));
}

// ─── Registration errors ────────────────────────────────────────────

#[test]
fn test_in_memory_without_file_name_fails() {
    let result = Attachment::new(
        AttachmentSource::Bytes {
            data: b"test 123".to_vec(),
            file_name: None,
        },
        &CidDomain::default(),
    );
    assert!(matches!(result, Err(MtomError::InvalidInput(_))));
}

#[test]
fn test_registering_non_attachment_leaves_list_unchanged() {
    let mut transport = MtomTransport::new(NoopSender);
    let err = transport
        .add_files(vec![PackagePart::Other("str".into())])
        .unwrap_err();
    assert!(matches!(err, MtomError::TypeMismatch(_)));
    assert!(transport.files().is_empty());
}

#[test]
fn test_injected_duplicate_cids_become_distinct() {
    let domain = CidDomain::new("pymtom-xop");
    let mut a = Attachment::from_bytes(b"1".to_vec(), "a.pdf", &domain).unwrap();
    let mut b = Attachment::from_bytes(b"2".to_vec(), "b.pdf", &domain).unwrap();
    a.set_cid("<123456@pymtom-xop>");
    b.set_cid("<123456@pymtom-xop>");

    let mut transport = MtomTransport::with_settings(
        NoopSender,
        PackageSettings {
            cid_domain: domain,
            ..PackageSettings::default()
        },
    );
    transport.add_files(vec![a.into(), b.into()]).unwrap();

    let files = transport.files();
    assert_eq!(files[0].cid(), "<123456@pymtom-xop>");
    assert_ne!(files[0].cid(), files[1].cid());
    assert!(files[1].cid().ends_with("@pymtom-xop>"));
}

// ─── Files on disk ──────────────────────────────────────────────────

#[test]
fn test_package_written_to_disk() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("report.PDF");
    input.write_binary(b"%PDF-1.4 scanned report").unwrap();

    let att = Attachment::from_path(input.path(), &CidDomain::default()).unwrap();
    assert_eq!(att.file_name(), "report.PDF");
    assert_eq!(att.content_type(), "application/pdf");

    let mut transport = MtomTransport::new(NoopSender);
    transport.add_attachments([att.clone()]);
    let (body, _) = transport.build_package(envelope_for(&att)).unwrap();

    let output = temp.child("package.bin");
    output.write_binary(&body).unwrap();
    output.assert(predicate::path::is_file());

    let written = String::from_utf8_lossy(&std::fs::read(output.path()).unwrap()).into_owned();
    assert!(predicate::str::contains("name=\"report.PDF\"").eval(written.as_str()));
    assert!(predicate::str::contains("%PDF-1.4 scanned report").eval(written.as_str()));
    assert!(predicate::str::ends_with("--").eval(written.as_str()));

    temp.close().unwrap();
}

// ─── HTTP delivery ──────────────────────────────────────────────────

/// Accept one request, answer 200, and hand back the raw request bytes.
fn serve_once(listener: TcpListener, tx: mpsc::Sender<Vec<u8>>) {
    let (mut stream, _) = listener.accept().unwrap();
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buf).unwrap();
        assert!(n > 0, "connection closed before headers ended");
        request.extend_from_slice(&buf[..n]);
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
    let content_length: usize = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .map(|v| v.trim().parse().unwrap())
        .unwrap_or(0);

    while request.len() < header_end + content_length {
        let n = stream.read(&mut buf).unwrap();
        assert!(n > 0, "connection closed before body ended");
        request.extend_from_slice(&buf[..n]);
    }

    stream
        .write_all(
            b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 13\r\n\
              connection: close\r\n\r\nmock response",
        )
        .unwrap();
    tx.send(request).unwrap();
}

#[test]
fn test_post_xml_over_http() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("http://{}/UploadFileWs", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();
    let server = thread::spawn(move || serve_once(listener, tx));

    let client = reqwest::blocking::Client::builder()
        .no_proxy()
        .build()
        .unwrap();
    let att = Attachment::from_bytes(b"test 123".to_vec(), "test.pdf", &CidDomain::default())
        .unwrap();
    let envelope = envelope_for(&att);

    let mut transport = MtomTransport::new(ReqwestSender::with_client(client));
    transport.add_attachments([att]);
    let mut extra = HttpHeaders::new();
    extra.insert("SOAPAction".into(), "\"\"".into());
    extra.insert("Content-Type".into(), "text/xml; charset=utf-8".into());

    let response = transport.post_xml(&address, envelope, extra).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"mock response");
    assert_eq!(
        response.headers.get("content-type").map(String::as_str),
        Some("text/plain")
    );

    let request = rx.recv().unwrap();
    server.join().unwrap();

    let text = String::from_utf8_lossy(&request).into_owned();
    let lower = text.to_lowercase();
    assert!(text.starts_with("POST /UploadFileWs HTTP/1.1\r\n"));
    assert!(lower.contains("content-type: multipart/related; type=\"application/xop+xml\""));
    assert!(!lower.contains("content-type: text/xml"));
    assert!(lower.contains("mime-version: 1.0"));
    assert!(lower.contains("soapaction: \"\""));
    assert!(text.contains("test 123\r\n--uuid:"));
    assert!(text.ends_with("--"));
}
