use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47];

pub trait ContentTypeClassifier {
    /// Bare lowercase `type/subtype` of a declared header, parameters dropped.
    fn from_header(&self, header: &str) -> String;

    fn from_filename(&self, filename: &str) -> String;

    fn from_bytes(&self, data: &[u8]) -> String;

    /// Type of a single unit: the declared header, or the filename extension when the header
    /// is the generic binary type.
    fn resolve(&self, header: &str, filename: Option<&str>) -> String {
        let declared = self.from_header(header);
        match filename {
            Some(filename) if declared == OCTET_STREAM => self.from_filename(filename),
            _ => declared,
        }
    }
}

#[derive(Clone, Default)]
pub struct DefaultClassifier {}

impl ContentTypeClassifier for DefaultClassifier {
    fn from_header(&self, header: &str) -> String {
        let header = header.trim();
        if header.is_empty() {
            return OCTET_STREAM.to_string();
        }

        match header.parse::<mime::Mime>() {
            Ok(parsed) => parsed.essence_str().to_ascii_lowercase(),
            Err(_) => OCTET_STREAM.to_string(),
        }
    }

    fn from_filename(&self, filename: &str) -> String {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let content_type = match extension.as_deref() {
            Some("json") => "application/json",
            Some("txt") => "text/plain",
            Some("pdf") => "application/pdf",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("html") | Some("htm") => "text/html",
            Some("css") => "text/css",
            Some("js") => "application/javascript",
            _ => OCTET_STREAM,
        };
        content_type.to_string()
    }

    fn from_bytes(&self, data: &[u8]) -> String {
        let content_type = match data.first() {
            Some(b'{') | Some(b'[') => "application/json",
            _ if data.starts_with(JPEG_MAGIC) => "image/jpeg",
            _ if data.starts_with(PNG_MAGIC) => "image/png",
            _ => OCTET_STREAM,
        };
        content_type.to_string()
    }
}
