use bytes::Bytes;

/// One named, typed blob produced by decomposing an ingested body.
/// `name` always starts with `"{event_id}_"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorableUnit {
    pub name: String,
    pub data: Bytes,
    pub content_type: String,
    pub source_filename: Option<String>,
}

/// A stored unit read back for one retrieval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub object_name: String,
    pub original_filename: Option<String>,
    pub size: usize,
    pub content_type: String,
    pub data: Bytes,
}

impl RetrievedFile {
    /// Name to present to a downloader: the uploaded filename when known.
    pub fn download_name(&self) -> &str {
        self.original_filename
            .as_deref()
            .unwrap_or(&self.object_name)
    }
}
