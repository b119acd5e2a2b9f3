use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::api::DepotError;
use crate::payload::RetrievedFile;

pub trait ArchiveBundler {
    fn bundle(&self, files: &[RetrievedFile]) -> Result<Bytes, DepotError>;
}

/// Deflated zip archive, one entry per file, named by its download name.
#[derive(Clone, Default)]
pub struct ZipBundler {}

impl ArchiveBundler for ZipBundler {
    fn bundle(&self, files: &[RetrievedFile]) -> Result<Bytes, DepotError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for file in files {
            zip.start_file(file.download_name(), options)
                .map_err(|e| DepotError::Archive(format!("failed to add {}: {e}", file.object_name)))?;
            zip.write_all(&file.data).map_err(|e| {
                DepotError::Archive(format!("failed to write {}: {e}", file.object_name))
            })?;
        }

        let buffer = zip
            .finish()
            .map_err(|e| DepotError::Archive(format!("failed to finish archive: {e}")))?;

        Ok(Bytes::from(buffer.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn file(object_name: &str, original: Option<&str>, data: &'static [u8]) -> RetrievedFile {
        RetrievedFile {
            object_name: object_name.to_string(),
            original_filename: original.map(str::to_string),
            size: data.len(),
            content_type: "application/octet-stream".to_string(),
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn archive_holds_every_file() {
        let files = vec![
            file("id_a.txt", Some("a.txt"), b"hi"),
            file("id_b.json", Some("b.json"), b"{}"),
            file("id_payload.bin", None, &[0, 1, 2, 3]),
        ];

        let archive = ZipBundler::default().bundle(&files).unwrap();
        let mut reader = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();

        assert_eq!(reader.len(), 3);
        for expected in &files {
            let mut entry = reader.by_name(expected.download_name()).unwrap();
            assert_eq!(entry.compression(), CompressionMethod::Deflated);

            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).unwrap();
            assert_eq!(contents, expected.data.to_vec());
        }
    }

    #[test]
    fn entries_follow_input_order() {
        let files = vec![
            file("id_z.txt", Some("z.txt"), b"z"),
            file("id_a.txt", Some("a.txt"), b"a"),
        ];

        let archive = ZipBundler::default().bundle(&files).unwrap();
        let mut reader = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();

        assert_eq!(reader.by_index(0).unwrap().name(), "z.txt");
        assert_eq!(reader.by_index(1).unwrap().name(), "a.txt");
    }

    #[test]
    fn empty_archive_is_valid() {
        let archive = ZipBundler::default().bundle(&[]).unwrap();
        let reader = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();

        assert!(reader.is_empty());
    }
}
