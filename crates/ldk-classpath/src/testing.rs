//! Fixtures shared by the unit tests.

use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::manifest::MANIFEST_PATH;

/// Write a zip archive at `path`. When `class_path` is given, a manifest
/// declaring it is written as the first entry.
pub(crate) fn write_jar(path: &Path, entries: &[(&str, &[u8])], class_path: Option<&str>) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut writer = ZipWriter::new(std::fs::File::create(path).unwrap());
    if let Some(cp) = class_path {
        writer.start_file(MANIFEST_PATH, SimpleFileOptions::default()).unwrap();
        write!(writer, "Manifest-Version: 1.0\r\nClass-Path: {cp}\r\n\r\n").unwrap();
    }
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

/// Write a plain file, creating parent directories.
pub(crate) fn write_file(path: &Path, data: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
}
