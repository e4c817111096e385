//! Shared helpers for loader integration tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// Build a wheel archive: the given files plus a METADATA entry.
pub fn wheel(name: &str, version: &str, requires: &[&str], files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut metadata = format!("Metadata-Version: 2.1\nName: {name}\nVersion: {version}\n");
    for req in requires {
        metadata.push_str(&format!("Requires-Dist: {req}\n"));
    }
    metadata.push_str("\nLong description that is not parsed.\n");

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (path, data) in files {
        writer.start_file(*path, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer
        .start_file(format!("{name}-{version}.dist-info/METADATA"), options)
        .unwrap();
    writer.write_all(metadata.as_bytes()).unwrap();
    writer
        .start_file(format!("{name}-{version}.dist-info/RECORD"), options)
        .unwrap();
    writer.write_all(b"ignored").unwrap();
    writer.finish().unwrap().into_inner()
}

/// A wheel with one `__init__.py`.
pub fn simple_wheel(name: &str, version: &str, requires: &[&str]) -> Vec<u8> {
    let init = format!("{}/__init__.py", name.replace('-', "_"));
    wheel(name, version, requires, &[(init.as_str(), b"VERSION = 1\n")])
}
