//! Source format detection: file extension first, content sniffing as a
//! fallback/confirmation (§4.3).

use std::path::Path;

use super::errors::{SourceError, SourceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Json,
    Ndjson,
    Parquet,
    Xlsx,
    Xls,
}

impl SourceFormat {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Parquet => "parquet",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
        }
    }

    pub fn delimiter(&self) -> u8 {
        match self {
            Self::Tsv => b'\t',
            _ => b',',
        }
    }
}

/// Detect the format of `path` from its extension, falling back to content
/// sniffing (BOM / magic bytes) when the extension is missing or ambiguous.
pub fn detect_format(path: &Path) -> SourceResult<SourceFormat> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => return Ok(SourceFormat::Csv),
            "tsv" => return Ok(SourceFormat::Tsv),
            "json" => return Ok(SourceFormat::Json),
            "ndjson" | "jsonl" => return Ok(SourceFormat::Ndjson),
            "parquet" => return Ok(SourceFormat::Parquet),
            "xlsx" => return Ok(SourceFormat::Xlsx),
            "xls" => return Ok(SourceFormat::Xls),
            _ => {}
        }
    }

    sniff_content(path)
}

fn sniff_content(path: &Path) -> SourceResult<SourceFormat> {
    let mut buf = [0u8; 8];
    let n = {
        use std::io::Read;
        let mut file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::FileNotFound(path.to_path_buf())
            } else {
                SourceError::Io { path: path.to_path_buf(), source: e }
            }
        })?;
        file.read(&mut buf).map_err(|e| SourceError::Io { path: path.to_path_buf(), source: e })?
    };
    let head = &buf[..n];

    // Parquet magic bytes: "PAR1"
    if head.starts_with(b"PAR1") {
        return Ok(SourceFormat::Parquet);
    }
    // ZIP local file header, used by xlsx (a zip container).
    if head.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        return Ok(SourceFormat::Xlsx);
    }
    // OLE2 compound file header, used by legacy xls.
    if head.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        return Ok(SourceFormat::Xls);
    }

    let trimmed = strip_bom(head);
    if trimmed.first() == Some(&b'{') || trimmed.first() == Some(&b'[') {
        return Ok(SourceFormat::Json);
    }

    Err(SourceError::UnsupportedFormat(format!(
        "could not determine format of {}",
        path.display()
    )))
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn extension_takes_priority() {
        assert_eq!(
            detect_format(&PathBuf::from("data.CSV")).unwrap(),
            SourceFormat::Csv
        );
        assert_eq!(
            detect_format(&PathBuf::from("data.jsonl")).unwrap(),
            SourceFormat::Ndjson
        );
    }
}
