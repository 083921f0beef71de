//! Streaming FASTA input/output with gzip-transparent reads.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::{BarcodekitError, Result};

/// One FASTA record: the id token from the header plus raw sequence bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// First whitespace-delimited token of the header line.
    pub id: String,
    /// Concatenated sequence bytes, newlines stripped.
    pub seq: Vec<u8>,
}

/// Open a file for buffered reading, decompressing `.gz` transparently.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| BarcodekitError::io(path, e))?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Stream FASTA records from a reader, invoking `f` once per record.
///
/// Sequence data before the first header is a structural error. `path` is
/// used only for error messages.
pub fn read_fasta<R, F>(reader: R, path: &Path, mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(FastaRecord) -> Result<()>,
{
    let mut id: Option<String> = None;
    let mut seq: Vec<u8> = Vec::new();
    let mut line_no: u64 = 0;

    for line in reader.lines() {
        line_no += 1;
        let line = line.map_err(|e| BarcodekitError::io(path, e))?;
        let line = line.trim_end_matches('\r');

        if let Some(header) = line.strip_prefix('>') {
            if let Some(prev) = id.take() {
                f(FastaRecord {
                    id: prev,
                    seq: std::mem::take(&mut seq),
                })?;
            }
            let token = header.split_whitespace().next().unwrap_or("");
            id = Some(token.to_string());
        } else if !line.is_empty() {
            if id.is_none() {
                return Err(BarcodekitError::Fasta {
                    path: path.to_path_buf(),
                    line: line_no,
                    message: "sequence data before first header".to_string(),
                });
            }
            seq.extend_from_slice(line.as_bytes());
        }
    }

    if let Some(prev) = id {
        f(FastaRecord { id: prev, seq })?;
    }
    Ok(())
}

/// Write one FASTA record.
pub fn write_fasta<W: Write>(w: &mut W, id: &str, seq: &[u8]) -> std::io::Result<()> {
    w.write_all(b">")?;
    w.write_all(id.as_bytes())?;
    w.write_all(b"\n")?;
    w.write_all(seq)?;
    w.write_all(b"\n")
}
