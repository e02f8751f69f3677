/// Reading BLAST XML input and writing annotated hits
///
/// Input may be plain or gzip-compressed, from a file or stdin. Output is TSV
/// with a header row or a JSON array, both using the `HitRecord` field names.

use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;

use crate::hit_record::HitRecord;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a file, decompressing `.gz`/`.bgz` by extension
pub fn open_blast_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Could not open {}", path.display()))?;

    // Check by file extension (faster than reading magic bytes)
    let is_compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz" || ext == "bgz")
        .unwrap_or(false);

    if is_compressed {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read a whole BLAST XML document from a path, or from stdin when `None`.
///
/// Gzip-compressed stdin is detected from its magic bytes.
pub fn read_blast_input(path: Option<&Path>) -> Result<String> {
    let mut text = String::new();
    match path {
        Some(path) => {
            open_blast_input(path)?
                .read_to_string(&mut text)
                .with_context(|| format!("Could not read {}", path.display()))?;
        }
        None => {
            let mut stdin = BufReader::new(io::stdin().lock());
            let is_compressed = stdin.fill_buf()?.starts_with(&GZIP_MAGIC);
            let read = if is_compressed {
                MultiGzDecoder::new(stdin).read_to_string(&mut text)
            } else {
                stdin.read_to_string(&mut text)
            };
            read.context("Could not read BLAST XML from stdin")?;
        }
    }
    Ok(text)
}

/// Output encodings for annotated hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tsv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            _ => bail!("Unknown output format: {s} (expected tsv or json)"),
        }
    }
}

/// Write records in the requested format
pub fn write_hits<W: Write>(writer: W, records: &[HitRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Tsv => write_tsv(writer, records),
        OutputFormat::Json => write_json(writer, records),
    }
}

fn write_tsv<W: Write>(writer: W, records: &[HitRecord]) -> Result<()> {
    let mut tsv = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    // explicit header so an empty result still has one
    tsv.write_record(HitRecord::FIELDS)?;
    for record in records {
        tsv.serialize(record)?;
    }
    tsv.flush()?;
    Ok(())
}

fn write_json<W: Write>(mut writer: W, records: &[HitRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write records to a file, or stdout when `None`
pub fn write_hits_to(path: Option<&Path>, records: &[HitRecord], format: OutputFormat) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
            write_hits(io::BufWriter::new(file), records, format)
        }
        None => write_hits(io::stdout().lock(), records, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit_record::{Hsp, RawHit};
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn record() -> HitRecord {
        let raw = RawHit {
            hit_id: "123".to_string(),
            hit_definition: "lcl|123 Homo sapiens gene X".to_string(),
            hit_accession: "123".to_string(),
            hit_length: 1500,
            hsp: None,
        };
        let hsp = Hsp {
            bit_score: 250.5,
            score: 135,
            e_value: 0.5,
            identity: 138,
            align_length: 140,
            ..Default::default()
        };
        HitRecord::from_parts(1, raw, hsp, Some("TP53".to_string()), "gene X".to_string())
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("tsv".parse::<OutputFormat>().unwrap(), OutputFormat::Tsv);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("paf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_write_tsv() {
        let mut out = Vec::new();
        write_hits(&mut out, &[record()], OutputFormat::Tsv).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], HitRecord::FIELDS.join("\t"));
        assert_eq!(
            lines[1],
            "1\t123\tlcl|123 Homo sapiens gene X\tTP53\tgene X\t1500\t250.5\t135\t0.5\t0\t0\t0\t0\t138\t0\t0\t140"
        );
    }

    #[test]
    fn test_write_tsv_empty_has_header() {
        let mut out = Vec::new();
        write_hits(&mut out, &[], OutputFormat::Tsv).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_write_json() {
        let mut out = Vec::new();
        write_hits(&mut out, &[record()], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let first = &value[0];
        assert_eq!(first["hit_number"], 1);
        assert_eq!(first["gene_symbol"], "TP53");
        assert_eq!(first["bit_score"], 250.5);
        assert_eq!(first["align_length"], 140);
        assert_eq!(first.as_object().unwrap().len(), HitRecord::FIELDS.len());
    }

    #[test]
    fn test_read_gzip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xml.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"<BlastOutput/>").unwrap();
        encoder.finish().unwrap();

        assert_eq!(read_blast_input(Some(&path)).unwrap(), "<BlastOutput/>");
    }
}
