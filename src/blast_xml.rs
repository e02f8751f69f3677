//! BLAST XML (`-outfmt 5`) document model and per-hit parsing.
//!
//! Leaf values are deserialized as raw text and coerced afterwards, so a
//! malformed number in one field never aborts the rest of the document. Only
//! structural problems (unparseable XML, wrong root element, no iterations
//! container) are reported as errors.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use std::path::Path;

use crate::hit_record::{coerce_float, coerce_int, Hsp, RawHit};

const ROOT_ELEMENT: &str = "BlastOutput";

#[derive(Debug, Deserialize)]
struct BlastOutputXml {
    #[serde(rename = "BlastOutput_program")]
    program: Option<String>,
    #[serde(rename = "BlastOutput_query-def")]
    query_def: Option<String>,
    #[serde(rename = "BlastOutput_iterations")]
    iterations: Option<IterationsXml>,
}

#[derive(Debug, Deserialize)]
struct IterationsXml {
    #[serde(rename = "Iteration", default)]
    iterations: Vec<IterationXml>,
}

#[derive(Debug, Deserialize)]
struct IterationXml {
    #[serde(rename = "Iteration_hits")]
    hits: Option<IterationHitsXml>,
}

#[derive(Debug, Deserialize)]
struct IterationHitsXml {
    #[serde(rename = "Hit", default)]
    hits: Vec<HitNode>,
}

/// One `<Hit>` element with its text leaves kept verbatim
#[derive(Debug, Clone, Deserialize)]
pub struct HitNode {
    #[serde(rename = "Hit_def")]
    definition: Option<String>,
    #[serde(rename = "Hit_accession")]
    accession: Option<String>,
    #[serde(rename = "Hit_len")]
    length: Option<String>,
    #[serde(rename = "Hit_hsps")]
    hsps: Option<HspsXml>,
}

#[derive(Debug, Clone, Deserialize)]
struct HspsXml {
    #[serde(rename = "Hsp", default)]
    hsps: Vec<HspXml>,
}

#[derive(Debug, Clone, Deserialize)]
struct HspXml {
    #[serde(rename = "Hsp_bit-score")]
    bit_score: Option<String>,
    #[serde(rename = "Hsp_score")]
    score: Option<String>,
    #[serde(rename = "Hsp_evalue")]
    evalue: Option<String>,
    #[serde(rename = "Hsp_query-from")]
    query_from: Option<String>,
    #[serde(rename = "Hsp_query-to")]
    query_to: Option<String>,
    #[serde(rename = "Hsp_hit-from")]
    hit_from: Option<String>,
    #[serde(rename = "Hsp_hit-to")]
    hit_to: Option<String>,
    #[serde(rename = "Hsp_identity")]
    identity: Option<String>,
    #[serde(rename = "Hsp_positive")]
    positive: Option<String>,
    #[serde(rename = "Hsp_gaps")]
    gaps: Option<String>,
    #[serde(rename = "Hsp_align-len")]
    align_len: Option<String>,
}

/// A parsed BLAST XML document
#[derive(Debug, Clone)]
pub struct BlastDocument {
    pub program: String,
    pub query_def: String,
    iterations: Vec<Vec<HitNode>>,
}

impl BlastDocument {
    /// All hit nodes, across iterations, in document order
    pub fn hits(&self) -> impl Iterator<Item = &HitNode> {
        self.iterations.iter().flatten()
    }

    pub fn hit_count(&self) -> usize {
        self.iterations.iter().map(Vec::len).sum()
    }

    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Name of the first element in the document
fn root_element_name(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => bail!("Malformed BLAST XML: document has no root element"),
            Ok(_) => {}
            Err(e) => {
                return Err(anyhow!(
                    "Malformed BLAST XML at position {}: {e}",
                    reader.buffer_position()
                ))
            }
        }
    }
}

/// Parse a BLAST XML string into a [`BlastDocument`].
///
/// # Errors
///
/// Fails when the text is not well-formed XML, when the root element is not
/// `<BlastOutput>`, or when `<BlastOutput_iterations>` is missing.
pub fn parse_blast_xml_str(xml: &str) -> Result<BlastDocument> {
    let root = root_element_name(xml)?;
    if root != ROOT_ELEMENT {
        bail!("Unsupported XML document: expected <{ROOT_ELEMENT}> root element, found <{root}>");
    }

    let parsed: BlastOutputXml =
        quick_xml::de::from_str(xml).map_err(|e| anyhow!("Malformed BLAST XML: {e}"))?;
    let iterations = parsed
        .iterations
        .ok_or_else(|| anyhow!("Malformed BLAST XML: missing <BlastOutput_iterations>"))?;

    Ok(BlastDocument {
        program: parsed.program.unwrap_or_default(),
        query_def: parsed.query_def.unwrap_or_default(),
        iterations: iterations
            .iterations
            .into_iter()
            .map(|iteration| iteration.hits.map(|h| h.hits).unwrap_or_default())
            .collect(),
    })
}

pub fn parse_blast_xml_file<P: AsRef<Path>>(path: P) -> Result<BlastDocument> {
    let path = path.as_ref();
    let xml = crate::format_io::read_blast_input(Some(path))?;
    parse_blast_xml_str(&xml).with_context(|| format!("Could not parse BLAST XML file {}", path.display()))
}

/// Identifier from a `source|id description` definition line.
///
/// Takes the first whitespace-delimited token of the second `|` field and
/// falls back to the accession when there is no such token.
pub fn extract_hit_id(definition: &str, accession: &str) -> String {
    definition
        .split('|')
        .nth(1)
        .and_then(|field| field.split_whitespace().next())
        .unwrap_or(accession)
        .to_string()
}

fn parse_hsp(hsp: &HspXml) -> Hsp {
    Hsp {
        bit_score: coerce_float(text(&hsp.bit_score)),
        score: coerce_int(text(&hsp.score)),
        e_value: coerce_float(text(&hsp.evalue)),
        query_from: coerce_int(text(&hsp.query_from)),
        query_to: coerce_int(text(&hsp.query_to)),
        hit_from: coerce_int(text(&hsp.hit_from)),
        hit_to: coerce_int(text(&hsp.hit_to)),
        identity: coerce_int(text(&hsp.identity)),
        positive: coerce_int(text(&hsp.positive)),
        gaps: coerce_int(text(&hsp.gaps)),
        align_length: coerce_int(text(&hsp.align_len)),
    }
}

/// Decode one hit node. The first HSP in document order is taken as the
/// representative segment; BLAST emits HSPs sorted by score.
pub fn parse_hit(node: &HitNode) -> RawHit {
    let hit_definition = text(&node.definition).to_string();
    let hit_accession = text(&node.accession).to_string();
    let hsp = node
        .hsps
        .as_ref()
        .and_then(|hsps| hsps.hsps.first())
        .map(parse_hsp);

    RawHit {
        hit_id: extract_hit_id(&hit_definition, &hit_accession),
        hit_length: coerce_int(text(&node.length)),
        hit_definition,
        hit_accession,
        hsp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<!DOCTYPE BlastOutput PUBLIC "-//NCBI//NCBI BlastOutput/EN" "http://www.ncbi.nlm.nih.gov/dtd/NCBI_BlastOutput.dtd">
<BlastOutput>
  <BlastOutput_program>blastn</BlastOutput_program>
  <BlastOutput_query-def>query_1</BlastOutput_query-def>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_iter-num>1</Iteration_iter-num>
      <Iteration_hits>
        <Hit>
          <Hit_num>1</Hit_num>
          <Hit_id>lcl|123</Hit_id>
          <Hit_def>lcl|123 Homo sapiens gene X</Hit_def>
          <Hit_accession>123</Hit_accession>
          <Hit_len>1500</Hit_len>
          <Hit_hsps>
            <Hsp>
              <Hsp_num>1</Hsp_num>
              <Hsp_bit-score>250.5</Hsp_bit-score>
              <Hsp_score>135</Hsp_score>
              <Hsp_evalue>1.2e-65</Hsp_evalue>
              <Hsp_query-from>1</Hsp_query-from>
              <Hsp_query-to>140</Hsp_query-to>
              <Hsp_hit-from>11</Hsp_hit-from>
              <Hsp_hit-to>150</Hsp_hit-to>
              <Hsp_identity>138</Hsp_identity>
              <Hsp_positive>138</Hsp_positive>
              <Hsp_gaps>0</Hsp_gaps>
              <Hsp_align-len>140</Hsp_align-len>
              <Hsp_qseq>ACGT</Hsp_qseq>
            </Hsp>
            <Hsp>
              <Hsp_bit-score>20.1</Hsp_bit-score>
              <Hsp_score>10</Hsp_score>
            </Hsp>
          </Hit_hsps>
        </Hit>
        <Hit>
          <Hit_def>no alignments here</Hit_def>
          <Hit_accession>XM_0001</Hit_accession>
          <Hit_len>n/a</Hit_len>
          <Hit_hsps></Hit_hsps>
        </Hit>
      </Iteration_hits>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>
"#;

    #[test]
    fn test_parse_document() {
        let doc = parse_blast_xml_str(DOC).unwrap();
        assert_eq!(doc.program, "blastn");
        assert_eq!(doc.query_def, "query_1");
        assert_eq!(doc.iteration_count(), 1);
        assert_eq!(doc.hit_count(), 2);
    }

    #[test]
    fn test_parse_hit_takes_first_hsp() {
        let doc = parse_blast_xml_str(DOC).unwrap();
        let raw = parse_hit(doc.hits().next().unwrap());
        assert_eq!(raw.hit_id, "123");
        assert_eq!(raw.hit_definition, "lcl|123 Homo sapiens gene X");
        assert_eq!(raw.hit_length, 1500);

        let hsp = raw.hsp.unwrap();
        assert_eq!(hsp.bit_score, 250.5);
        assert_eq!(hsp.score, 135);
        assert_eq!(hsp.e_value, 1.2e-65);
        assert_eq!(hsp.hit_from, 11);
        assert_eq!(hsp.identity, 138);
        assert_eq!(hsp.align_length, 140);
    }

    #[test]
    fn test_hit_without_hsp() {
        let doc = parse_blast_xml_str(DOC).unwrap();
        let raw = parse_hit(doc.hits().nth(1).unwrap());
        assert!(raw.hsp.is_none());
        assert_eq!(raw.hit_id, "XM_0001");
        assert_eq!(raw.hit_length, 0);
    }

    #[test]
    fn test_extract_hit_id() {
        assert_eq!(extract_hit_id("lcl|123 Homo sapiens gene X", "ACC"), "123");
        assert_eq!(extract_hit_id("gi|456", "ACC"), "456");
        assert_eq!(extract_hit_id("gi|| something", "ACC"), "ACC");
        assert_eq!(extract_hit_id("gi|", "ACC"), "ACC");
        assert_eq!(extract_hit_id("gi|   ", "ACC"), "ACC");
        assert_eq!(extract_hit_id("no pipes at all", "ACC"), "ACC");
        assert_eq!(extract_hit_id("", ""), "");
        assert_eq!(extract_hit_id("ref|NM_000546.6| TP53 mRNA", "ACC"), "NM_000546.6");
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let err = parse_blast_xml_str("<GBSet><GBSeq/></GBSet>").unwrap_err();
        assert!(err.to_string().contains("BlastOutput"), "{err}");
    }

    #[test]
    fn test_missing_iterations_is_rejected() {
        let err = parse_blast_xml_str("<BlastOutput><BlastOutput_program>blastn</BlastOutput_program></BlastOutput>")
            .unwrap_err();
        assert!(err.to_string().contains("BlastOutput_iterations"), "{err}");
    }

    #[test]
    fn test_unparseable_is_rejected() {
        assert!(parse_blast_xml_str("").is_err());
        assert!(parse_blast_xml_str("this is not xml").is_err());
        assert!(parse_blast_xml_str("<BlastOutput><BlastOutput_iterations></BlastOutput>").is_err());
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xml");
        std::fs::write(&path, DOC).unwrap();
        assert_eq!(parse_blast_xml_file(&path).unwrap().hit_count(), 2);

        let bad = dir.path().join("bad.xml");
        std::fs::write(&bad, "<html/>").unwrap();
        let err = parse_blast_xml_file(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("bad.xml"), "{err:#}");
    }

    #[test]
    fn test_empty_iteration() {
        let xml = "<BlastOutput><BlastOutput_iterations><Iteration><Iteration_iter-num>1</Iteration_iter-num><Iteration_hits></Iteration_hits><Iteration_message>No hits found</Iteration_message></Iteration></BlastOutput_iterations></BlastOutput>";
        let doc = parse_blast_xml_str(xml).unwrap();
        assert_eq!(doc.iteration_count(), 1);
        assert_eq!(doc.hit_count(), 0);
    }
}
