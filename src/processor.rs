use anyhow::{Context, Result};
use log::{debug, info};
use rayon::prelude::*;

use crate::blast_xml::{parse_blast_xml_str, parse_hit, BlastDocument, HitNode};
use crate::hit_record::{HitRecord, Hsp, RawHit};
use crate::lookup::{GeneRegistryLookup, SequenceLookup};
use crate::resolver::GeneSymbolResolver;

/// Configuration for a processing run
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Worker threads; above 1 hits are annotated on the rayon pool
    pub threads: usize,
    /// Whether linked-gene data may be consulted
    pub gene_linkage: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            threads: 1,
            gene_linkage: true,
        }
    }
}

/// Counters for one processed document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub hits_seen: usize,
    pub hits_without_hsp: usize,
    pub records_emitted: usize,
    pub symbols_resolved: usize,
}

/// A hit that survived filtering, before numbering
struct Annotated {
    raw: RawHit,
    hsp: Hsp,
    gene_symbol: Option<String>,
    original_name: String,
}

/// Turns a BLAST XML document into numbered, gene-annotated hit records
pub struct BlastResultProcessor<'a> {
    sequences: &'a dyn SequenceLookup,
    resolver: GeneSymbolResolver<'a>,
    config: ProcessorConfig,
}

impl<'a> BlastResultProcessor<'a> {
    pub fn new(
        sequences: &'a dyn SequenceLookup,
        registry: Option<&'a dyn GeneRegistryLookup>,
        config: ProcessorConfig,
    ) -> Self {
        BlastResultProcessor {
            sequences,
            resolver: GeneSymbolResolver::new(registry, config.gene_linkage),
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Parse and process a BLAST XML string
    pub fn process_str(&self, xml: &str) -> Result<Vec<HitRecord>> {
        let document = parse_blast_xml_str(xml)?;
        self.process_document(&document)
    }

    pub fn process_document(&self, document: &BlastDocument) -> Result<Vec<HitRecord>> {
        let (records, summary) = self.process_document_with_summary(document)?;
        let mean_identity = if records.is_empty() {
            0.0
        } else {
            records.iter().map(HitRecord::percent_identity).sum::<f64>() / records.len() as f64
        };
        info!(
            "{} query '{}': {} hits, {} without HSP, {} records, {} symbols resolved, mean identity {:.1}%",
            if document.program.is_empty() { "BLAST" } else { document.program.as_str() },
            document.query_def,
            summary.hits_seen,
            summary.hits_without_hsp,
            summary.records_emitted,
            summary.symbols_resolved,
            mean_identity
        );
        Ok(records)
    }

    /// Process a document and report the counters alongside the records
    pub fn process_document_with_summary(
        &self,
        document: &BlastDocument,
    ) -> Result<(Vec<HitRecord>, RunSummary)> {
        let annotated: Vec<Option<Annotated>> = if self.config.threads > 1 {
            let nodes: Vec<&HitNode> = document.hits().collect();
            nodes
                .par_iter()
                .map(|node| self.annotate(node))
                .collect::<Result<_>>()?
        } else {
            document
                .hits()
                .map(|node| self.annotate(node))
                .collect::<Result<_>>()?
        };

        let hits_seen = annotated.len();
        // numbering happens only after dropped hits are gone
        let records: Vec<HitRecord> = annotated
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(index, hit)| {
                HitRecord::from_parts(index + 1, hit.raw, hit.hsp, hit.gene_symbol, hit.original_name)
            })
            .collect();

        let summary = RunSummary {
            hits_seen,
            hits_without_hsp: hits_seen - records.len(),
            records_emitted: records.len(),
            symbols_resolved: records.iter().filter(|r| r.is_resolved()).count(),
        };
        Ok((records, summary))
    }

    /// Parse and annotate one hit; `None` when it has no HSP
    fn annotate(&self, node: &HitNode) -> Result<Option<Annotated>> {
        let mut raw = parse_hit(node);
        let Some(hsp) = raw.hsp.take() else {
            debug!("Dropping hit '{}': no HSP", raw.hit_id);
            return Ok(None);
        };

        let sequence = self
            .sequences
            .find(&raw.hit_id)
            .with_context(|| format!("Sequence lookup failed for hit '{}'", raw.hit_id))?;
        let gene_symbol = self
            .resolver
            .resolve(sequence.as_ref(), &raw.hit_id, &raw.hit_definition)?;
        let original_name = self
            .resolver
            .original_name(sequence.as_ref(), &raw.hit_definition);

        Ok(Some(Annotated {
            raw,
            hsp,
            gene_symbol,
            original_name,
        }))
    }
}
