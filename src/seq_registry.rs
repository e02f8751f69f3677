/// In-memory sequence and gene tables backing the lookup traits
///
/// Both tables load from delimited text with a header row (comma separated,
/// or tab separated for `.tsv`/`.tab`/`.txt`). Which optional sequence columns
/// exist is decided once from the header.

use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::lookup::{is_blank, GeneRecord, GeneRegistryLookup, LinkedGene, SequenceLookup, SequenceRecord};

/// Field delimiter for a table path
pub fn delimiter_for<P: AsRef<Path>>(path: P) -> u8 {
    let is_tab = path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "tsv" | "tab" | "txt"))
        .unwrap_or(false);
    if is_tab {
        b'\t'
    } else {
        b','
    }
}

fn open_table<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn cell(record: &csv::StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Sequences keyed by identifier
#[derive(Debug, Default)]
pub struct SequenceTable {
    sequences: HashMap<String, SequenceRecord>,

    /// Whether the source carried linked-gene columns
    gene_links: bool,
}

impl SequenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records; gene links are available if any record has one
    pub fn from_records<I: IntoIterator<Item = SequenceRecord>>(records: I) -> Self {
        let mut table = Self::new();
        for record in records {
            table.gene_links |= record.linked_gene.is_some();
            table.insert(record);
        }
        table
    }

    /// Load from a file; the delimiter follows the extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Could not open sequence table {}", path.display()))?;
        let table = Self::from_reader(file, delimiter_for(path))
            .with_context(|| format!("Could not load sequence table {}", path.display()))?;
        info!(
            "Loaded {} sequences from {} (gene links: {})",
            table.len(),
            path.display(),
            if table.gene_links { "yes" } else { "no" }
        );
        Ok(table)
    }

    /// Load from delimited text. Required column: `id`. Optional columns:
    /// `name`, `gene_name`, `hgnc_symbol`, `gene_original_name`.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv_reader = open_table(reader, delimiter);
        let headers = csv_reader.headers()?.clone();

        let Some(id_col) = column(&headers, "id") else {
            bail!("Missing required column 'id' in sequence table");
        };
        let name_col = column(&headers, "name");
        let gene_name_col = column(&headers, "gene_name");
        let symbol_col = column(&headers, "hgnc_symbol");
        let gene_original_col = column(&headers, "gene_original_name");

        let mut table = Self::new();
        table.gene_links = symbol_col.is_some() || gene_original_col.is_some();

        for (row, result) in csv_reader.records().enumerate() {
            // header is line 1
            let record = result.with_context(|| format!("Malformed row at line {}", row + 2))?;
            let Some(identifier) = cell(&record, Some(id_col)) else {
                warn!("Skipping sequence row at line {} with empty id", row + 2);
                continue;
            };

            let linked_gene = if table.gene_links {
                let gene = LinkedGene {
                    hgnc_symbol: cell(&record, symbol_col),
                    original_name: cell(&record, gene_original_col),
                };
                (gene.hgnc_symbol.is_some() || gene.original_name.is_some()).then_some(gene)
            } else {
                None
            };

            table.insert(SequenceRecord {
                identifier,
                name: cell(&record, name_col),
                gene_name: cell(&record, gene_name_col),
                linked_gene,
            });
        }

        Ok(table)
    }

    fn insert(&mut self, record: SequenceRecord) {
        if self.sequences.contains_key(&record.identifier) {
            warn!("Duplicate sequence id '{}', keeping the last row", record.identifier);
        }
        self.sequences.insert(record.identifier.clone(), record);
    }

    /// Whether linked-gene data is available at all
    pub fn has_gene_links(&self) -> bool {
        self.gene_links
    }

    pub fn get(&self, identifier: &str) -> Option<&SequenceRecord> {
        self.sequences.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl SequenceLookup for SequenceTable {
    fn find(&self, identifier: &str) -> Result<Option<SequenceRecord>> {
        Ok(self.get(identifier).cloned())
    }
}

/// Genes keyed by lowercased original name
#[derive(Debug, Default)]
pub struct GeneRegistry {
    genes: HashMap<String, GeneRecord>,
}

impl GeneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I: IntoIterator<Item = GeneRecord>>(records: I) -> Self {
        let mut registry = Self::new();
        for record in records {
            registry.insert(record);
        }
        registry
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Could not open gene registry {}", path.display()))?;
        let registry = Self::from_reader(file, delimiter_for(path))
            .with_context(|| format!("Could not load gene registry {}", path.display()))?;
        info!("Loaded {} genes from {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Load from delimited text with columns `original_name` and `hgnc_symbol`.
    /// Rows missing either value are skipped.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv_reader = open_table(reader, delimiter);
        let headers = csv_reader.headers()?.clone();

        let missing: Vec<&str> = ["original_name", "hgnc_symbol"]
            .into_iter()
            .filter(|name| column(&headers, name).is_none())
            .collect();
        if !missing.is_empty() {
            bail!("Missing required columns in gene registry: {}", missing.join(", "));
        }
        let name_col = column(&headers, "original_name");
        let symbol_col = column(&headers, "hgnc_symbol");

        let mut registry = Self::new();
        let mut skipped = 0usize;
        for (row, result) in csv_reader.records().enumerate() {
            let record = result.with_context(|| format!("Malformed row at line {}", row + 2))?;
            match (cell(&record, name_col), cell(&record, symbol_col)) {
                (Some(original_name), Some(hgnc_symbol)) => registry.insert(GeneRecord {
                    hgnc_symbol,
                    original_name,
                }),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("Skipped {skipped} gene registry rows with an empty name or symbol");
        }

        Ok(registry)
    }

    /// First entry for a name wins
    fn insert(&mut self, record: GeneRecord) {
        self.genes
            .entry(record.original_name.to_lowercase())
            .or_insert(record);
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl GeneRegistryLookup for GeneRegistry {
    fn find_by_original_name_ci(&self, name: &str) -> Result<Option<GeneRecord>> {
        if is_blank(name) {
            return Ok(None);
        }
        Ok(self.genes.get(&name.to_lowercase()).cloned())
    }
}
