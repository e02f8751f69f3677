//! Record types and data-access traits the resolver is written against.
//!
//! Every field a record store may or may not carry is an `Option`; the
//! resolver branches on presence instead of on the store's schema.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A gene linked to a sequence in the record store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedGene {
    pub hgnc_symbol: Option<String>,
    pub original_name: Option<String>,
}

/// A stored sequence, looked up by hit identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub identifier: String,
    pub name: Option<String>,
    pub gene_name: Option<String>,
    pub linked_gene: Option<LinkedGene>,
}

impl SequenceRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        SequenceRecord {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_gene_name(mut self, gene_name: impl Into<String>) -> Self {
        self.gene_name = Some(gene_name.into());
        self
    }

    pub fn with_linked_gene(mut self, gene: LinkedGene) -> Self {
        self.linked_gene = Some(gene);
        self
    }
}

/// A registered gene with its canonical HGNC symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub hgnc_symbol: String,
    pub original_name: String,
}

impl GeneRecord {
    pub fn new(original_name: impl Into<String>, hgnc_symbol: impl Into<String>) -> Self {
        GeneRecord {
            hgnc_symbol: hgnc_symbol.into(),
            original_name: original_name.into(),
        }
    }
}

/// Finds the stored sequence for a hit identifier.
///
/// `Ok(None)` means "no such sequence"; errors are reserved for failures of
/// the store itself and abort the run.
pub trait SequenceLookup: Send + Sync {
    fn find(&self, identifier: &str) -> Result<Option<SequenceRecord>>;
}

/// Finds a registered gene by original name, ignoring case.
///
/// Implementations return `Ok(None)` for blank input without querying.
pub trait GeneRegistryLookup: Send + Sync {
    fn find_by_original_name_ci(&self, name: &str) -> Result<Option<GeneRecord>>;
}

/// A store with no sequences
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSequences;

impl SequenceLookup for NoSequences {
    fn find(&self, _identifier: &str) -> Result<Option<SequenceRecord>> {
        Ok(None)
    }
}

/// `Some(s)` only when `s` is non-empty. Whitespace counts as content.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Whether a lookup key is blank (empty or whitespace only)
pub fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(Some(" ")), Some(" "));
        assert_eq!(non_empty(Some("TP53")), Some("TP53"));
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("  \t"));
        assert!(!is_blank(" a "));
    }

    #[test]
    fn test_builders() {
        let record = SequenceRecord::new("42")
            .with_name("BRCA1")
            .with_gene_name("BRCA1")
            .with_linked_gene(LinkedGene {
                hgnc_symbol: Some("BRCA1".into()),
                original_name: None,
            });
        assert_eq!(record.identifier, "42");
        assert_eq!(record.name.as_deref(), Some("BRCA1"));
        assert!(record.linked_gene.is_some());
        assert_eq!(NoSequences.find("42").unwrap(), None);
    }
}
