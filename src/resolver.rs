use anyhow::{Context, Result};
use log::debug;

use crate::gene_pattern::{extract_gene_name, looks_like_symbol};
use crate::lookup::{non_empty, GeneRegistryLookup, LinkedGene, SequenceRecord};

/// Picks a gene symbol for a hit through a chain of increasingly
/// speculative heuristics, stopping at the first that yields one:
///
/// 1. the symbol of the sequence's linked gene (when gene linkage is enabled)
/// 2. the sequence's own `gene_name`
/// 3. a registry lookup on a candidate name, taken from the sequence name,
///    else from patterns in the hit definition, else from the hit identifier
///    when it is shaped like a symbol
pub struct GeneSymbolResolver<'a> {
    registry: Option<&'a dyn GeneRegistryLookup>,
    gene_linkage: bool,
}

impl<'a> GeneSymbolResolver<'a> {
    pub fn new(registry: Option<&'a dyn GeneRegistryLookup>, gene_linkage: bool) -> Self {
        GeneSymbolResolver {
            registry,
            gene_linkage,
        }
    }

    pub fn gene_linkage(&self) -> bool {
        self.gene_linkage
    }

    /// The sequence's linked gene, if linkage is enabled and one is present
    pub fn linked_gene<'s>(&self, sequence: Option<&'s SequenceRecord>) -> Option<&'s LinkedGene> {
        if !self.gene_linkage {
            return None;
        }
        sequence.and_then(|s| s.linked_gene.as_ref())
    }

    /// Name to show for a hit: sequence name, then linked gene's original
    /// name, then the hit definition.
    pub fn original_name(&self, sequence: Option<&SequenceRecord>, hit_definition: &str) -> String {
        non_empty(sequence.and_then(|s| s.name.as_deref()))
            .or_else(|| non_empty(self.linked_gene(sequence).and_then(|g| g.original_name.as_deref())))
            .unwrap_or(hit_definition)
            .to_string()
    }

    /// Name to look up in the registry, if any heuristic produces one
    pub fn candidate_name<'s>(
        &self,
        sequence: Option<&'s SequenceRecord>,
        hit_id: &'s str,
        hit_definition: &'s str,
    ) -> Option<&'s str> {
        let name = non_empty(sequence.and_then(|s| s.name.as_deref()))
            .filter(|name| *name != hit_definition);

        name.or_else(|| extract_gene_name(hit_definition))
            .or_else(|| looks_like_symbol(hit_id).then_some(hit_id))
    }

    /// Resolve a symbol, or `None` when every heuristic comes up empty.
    ///
    /// Only registry failures are errors; missing data never is.
    pub fn resolve(
        &self,
        sequence: Option<&SequenceRecord>,
        hit_id: &str,
        hit_definition: &str,
    ) -> Result<Option<String>> {
        if let Some(symbol) = non_empty(self.linked_gene(sequence).and_then(|g| g.hgnc_symbol.as_deref())) {
            debug!("{hit_id}: symbol {symbol} from linked gene");
            return Ok(Some(symbol.to_string()));
        }

        if let Some(gene_name) = non_empty(sequence.and_then(|s| s.gene_name.as_deref())) {
            debug!("{hit_id}: symbol {gene_name} from sequence gene name");
            return Ok(Some(gene_name.to_string()));
        }

        let Some(candidate) = self.candidate_name(sequence, hit_id, hit_definition) else {
            return Ok(None);
        };
        let Some(registry) = self.registry else {
            return Ok(None);
        };

        let gene = registry
            .find_by_original_name_ci(candidate)
            .with_context(|| format!("Gene registry lookup failed for '{candidate}' (hit {hit_id})"))?;
        let symbol = gene
            .map(|g| g.hgnc_symbol)
            .filter(|symbol| !symbol.is_empty());
        if let Some(symbol) = &symbol {
            debug!("{hit_id}: symbol {symbol} from registry match on '{candidate}'");
        }

        Ok(symbol)
    }
}
