// Library exports for blastgene
pub mod blast_xml;
pub mod format_io;
pub mod gene_pattern;
pub mod hit_record;
pub mod lookup;
pub mod processor;
pub mod resolver;
pub mod seq_registry;

pub use blast_xml::{parse_blast_xml_file, parse_blast_xml_str, BlastDocument};
pub use hit_record::{HitRecord, UNRESOLVED_SYMBOL};
pub use lookup::{GeneRecord, GeneRegistryLookup, LinkedGene, SequenceLookup, SequenceRecord};
pub use processor::{BlastResultProcessor, ProcessorConfig, RunSummary};
pub use resolver::GeneSymbolResolver;
