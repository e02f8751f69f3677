use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Marker written in place of a gene symbol that could not be resolved
pub const UNRESOLVED_SYMBOL: &str = "-";

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("float prefix pattern is valid")
});

/// Lenient integer coercion: the longest leading `[+-]?digits` prefix, 0 otherwise.
///
/// `"12abc"` gives 12, `"3.7"` gives 3 and `"n/a"` gives 0. Values that do not
/// fit in an `i64` saturate.
pub fn coerce_int(text: &str) -> i64 {
    let s = text.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return 0;
    }

    match digits[..end].parse::<i64>() {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    }
}

/// Lenient float coercion: the longest leading decimal (with optional exponent), 0.0 otherwise.
pub fn coerce_float(text: &str) -> f64 {
    FLOAT_PREFIX
        .find(text.trim())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// The representative high-scoring segment pair of a hit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Hsp {
    pub bit_score: f64,
    pub score: i64,
    pub e_value: f64,
    pub query_from: i64,
    pub query_to: i64,
    pub hit_from: i64,
    pub hit_to: i64,
    pub identity: i64,
    pub positive: i64,
    pub gaps: i64,
    pub align_length: i64,
}

/// A hit as read from the XML, before any gene annotation
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub hit_id: String,
    pub hit_definition: String,
    pub hit_accession: String,
    pub hit_length: i64,
    /// First HSP in document order; `None` means the hit is dropped
    pub hsp: Option<Hsp>,
}

/// Annotated output record, one per hit that carried an HSP.
///
/// Field names and order are the output contract for both TSV and JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitRecord {
    pub hit_number: usize,
    pub hit_id: String,
    pub hit_definition: String,
    pub gene_symbol: String,
    pub original_name: String,
    pub hit_length: i64,
    pub bit_score: f64,
    pub score: i64,
    pub e_value: f64,
    pub query_from: i64,
    pub query_to: i64,
    pub hit_from: i64,
    pub hit_to: i64,
    pub identity: i64,
    pub positive: i64,
    pub gaps: i64,
    pub align_length: i64,
}

impl HitRecord {
    /// Column names in serialization order
    pub const FIELDS: [&'static str; 17] = [
        "hit_number",
        "hit_id",
        "hit_definition",
        "gene_symbol",
        "original_name",
        "hit_length",
        "bit_score",
        "score",
        "e_value",
        "query_from",
        "query_to",
        "hit_from",
        "hit_to",
        "identity",
        "positive",
        "gaps",
        "align_length",
    ];

    /// Assemble a record from a parsed hit, its HSP and the annotation results
    pub fn from_parts(
        hit_number: usize,
        raw: RawHit,
        hsp: Hsp,
        gene_symbol: Option<String>,
        original_name: String,
    ) -> Self {
        HitRecord {
            hit_number,
            hit_id: raw.hit_id,
            hit_definition: raw.hit_definition,
            gene_symbol: gene_symbol.unwrap_or_else(|| UNRESOLVED_SYMBOL.to_string()),
            original_name,
            hit_length: raw.hit_length,
            bit_score: hsp.bit_score,
            score: hsp.score,
            e_value: hsp.e_value,
            query_from: hsp.query_from,
            query_to: hsp.query_to,
            hit_from: hsp.hit_from,
            hit_to: hsp.hit_to,
            identity: hsp.identity,
            positive: hsp.positive,
            gaps: hsp.gaps,
            align_length: hsp.align_length,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.gene_symbol != UNRESOLVED_SYMBOL
    }

    /// Identity as a percentage of the alignment length
    pub fn percent_identity(&self) -> f64 {
        if self.align_length <= 0 {
            return 0.0;
        }
        self.identity as f64 / self.align_length as f64 * 100.0
    }
}

impl fmt::Display for HitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [{}] bits={} evalue={:e} identity={}/{}",
            self.hit_number,
            self.hit_id,
            self.gene_symbol,
            self.bit_score,
            self.e_value,
            self.identity,
            self.align_length
        )
    }
}
