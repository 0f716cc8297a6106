//src/blast.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::LcaError;
use crate::types::HitRecord;

/// Column holding the query id.
pub const QSEQID_FIELD: usize = 0;
/// Column holding the subject taxon identifier(s).
pub const STAXIDS_FIELD: usize = 2;
/// Column holding percent identity.
pub const PIDENT_FIELD: usize = 6;

/// Sentinel BLAST writes when a subject has no taxon identifier.
pub const MISSING_TAXID: &str = "NA";

/// Hits that passed the percent-identity floor, plus how many did not.
#[derive(Debug, Clone, Default)]
pub struct BlastHits {
    pub records: Vec<HitRecord>,
    pub below_floor: usize,
}

/// Opens a BLAST-tabular file, transparently decompressing `.gz`.
pub fn open_blast_table<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>, LcaError> {
    let path = path.as_ref();
    let f = File::open(path)?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// Reads BLAST-tabular rows (outfmt 6 or 7) and keeps those with
/// `pident >= min_pident`. Blank and `#` lines are skipped.
///
/// A kept row whose taxon identifier is `NA` aborts the read.
pub fn read_blast_hits<R: BufRead>(reader: R, min_pident: f64) -> Result<BlastHits, LcaError> {
    let mut hits = BlastHits::default();

    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line_no = idx + 1;
        let row = line.trim_end();
        if row.is_empty() || row.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() <= PIDENT_FIELD {
            return Err(LcaError::MalformedRow {
                line: line_no,
                reason: format!(
                    "expected at least {} tab-separated fields, found {}",
                    PIDENT_FIELD + 1,
                    fields.len()
                ),
            });
        }

        let pident_str = fields[PIDENT_FIELD].trim();
        let pident: f64 = pident_str.parse().map_err(|_| LcaError::MalformedRow {
            line: line_no,
            reason: format!("percent identity '{}' is not a number", pident_str),
        })?;
        if !(0.0..=100.0).contains(&pident) {
            return Err(LcaError::MalformedRow {
                line: line_no,
                reason: format!("percent identity {} is outside 0..=100", pident),
            });
        }

        if pident < min_pident {
            hits.below_floor += 1;
            continue;
        }

        // staxids may list several ids ("9606;9598"); the first one names the subject
        let taxid = fields[STAXIDS_FIELD]
            .split(';')
            .next()
            .unwrap_or("")
            .trim();
        if taxid.is_empty() || taxid == MISSING_TAXID {
            return Err(LcaError::MissingTaxid {
                line: line_no,
                row: row.to_string(),
            });
        }

        hits.records.push(HitRecord {
            query_id: fields[QSEQID_FIELD].trim().to_string(),
            taxid: taxid.to_string(),
            pident,
        });
    }

    log::info!(
        "Read {} BLAST hits ({} below the {}% identity floor)",
        hits.records.len(),
        hits.below_floor,
        min_pident
    );
    Ok(hits)
}

/// Distinct taxon identifiers in first-seen order.
pub fn distinct_taxids(records: &[HitRecord]) -> Vec<String> {
    let mut seen = ahash::AHashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.taxid.as_str()))
        .map(|r| r.taxid.clone())
        .collect()
}
