//src/worms.rs

use ahash::AHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::LcaError;

/// Ranks at or below species in WoRMS `rank` strings.
const SPECIES_LEVEL_RANKS: [&str; 6] = [
    "species",
    "subspecies",
    "variety",
    "subvariety",
    "forma",
    "subforma",
];

/// Cell values treated as absent.
const NULL_CELLS: [&str; 3] = ["", "NA", "None"];

/// The fields of one WoRMS name-match record the LCA consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchRecord {
    /// Accepted name for the matched taxon.
    pub valid_name: Option<String>,
    /// Rank of the matched taxon ("Species", "Genus", ...).
    pub rank: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
}

impl MatchRecord {
    /// The accepted name if this record sits at species level or below.
    /// Without a rank, an accepted binomial counts as species level.
    pub fn species_name(&self) -> Option<&str> {
        let name = non_empty(&self.valid_name)?;
        let species_level = match non_empty(&self.rank) {
            Some(rank) => SPECIES_LEVEL_RANKS
                .iter()
                .any(|r| r.eq_ignore_ascii_case(rank)),
            None => name.split_whitespace().count() >= 2,
        };
        species_level.then_some(name)
    }

    pub fn class_name(&self) -> Option<&str> {
        non_empty(&self.class)
    }

    pub fn order_name(&self) -> Option<&str> {
        non_empty(&self.order)
    }

    pub fn family_name(&self) -> Option<&str> {
        non_empty(&self.family)
    }

    pub fn genus_name(&self) -> Option<&str> {
        non_empty(&self.genus)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Matches scientific names against a reference taxonomy.
///
/// Called once per run with every distinct name; entry `i` of the result
/// answers `names[i]`, `None` when there is no match.
pub trait LineageMatcher {
    fn match_names(&self, names: &[String]) -> Result<Vec<Option<MatchRecord>>, LcaError>;
}

/// File-backed name-match table: a tab-separated export with a header row
/// naming at least the columns `name`, `valid_name`, `rank`, `class`,
/// `order`, `family`, `genus` (any order, extra columns ignored).
#[derive(Debug, Clone, Default)]
pub struct WormsRecordTable {
    records: AHashMap<String, MatchRecord>,
}

const REQUIRED_COLUMNS: [&str; 7] = ["name", "valid_name", "rank", "class", "order", "family", "genus"];

impl WormsRecordTable {
    pub fn from_records<I, K>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, MatchRecord)>,
        K: Into<String>,
    {
        Self {
            records: records.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(filepath: P) -> Result<Self, LcaError> {
        let path = filepath.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// `source` only labels parse errors.
    pub fn from_reader<R: BufRead>(reader: R, source: &Path) -> Result<Self, LcaError> {
        let malformed = |line: usize, reason: String| LcaError::MalformedTable {
            path: PathBuf::from(source),
            line,
            reason,
        };

        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line?,
            None => return Ok(Self::default()),
        };
        let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

        let mut positions = [0usize; 7];
        for (slot, wanted) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| malformed(1, format!("header lacks a '{}' column", wanted)))?;
        }
        let width = positions.iter().copied().max().unwrap_or(0) + 1;

        let mut records = AHashMap::new();
        for (idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < width {
                return Err(malformed(
                    idx + 2,
                    format!("expected {} fields, found {}", width, parts.len()),
                ));
            }
            let cell = |i: usize| -> Option<String> {
                let v = parts[positions[i]].trim();
                (!NULL_CELLS.contains(&v)).then(|| v.to_string())
            };

            let Some(name) = cell(0) else { continue };
            let record = MatchRecord {
                valid_name: cell(1),
                rank: cell(2),
                class: cell(3),
                order: cell(4),
                family: cell(5),
                genus: cell(6),
            };
            // first record per name wins, as the service returns its best match first
            records.entry(name).or_insert(record);
        }

        log::info!("Loaded {} WoRMS match records", records.len());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl LineageMatcher for WormsRecordTable {
    fn match_names(&self, names: &[String]) -> Result<Vec<Option<MatchRecord>>, LcaError> {
        Ok(names.iter().map(|n| self.records.get(n).cloned()).collect())
    }
}
