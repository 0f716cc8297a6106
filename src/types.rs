//src/types.rs

use std::collections::BTreeSet;
use std::fmt;

/// Marker written in place of a name when a rank has no single consensus.
pub const DROPPED: &str = "dropped";

/// One BLAST-tabular alignment row, reduced to the fields the LCA needs.
/// For example (outfmt 6 with `qseqid sseqid staxids ... pident ...`):
///  ASV1  gi|123  218512  Pristipomoides auricilla  ...  98.5  ...
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord {
    pub query_id: String,  // field 0
    pub taxid: String,     // field 2, never "NA"
    pub pident: f64,       // field 6, 0..=100
}

/// Taxonomic ranks covered by a lineage, coarse to fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    pub const ALL: [Rank; 5] = [Rank::Class, Rank::Order, Rank::Family, Rank::Genus, Rank::Species];

    /// Position of this rank inside a `Lineage`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower-case label, as used in the missing-name tally.
    pub fn label(self) -> &'static str {
        match self {
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
        }
    }

    /// One-letter code ("C", "O", "F", "G", "S").
    pub fn code(self) -> char {
        match self {
            Rank::Class => 'C',
            Rank::Order => 'O',
            Rank::Family => 'F',
            Rank::Genus => 'G',
            Rank::Species => 'S',
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Class -> species chain for one taxon. Always five slots; a rank
/// without data holds an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    names: [String; 5],
}

impl Lineage {
    pub fn new(class: &str, order: &str, family: &str, genus: &str, species: &str) -> Self {
        Self {
            names: [
                class.to_string(),
                order.to_string(),
                family.to_string(),
                genus.to_string(),
                species.to_string(),
            ],
        }
    }

    pub fn name(&self, rank: Rank) -> &str {
        &self.names[rank.index()]
    }

    /// (rank, name) pairs in fixed class -> species order.
    pub fn iter(&self) -> impl Iterator<Item = (Rank, &str)> + '_ {
        Rank::ALL.iter().map(move |&r| (r, self.name(r)))
    }
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (rank, name) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}:{}", rank.code(), name)?;
            first = false;
        }
        Ok(())
    }
}

/// A hit joined against the lineage table.
#[derive(Debug, Clone, PartialEq)]
pub struct PerHitEntry {
    pub pident: f64,
    pub lineage: Lineage,
}

/// All resolvable hits of one query, in the order they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHitSet {
    pub query_id: String,
    pub hits: Vec<PerHitEntry>,
}

/// Outcome of the LCA window at one rank of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankResult {
    /// `None` when more than one distinct name survived the window.
    pub consensus: Option<String>,
    /// Mean percent identity over every included hit.
    pub mean_identity: f64,
    /// Distinct names inside the window, sorted.
    pub included: BTreeSet<String>,
}

impl RankResult {
    /// The consensus name, or `"dropped"`.
    pub fn display_name(&self) -> &str {
        self.consensus.as_deref().unwrap_or(DROPPED)
    }

    pub fn is_dropped(&self) -> bool {
        self.consensus.is_none()
    }
}

/// Per-rank LCA results for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLca {
    pub query_id: String,
    pub ranks: [RankResult; 5],
}

impl QueryLca {
    pub fn rank(&self, rank: Rank) -> &RankResult {
        &self.ranks[rank.index()]
    }

    /// Included species names, as listed in the `Species_In_LCA` column.
    pub fn species_in_lca(&self) -> &BTreeSet<String> {
        &self.rank(Rank::Species).included
    }
}

/// A structured representation of one row of the LCA report.
///  ASV_name  Class  Order  Family  Genus  Species  PercentageID  Species_In_LCA
#[derive(Debug, Clone, PartialEq)]
pub struct LcaReportRow {
    pub query_id: String,
    pub class: String,
    pub order: String,
    pub family: String,
    pub genus: String,
    pub species: String,
    pub pident: f64,             // species-level mean
    pub species_in_lca: Vec<String>,
}

/// One row of the missing-name tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRow {
    pub name: String,
    pub rank: Rank,
    pub count: u32,
}
