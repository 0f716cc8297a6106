//src/grouper.rs

use ahash::AHashMap;

use crate::lineage::LineageTable;
use crate::taxdb::NameMap;
use crate::types::{HitRecord, Lineage, MissingRow, PerHitEntry, QueryHitSet, Rank};

/// One way of turning a resolved name into a lineage-table key.
/// Strategies are tried in order; each miss is tallied at its rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// The name itself.
    ExactName,
    /// The first whitespace-delimited token, taken as a genus.
    GenusToken,
}

/// Species first, then the genus guess.
pub const DEFAULT_STRATEGIES: [ResolutionStrategy; 2] =
    [ResolutionStrategy::ExactName, ResolutionStrategy::GenusToken];

impl ResolutionStrategy {
    /// Rank label under which a miss is recorded.
    pub fn rank(self) -> Rank {
        match self {
            ResolutionStrategy::ExactName => Rank::Species,
            ResolutionStrategy::GenusToken => Rank::Genus,
        }
    }

    pub fn key(self, name: &str) -> &str {
        match self {
            ResolutionStrategy::ExactName => name,
            ResolutionStrategy::GenusToken => name.split_whitespace().next().unwrap_or(""),
        }
    }
}

/// Counts of names that failed to resolve, by (name, rank), in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct MissingTally {
    counts: AHashMap<(String, Rank), u32>,
    order: Vec<(String, Rank)>,
}

impl MissingTally {
    pub fn record(&mut self, name: &str, rank: Rank) {
        let key = (name.to_string(), rank);
        match self.counts.get_mut(&key) {
            Some(count) => *count += 1,
            None => {
                log::debug!("missing {} '{}'", rank, name);
                self.counts.insert(key.clone(), 1);
                self.order.push(key);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn count(&self, name: &str, rank: Rank) -> u32 {
        self.counts
            .get(&(name.to_string(), rank))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn rows(&self) -> Vec<MissingRow> {
        self.order
            .iter()
            .map(|key| MissingRow {
                name: key.0.clone(),
                rank: key.1,
                count: self.counts[key],
            })
            .collect()
    }
}

/// Tries each strategy in turn. Every miss before the first hit is
/// tallied; `None` means all strategies missed.
pub fn resolve_lineage<'t>(
    name: &str,
    table: &'t LineageTable,
    strategies: &[ResolutionStrategy],
    missing: &mut MissingTally,
) -> Option<&'t Lineage> {
    for strategy in strategies {
        let key = strategy.key(name);
        if let Some(lineage) = table.get(key) {
            return Some(lineage);
        }
        missing.record(key, strategy.rank());
    }
    None
}

/// Per-query hit sets (first-seen order) and the hits that were dropped.
#[derive(Debug, Clone, Default)]
pub struct GroupedHits {
    pub queries: Vec<QueryHitSet>,
    pub missing: MissingTally,
    pub dropped_hits: usize,
}

/// Joins every hit against the lineage table and groups the survivors by
/// query id. A query set is created on its first resolvable hit only.
pub fn group_hits(
    records: &[HitRecord],
    taxid_names: &NameMap,
    table: &LineageTable,
    strategies: &[ResolutionStrategy],
) -> GroupedHits {
    let mut grouped = GroupedHits::default();
    let mut query_index: AHashMap<String, usize> = AHashMap::new();

    for hit in records {
        // every taxid was resolved up front; an absent one counts as an unknown name
        let name = taxid_names.get(&hit.taxid).map(String::as_str).unwrap_or("");

        let Some(lineage) = resolve_lineage(name, table, strategies, &mut grouped.missing) else {
            grouped.dropped_hits += 1;
            continue;
        };

        let entry = PerHitEntry {
            pident: hit.pident,
            lineage: lineage.clone(),
        };
        match query_index.get(&hit.query_id) {
            Some(&idx) => grouped.queries[idx].hits.push(entry),
            None => {
                query_index.insert(hit.query_id.clone(), grouped.queries.len());
                grouped.queries.push(QueryHitSet {
                    query_id: hit.query_id.clone(),
                    hits: vec![entry],
                });
            }
        }
    }

    log::info!(
        "Grouped hits into {} queries; {} hits dropped, {} distinct missing names",
        grouped.queries.len(),
        grouped.dropped_hits,
        grouped.missing.len()
    );
    grouped
}
