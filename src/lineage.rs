//src/lineage.rs

use ahash::AHashMap;
use std::collections::hash_map::Entry;

use crate::config::OrderKeyPolicy;
use crate::error::LcaError;
use crate::types::{Lineage, Rank};
use crate::worms::{LineageMatcher, MatchRecord};

/// Resolved name -> lineage. Built once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct LineageTable {
    entries: AHashMap<String, (Rank, Lineage)>,
}

impl LineageTable {
    pub fn get(&self, name: &str) -> Option<&Lineage> {
        self.entries.get(name).map(|(_, lineage)| lineage)
    }

    /// Rank at which the entry for `name` was indexed.
    #[cfg(test)]
    fn key_rank(&self, name: &str) -> Option<Rank> {
        self.entries.get(name).map(|(rank, _)| *rank)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes `lineage` under `key` unless an entry indexed at the same or
    /// a finer rank is already there.
    fn insert(&mut self, key: String, rank: Rank, lineage: Lineage) {
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                log::debug!("lineage table: {} -> {} ({})", slot.key(), lineage, rank);
                slot.insert((rank, lineage));
            }
            Entry::Occupied(mut slot) => {
                if rank > slot.get().0 {
                    log::debug!(
                        "lineage table: {} re-indexed at {} (was {})",
                        slot.key(),
                        rank,
                        slot.get().0
                    );
                    slot.insert((rank, lineage));
                } else {
                    log::warn!(
                        "lineage table: keeping first {}-level entry for '{}'",
                        slot.get().0,
                        slot.key()
                    );
                }
            }
        }
    }

    /// Indexes one match record for the submitted `name`, picking the key
    /// from the finest rank the record supplies.
    pub fn index_match(&mut self, name: &str, record: &MatchRecord, order_key: OrderKeyPolicy) {
        let class = record.class_name().unwrap_or("");
        let order = record.order_name().unwrap_or("");
        let family = record.family_name().unwrap_or("");
        let genus = record.genus_name().unwrap_or("");

        if let Some(species) = record.species_name() {
            self.insert(
                name.to_string(),
                Rank::Species,
                Lineage::new(class, order, family, genus, species),
            );
        } else if !genus.is_empty() {
            self.insert(
                genus.to_string(),
                Rank::Genus,
                Lineage::new(class, order, family, genus, ""),
            );
        } else if !family.is_empty() {
            self.insert(
                family.to_string(),
                Rank::Family,
                Lineage::new(class, order, family, "", ""),
            );
        } else if !order.is_empty() {
            let key = match order_key {
                OrderKeyPolicy::ByOrder => order,
                OrderKeyPolicy::LegacyFamilyKey => family,
            };
            self.insert(key.to_string(), Rank::Order, Lineage::new(class, order, "", "", ""));
        } else {
            log::debug!("lineage table: match for '{}' carries no usable rank", name);
        }
    }
}

/// Submits every distinct name to `matcher` in one batch and indexes the
/// returned records by position. Unmatched names are skipped.
pub fn build_lineage_table<M: LineageMatcher + ?Sized>(
    matcher: &M,
    names: &[String],
    order_key: OrderKeyPolicy,
) -> Result<LineageTable, LcaError> {
    let results = matcher.match_names(names)?;
    if results.len() != names.len() {
        return Err(LcaError::ResultCountMismatch {
            service: "lineage matcher",
            expected: names.len(),
            got: results.len(),
        });
    }

    let mut table = LineageTable::default();
    let mut unmatched = 0usize;
    for (name, record) in names.iter().zip(results) {
        match record {
            Some(record) => table.index_match(name, &record, order_key),
            None => unmatched += 1,
        }
    }

    log::info!(
        "Built lineage table with {} entries from {} names ({} without a match)",
        table.len(),
        names.len(),
        unmatched
    );
    Ok(table)
}
