//src/lca.rs

use rayon::prelude::*;
use std::collections::BTreeSet;

use crate::types::{QueryHitSet, QueryLca, Rank, RankResult};

/// Windowed consensus over one rank's (percent identity, name) pairs.
///
///   - sort by (pident, name) and take the best pident as `top`,
///   - keep every pair with `pident >= top - cutoff`,
///   - average the kept pidents (one per hit, not per name),
///   - a single distinct kept name is the consensus, otherwise the rank is dropped.
///
/// Returns `None` for an empty input or a negative (or non-finite) cutoff.
pub fn rank_lca(pairs: &[(f64, &str)], cutoff: f64) -> Option<RankResult> {
    if !cutoff.is_finite() || cutoff < 0.0 {
        return None;
    }

    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    let top = sorted.last()?.0;
    let window_floor = top - cutoff;

    let mut included = BTreeSet::new();
    let mut sum = 0.0;
    let mut n = 0usize;
    for &(pident, name) in sorted.iter().rev() {
        if pident < window_floor {
            break;
        }
        included.insert(name.to_string());
        sum += pident;
        n += 1;
    }

    let consensus = if included.len() == 1 {
        included.iter().next().cloned()
    } else {
        None
    };

    Some(RankResult {
        consensus,
        mean_identity: sum / n as f64,
        included,
    })
}

/// Runs `rank_lca` independently for class, order, family, genus and species.
/// `None` if the query has no hits or `cutoff` is negative.
pub fn query_lca(hit_set: &QueryHitSet, cutoff: f64) -> Option<QueryLca> {
    let mut results = Vec::with_capacity(Rank::ALL.len());
    for rank in Rank::ALL {
        let pairs: Vec<(f64, &str)> = hit_set
            .hits
            .iter()
            .map(|h| (h.pident, h.lineage.name(rank)))
            .collect();
        results.push(rank_lca(&pairs, cutoff)?);
    }

    let ranks: [RankResult; 5] = results.try_into().ok()?;
    Some(QueryLca {
        query_id: hit_set.query_id.clone(),
        ranks,
    })
}

/// LCA for every query in parallel; output keeps the input order and
/// skips queries without hits.
pub fn calculate_query_lcas(hit_sets: &[QueryHitSet], cutoff: f64) -> Vec<QueryLca> {
    let results: Vec<QueryLca> = hit_sets
        .par_iter()
        .filter_map(|set| query_lca(set, cutoff))
        .collect();

    log::info!(
        "Calculated LCAs for {} queries ({} species-level calls)",
        results.len(),
        results.iter().filter(|q| !q.rank(Rank::Species).is_dropped()).count()
    );
    results
}
