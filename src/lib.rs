// src/lib.rs
pub mod types;
pub mod error;
pub mod config;
pub mod blast;
pub mod taxdb;
pub mod worms;
pub mod lineage;
pub mod grouper;
pub mod lca;
pub mod report;

use std::io::BufRead;
use std::path::Path;

use crate::blast::{distinct_taxids, open_blast_table, read_blast_hits};
use crate::config::LcaConfig;
use crate::error::LcaError;
use crate::grouper::{group_hits, MissingTally, DEFAULT_STRATEGIES};
use crate::lca::calculate_query_lcas;
use crate::lineage::{build_lineage_table, LineageTable};
use crate::report::{build_report_rows, render_lca_report, render_missing_report};
use crate::taxdb::{resolve_taxids, NameResolver};
use crate::types::{LcaReportRow, QueryLca};
use crate::worms::LineageMatcher;

/// Everything one LCA run produces. Text outputs are rendered on demand.
#[derive(Debug)]
pub struct LcaResults {
    /// Per-query rank results, in first-seen query order
    pub query_lcas: Vec<QueryLca>,

    /// Structured version of the LCA report (one row per query)
    pub report_rows: Vec<LcaReportRow>,

    /// Names that failed to resolve at species / genus level
    pub missing: MissingTally,

    /// The lookup table the hits were joined against
    pub lineage_table: LineageTable,

    pub hits_read: usize,
    pub hits_below_floor: usize,
    pub hits_dropped: usize,
}

impl LcaResults {
    /// Generate the per-query LCA report text
    pub fn get_lca_report(&self) -> String {
        render_lca_report(&self.report_rows)
    }

    /// Generate the missing-name tally text
    pub fn get_missing_report(&self) -> String {
        render_missing_report(&self.missing.rows())
    }
}

/// Runs the full LCA pipeline on a BLAST-tabular file (plain or `.gz`).
pub fn calculate_lca<P, N, M>(
    blast_path: P,
    config: &LcaConfig,
    resolver: &N,
    matcher: &M,
) -> Result<LcaResults, LcaError>
where
    P: AsRef<Path>,
    N: NameResolver + ?Sized,
    M: LineageMatcher + ?Sized,
{
    // reject a bad config before opening the input
    config.validate()?;
    let reader = open_blast_table(blast_path)?;
    run_pipeline(reader, config, resolver, matcher)
}

/// Same as [`calculate_lca`], reading BLAST rows from any buffered reader.
pub fn calculate_lca_from_reader<R, N, M>(
    reader: R,
    config: &LcaConfig,
    resolver: &N,
    matcher: &M,
) -> Result<LcaResults, LcaError>
where
    R: BufRead,
    N: NameResolver + ?Sized,
    M: LineageMatcher + ?Sized,
{
    config.validate()?;
    run_pipeline(reader, config, resolver, matcher)
}

/// Pipeline body; `config` has already been validated.
fn run_pipeline<R, N, M>(
    reader: R,
    config: &LcaConfig,
    resolver: &N,
    matcher: &M,
) -> Result<LcaResults, LcaError>
where
    R: BufRead,
    N: NameResolver + ?Sized,
    M: LineageMatcher + ?Sized,
{
    // 1. Read hits above the identity floor
    let hits = read_blast_hits(reader, config.min_pident)?;

    // 2. One batched call: taxid -> scientific name
    let taxids = distinct_taxids(&hits.records);
    let taxid_names = resolve_taxids(resolver, &taxids)?;

    // 3. One batched call: name -> lineage
    let mut seen = ahash::AHashSet::new();
    let names: Vec<String> = taxids
        .iter()
        .filter_map(|t| taxid_names.get(t))
        .filter(|n| seen.insert(n.as_str()))
        .cloned()
        .collect();
    let lineage_table = build_lineage_table(matcher, &names, config.order_key)?;

    // 4. Group per query, then aggregate per rank
    let grouped = group_hits(&hits.records, &taxid_names, &lineage_table, &DEFAULT_STRATEGIES);
    let query_lcas = calculate_query_lcas(&grouped.queries, config.cutoff);
    let report_rows = build_report_rows(&query_lcas);

    Ok(LcaResults {
        query_lcas,
        report_rows,
        missing: grouped.missing,
        lineage_table,
        hits_read: hits.records.len(),
        hits_below_floor: hits.below_floor,
        hits_dropped: grouped.dropped_hits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrderKeyPolicy;
    use crate::taxdb::TaxonNameTable;
    use crate::types::Rank;
    use crate::worms::{MatchRecord, WormsRecordTable};
    use std::io::Cursor;

    fn species(valid: &str, order: &str, family: &str, genus: &str) -> MatchRecord {
        MatchRecord {
            valid_name: Some(valid.to_string()),
            rank: Some("Species".to_string()),
            class: Some("Teleostei".to_string()),
            order: Some(order.to_string()),
            family: Some(family.to_string()),
            genus: Some(genus.to_string()),
        }
    }

    fn services() -> (TaxonNameTable, WormsRecordTable) {
        let names = TaxonNameTable::from_pairs([
            ("8049", "Gadus morhua"),
            ("1042646", "Gadus chalcogrammus"),
            ("8053", "Gadus macrocephalus"),
            ("999001", "Nonexistus fakeus"),
            ("999002", "Thunnus sp. XYZ"),
        ]);
        let worms = WormsRecordTable::from_records([
            ("Gadus morhua", species("Gadus morhua", "Gadiformes", "Gadidae", "Gadus")),
            ("Gadus chalcogrammus", species("Gadus chalcogrammus", "Gadiformes", "Gadidae", "Gadus")),
            ("Gadus macrocephalus", species("Gadus macrocephalus", "Gadiformes", "Gadidae", "Gadus")),
            (
                "Thunnus sp. XYZ",
                MatchRecord {
                    valid_name: Some("Thunnus".to_string()),
                    rank: Some("Genus".to_string()),
                    class: Some("Teleostei".to_string()),
                    order: Some("Scombriformes".to_string()),
                    family: Some("Scombridae".to_string()),
                    genus: Some("Thunnus".to_string()),
                },
            ),
        ]);
        (names, worms)
    }

    fn row(q: &str, taxid: &str, pident: f64) -> String {
        format!("{q}\tref|{taxid}\t{taxid}\tname\tcommon\tEukaryota\t{pident}\t180\t180\t180\n")
    }

    #[test]
    fn end_to_end_report() {
        let input = [
            row("ASV1", "8049", 98.5),
            row("ASV1", "8049", 98.2),
            row("ASV1", "1042646", 97.0),
            row("ASV2", "8049", 99.0),
            row("ASV2", "8053", 98.9),
            row("ASV3", "999001", 99.5),
            row("ASV4", "999002", 96.0),
        ]
        .concat();
        let (names, worms) = services();
        let results =
            calculate_lca_from_reader(Cursor::new(input), &LcaConfig::default(), &names, &worms).unwrap();

        assert_eq!(results.hits_read, 7);
        assert_eq!(results.hits_dropped, 1);

        // ASV3 lost its only hit and gets no row
        let ids: Vec<&str> = results.report_rows.iter().map(|r| r.query_id.as_str()).collect();
        assert_eq!(ids, vec!["ASV1", "ASV2", "ASV4"]);

        let report = results.get_lca_report();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[1],
            "ASV1\tTeleostei\tGadiformes\tGadidae\tGadus\tGadus morhua\t98.35\tGadus morhua"
        );
        assert_eq!(
            lines[2],
            "ASV2\tTeleostei\tGadiformes\tGadidae\tGadus\tdropped\t98.95\tGadus macrocephalus, Gadus morhua"
        );
        // genus fallback: species slot is empty
        assert_eq!(lines[3], "ASV4\tTeleostei\tScombriformes\tScombridae\tThunnus\t\t96.00\t");

        assert_eq!(results.missing.count("Nonexistus fakeus", Rank::Species), 1);
        assert_eq!(results.missing.count("Nonexistus", Rank::Genus), 1);
        assert_eq!(results.missing.count("Thunnus sp. XYZ", Rank::Species), 1);
        assert_eq!(
            results.get_missing_report(),
            "Nonexistus fakeus\tspecies\t1\nNonexistus\tgenus\t1\nThunnus sp. XYZ\tspecies\t1\n"
        );
    }

    #[test]
    fn floor_removes_hits_before_grouping() {
        let input = [row("ASV1", "8049", 94.9), row("ASV1", "8053", 95.0)].concat();
        let (names, worms) = services();
        let config = LcaConfig { min_pident: 95.0, ..LcaConfig::default() };
        let results = calculate_lca_from_reader(Cursor::new(input), &config, &names, &worms).unwrap();
        assert_eq!(results.hits_below_floor, 1);
        assert_eq!(results.query_lcas.len(), 1);
        assert_eq!(
            results.query_lcas[0].rank(Rank::Species).display_name(),
            "Gadus macrocephalus"
        );
    }

    #[test]
    fn invalid_floor_aborts_before_reading() {
        let (names, worms) = services();
        let config = LcaConfig { min_pident: 101.0, ..LcaConfig::default() };
        let err = calculate_lca_from_reader(Cursor::new("garbage"), &config, &names, &worms).unwrap_err();
        assert!(matches!(err, LcaError::InvalidPidentFloor(_)));
    }

    #[test]
    fn invalid_config_is_rejected_before_opening_the_file() {
        let (names, worms) = services();
        let config = LcaConfig { cutoff: -1.0, ..LcaConfig::default() };
        let err = calculate_lca("does/not/exist.tsv", &config, &names, &worms).unwrap_err();
        assert!(matches!(err, LcaError::InvalidCutoff(_)));
    }

    #[test]
    fn reads_gzipped_blast_table_from_path() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hits.tsv.gz");
        let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        encoder
            .write_all([row("ASV1", "8049", 99.0), row("ASV1", "8053", 97.0)].concat().as_bytes())
            .unwrap();
        encoder.finish().unwrap();

        let (names, worms) = services();
        let results = calculate_lca(&path, &LcaConfig::default(), &names, &worms).unwrap();
        assert_eq!(results.hits_read, 2);
        assert_eq!(
            results.get_lca_report().lines().nth(1),
            Some("ASV1\tTeleostei\tGadiformes\tGadidae\tGadus\tGadus morhua\t99.00\tGadus morhua")
        );
    }

    #[test]
    fn reads_plain_blast_table_with_file_backed_services() {
        let dir = tempfile::tempdir().unwrap();
        let blast = dir.path().join("hits.tsv");
        let names_path = dir.path().join("names.tsv");
        let worms_path = dir.path().join("worms.tsv");
        std::fs::write(&blast, [row("ASV9", "8049", 99.0), row("ASV9", "8053", 98.6)].concat()).unwrap();
        std::fs::write(&names_path, "8049\tGadus morhua\n8053\tGadus macrocephalus\n").unwrap();
        std::fs::write(
            &worms_path,
            "name\tvalid_name\trank\tclass\torder\tfamily\tgenus\n\
             Gadus morhua\tGadus morhua\tSpecies\tTeleostei\tGadiformes\tGadidae\tGadus\n\
             Gadus macrocephalus\tGadus macrocephalus\tSpecies\tTeleostei\tGadiformes\tGadidae\tGadus\n",
        )
        .unwrap();

        let names = TaxonNameTable::from_file(&names_path).unwrap();
        let worms = WormsRecordTable::from_file(&worms_path).unwrap();
        let results = calculate_lca(&blast, &LcaConfig::default(), &names, &worms).unwrap();
        assert_eq!(results.lineage_table.len(), 2);
        assert_eq!(results.report_rows.len(), 1);
        assert_eq!(results.report_rows[0].species, "dropped");
        assert_eq!(results.report_rows[0].genus, "Gadus");
        assert_eq!(
            results.report_rows[0].species_in_lca,
            vec!["Gadus macrocephalus".to_string(), "Gadus morhua".to_string()]
        );
    }

    #[test]
    fn na_taxid_aborts_the_run() {
        let input = [row("ASV1", "8049", 99.0), row("ASV1", "NA", 99.0)].concat();
        let (names, worms) = services();
        let err = calculate_lca_from_reader(Cursor::new(input), &LcaConfig::default(), &names, &worms)
            .unwrap_err();
        assert!(matches!(err, LcaError::MissingTaxid { line: 2, .. }));
    }

    #[test]
    fn wider_cutoff_drops_more_ranks() {
        let input = [row("ASV1", "8049", 99.0), row("ASV1", "999002", 97.5)].concat();
        let (names, worms) = services();
        let narrow = calculate_lca_from_reader(Cursor::new(input.clone()), &LcaConfig::default(), &names, &worms)
            .unwrap();
        assert_eq!(narrow.report_rows[0].family, "Gadidae");

        let config = LcaConfig { cutoff: 2.0, order_key: OrderKeyPolicy::ByOrder, ..LcaConfig::default() };
        let wide = calculate_lca_from_reader(Cursor::new(input), &config, &names, &worms).unwrap();
        assert_eq!(wide.report_rows[0].family, "dropped");
        assert_eq!(wide.report_rows[0].class, "Teleostei");
    }
}
