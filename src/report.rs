//src/report.rs

use std::fmt::Write as FmtWrite;

use crate::types::{LcaReportRow, MissingRow, QueryLca, Rank};

/// Header of the per-query LCA report.
pub const LCA_REPORT_HEADER: &str =
    "ASV_name\tClass\tOrder\tFamily\tGenus\tSpecies\tPercentageID\tSpecies_In_LCA\n";

/// Flattens one query's rank results into a report row.
pub fn build_report_row(lca: &QueryLca) -> LcaReportRow {
    let name = |rank: Rank| lca.rank(rank).display_name().to_string();
    LcaReportRow {
        query_id: lca.query_id.clone(),
        class: name(Rank::Class),
        order: name(Rank::Order),
        family: name(Rank::Family),
        genus: name(Rank::Genus),
        species: name(Rank::Species),
        pident: lca.rank(Rank::Species).mean_identity,
        species_in_lca: lca.species_in_lca().iter().cloned().collect(),
    }
}

pub fn build_report_rows(lcas: &[QueryLca]) -> Vec<LcaReportRow> {
    lcas.iter().map(build_report_row).collect()
}

/// Tab-separated report with header, one line per row.
pub fn render_lca_report(rows: &[LcaReportRow]) -> String {
    let mut output = String::with_capacity(LCA_REPORT_HEADER.len() + rows.len() * 96);
    output.push_str(LCA_REPORT_HEADER);
    for row in rows {
        // writing into a String cannot fail
        let _ = writeln!(
            output,
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.2}\t{}",
            row.query_id,
            row.class,
            row.order,
            row.family,
            row.genus,
            row.species,
            row.pident,
            row.species_in_lca.join(", ")
        );
    }
    output
}

/// `name<TAB>rank<TAB>count`, no header.
pub fn render_missing_report(rows: &[MissingRow]) -> String {
    let mut output = String::new();
    for row in rows {
        let _ = writeln!(output, "{}\t{}\t{}", row.name, row.rank.label(), row.count);
    }
    output
}
