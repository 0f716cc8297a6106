//src/taxdb.rs

use ahash::AHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::LcaError;

pub type NameMap = AHashMap<String, String>;

/// Resolves taxon identifiers to scientific names.
///
/// Called once per run with every distinct identifier. The result is
/// positional: entry `i` answers `taxids[i]`, `None` when unknown.
pub trait NameResolver {
    fn resolve_names(&self, taxids: &[String]) -> Result<Vec<Option<String>>, LcaError>;
}

/// File-backed identifier -> name table.
#[derive(Debug, Clone, Default)]
pub struct TaxonNameTable {
    names: NameMap,
}

impl TaxonNameTable {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Parses either of:
    /// ```text
    /// <taxid>\t<name>                      (taxonkit name)
    /// <taxid>\t<parentid>\t<taxname>\t<rank>  (taxDB)
    /// ```
    /// Lines with any other number of fields are skipped.
    pub fn from_file<P: AsRef<Path>>(filepath: P) -> Result<Self, LcaError> {
        let file = File::open(filepath)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, LcaError> {
        let mut names = NameMap::new();

        for line_result in reader.lines() {
            let line = line_result?;
            let parts: Vec<&str> = line.split('\t').collect();

            let (taxid, name) = match parts.len() {
                2 => (parts[0].trim(), parts[1].trim()),
                n if n >= 4 => (parts[0].trim(), parts[2].trim()),
                _ => continue,
            };
            if taxid.is_empty() || name.is_empty() {
                continue;
            }
            names.insert(taxid.to_string(), name.to_string());
        }

        log::info!("Loaded {} taxon names", names.len());
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl NameResolver for TaxonNameTable {
    fn resolve_names(&self, taxids: &[String]) -> Result<Vec<Option<String>>, LcaError> {
        Ok(taxids.iter().map(|t| self.names.get(t).cloned()).collect())
    }
}

/// Submits `taxids` in one batch and zips the answers back by position.
/// A count mismatch or an identifier without a name aborts the run.
pub fn resolve_taxids<N: NameResolver + ?Sized>(
    resolver: &N,
    taxids: &[String],
) -> Result<NameMap, LcaError> {
    let names = resolver.resolve_names(taxids)?;
    if names.len() != taxids.len() {
        return Err(LcaError::ResultCountMismatch {
            service: "taxon name resolver",
            expected: taxids.len(),
            got: names.len(),
        });
    }

    let mut resolved = NameMap::with_capacity(taxids.len());
    for (taxid, name) in taxids.iter().zip(names) {
        match name {
            Some(name) => {
                resolved.insert(taxid.clone(), name);
            }
            None => return Err(LcaError::UnresolvedTaxid(taxid.clone())),
        }
    }
    log::info!("Resolved {} distinct taxon identifiers", resolved.len());
    Ok(resolved)
}
