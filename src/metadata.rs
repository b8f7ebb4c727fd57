use std::collections::BTreeMap;

use crate::cpl::CslStringList;
use crate::errors::Result;

/// `KEY=VALUE` metadata items grouped by domain.
///
/// The default domain is the empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    domains: BTreeMap<String, CslStringList>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_item(&mut self, key: &str, value: &str, domain: &str) -> Result<()> {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .set_name_value(key, value)
    }

    pub fn item(&self, key: &str, domain: &str) -> Option<&str> {
        self.domains.get(domain)?.fetch_name_value(key)
    }

    pub fn domain(&self, domain: &str) -> Option<&CslStringList> {
        self.domains.get(domain).filter(|list| !list.is_empty())
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(name, _)| name.as_str())
    }
}

/// General-Purpose Metadata API
///
/// Datasets and raster bands carry a description and `KEY=VALUE` metadata
/// grouped into domains. Implementors expose their [`MetadataStore`]; the
/// accessors are provided.
///
/// # Example
///
/// ```rust, no_run
/// use miramon_raster::{Dataset, Metadata};
/// # fn main() -> miramon_raster::errors::Result<()> {
/// let dataset = Dataset::open("fixtures/landsat_subdatasetsI.rel")?;
/// for (key, value) in dataset.metadata_domain("SUBDATASETS").unwrap_or_default() {
///     println!("{key} = {value}");
/// }
/// # Ok(())
/// # }
/// ```
pub trait Metadata {
    fn metadata_store(&self) -> &MetadataStore;

    /// For Datasets this is the name the dataset was opened with, for
    /// raster bands the band name.
    fn description(&self) -> String;

    /// Names of the non-empty metadata domains, `""` being the default one.
    fn metadata_domains(&self) -> Vec<String> {
        self.metadata_store().domains().map(str::to_string).collect()
    }

    /// All the `(key, value)` items of `domain`.
    fn metadata_domain(&self, domain: &str) -> Option<Vec<(String, String)>> {
        self.metadata_store().domain(domain).map(|list| {
            list.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
    }

    /// Value of `key` in `domain`.
    fn metadata_item(&self, key: &str, domain: &str) -> Option<String> {
        self.metadata_store().item(key, domain).map(str::to_string)
    }

    /// Iterate over every item of every domain.
    fn metadata(&self) -> MetadataIter<'_> {
        let entries = self
            .metadata_store()
            .domains
            .iter()
            .flat_map(|(domain, list)| {
                list.iter().map(move |(key, value)| MetadataEntry {
                    domain: domain.clone(),
                    key: key.to_string(),
                    value: value.to_string(),
                })
            })
            .collect::<Vec<_>>();
        MetadataIter {
            entries: entries.into_iter(),
            _store: std::marker::PhantomData,
        }
    }
}

/// Standalone metadata entry, as returned by iterator from [`Metadata::metadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub domain: String,
    pub key: String,
    pub value: String,
}

/// Iterator over metadata entries
pub struct MetadataIter<'a> {
    entries: std::vec::IntoIter<MetadataEntry>,
    _store: std::marker::PhantomData<&'a MetadataStore>,
}

impl Iterator for MetadataIter<'_> {
    type Item = MetadataEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}
