use crate::error::CatalogError;
use serde::Deserialize;
use std::{collections::HashMap, fs::File, io::BufReader, path::Path};
use tracing::info;

/// Raw brand name to canonical brand name. Built once and handed to whoever needs it.
///
/// A `None` translation means the raw name is known but has no canonical form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrandTable {
    brands: HashMap<String, Option<String>>,
}

// either `{"brands": {...}}` or the mapping itself
#[derive(Deserialize)]
#[serde(untagged)]
enum BrandFile {
    Nested { brands: HashMap<String, Option<String>> },
    Flat(HashMap<String, Option<String>>),
}

impl BrandTable {
    pub fn new(brands: HashMap<String, Option<String>>) -> Self {
        Self { brands }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: BrandFile = serde_json::from_str(json)?;
        Ok(Self::from_file(file))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let file: BrandFile = serde_json::from_reader(reader)?;
        let table = Self::from_file(file);

        info!("Loaded {} brand translations from {}", table.len(), path.as_ref().display());
        Ok(table)
    }

    fn from_file(file: BrandFile) -> Self {
        match file {
            BrandFile::Nested { brands } => Self::new(brands),
            BrandFile::Flat(brands) => Self::new(brands),
        }
    }

    /// Translate a brand name: exact match first, then case-insensitive, otherwise the input itself.
    pub fn translate<'a>(&'a self, name: &'a str) -> &'a str {
        if name.is_empty() {
            return name;
        }

        if let Some(translated) = self.brands.get(name) {
            return translated.as_deref().unwrap_or(name);
        }

        // iteration order of the map is unspecified, so pick the smallest matching key for a stable answer
        let lowered = name.to_lowercase();
        self.brands
            .iter()
            .filter(|(key, _)| key.to_lowercase() == lowered)
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .and_then(|(_, translated)| translated.as_deref())
            .unwrap_or(name)
    }

    /// The `company_*` tag for a raw brand name.
    pub fn company_tag(&self, name: &str) -> String {
        format!("company_{}", slug(self.translate(name.trim())))
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }
}

fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BrandTable {
        BrandTable::from_json_str(r#"{"brands": {"N1ke": "Nike", "ADlDAS": "Adidas", "Unknown": null}}"#).unwrap()
    }

    #[test]
    fn exact_match_translates() {
        assert_eq!(table().translate("N1ke"), "Nike");
    }

    #[test]
    fn case_insensitive_match_translates() {
        assert_eq!(table().translate("adldas"), "Adidas");
    }

    #[test]
    fn unknown_or_untranslated_names_pass_through() {
        let table = table();

        assert_eq!(table.translate("Puma"), "Puma");
        assert_eq!(table.translate("Unknown"), "Unknown");
        assert_eq!(table.translate(""), "");
    }

    #[test]
    fn flat_files_are_accepted() {
        let table = BrandTable::from_json_str(r#"{"St0ne Island": "Stone Island"}"#).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.company_tag("st0ne island"), "company_stone-island");
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translate.json");
        std::fs::write(&path, r#"{"brands": {"N1ke": "Nike"}}"#).unwrap();

        let table = BrandTable::load(&path).unwrap();
        assert_eq!(table.company_tag("N1ke"), "company_nike");
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(matches!(
            BrandTable::from_json_str("[1, 2, 3]"),
            Err(CatalogError::Json(_))
        ));
    }
}
