use anyhow::Result;
use async_trait::async_trait;

use crate::models::ProgramMatch;

/// Optional row filters, combined with AND. `None` means unrestricted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramFilter {
    /// Exact match on province
    pub province: Option<String>,
    /// Case-insensitive substring of the discipline name
    pub discipline: Option<String>,
}

impl ProgramFilter {
    pub fn matches(&self, province: &str, discipline_name: &str) -> bool {
        let province_ok = self.province.as_deref().map_or(true, |p| p == province);
        let discipline_ok = self.discipline.as_deref().map_or(true, |d| {
            discipline_name.to_lowercase().contains(&d.to_lowercase())
        });
        province_ok && discipline_ok
    }
}

/// Filtered nearest-neighbour search over program embeddings.
///
/// Results come back ordered by similarity descending and hold at most
/// `top_k` rows.
#[async_trait]
pub trait ProgramStore: Send + Sync {
    async fn nearest(
        &self,
        query_embedding: &[f32],
        filter: &ProgramFilter,
        top_k: usize,
    ) -> Result<Vec<ProgramMatch>>;

    /// Short label for logs and the health endpoint.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ProgramFilter::default();
        assert!(filter.matches("ON", "Anesthesiology"));
        assert!(filter.matches("", ""));
    }

    #[test]
    fn test_province_is_exact() {
        let filter = ProgramFilter {
            province: Some("ON".to_string()),
            discipline: None,
        };
        assert!(filter.matches("ON", "Pediatrics"));
        assert!(!filter.matches("on", "Pediatrics"));
        assert!(!filter.matches("ONT", "Pediatrics"));
    }

    #[test]
    fn test_discipline_is_case_insensitive_substring() {
        let filter = ProgramFilter {
            province: None,
            discipline: Some("SURG".to_string()),
        };
        assert!(filter.matches("BC", "General Surgery"));
        assert!(filter.matches("BC", "Neurosurgery"));
        assert!(!filter.matches("BC", "Psychiatry"));
    }

    #[test]
    fn test_filters_are_anded() {
        let filter = ProgramFilter {
            province: Some("QC".to_string()),
            discipline: Some("medicine".to_string()),
        };
        assert!(filter.matches("QC", "Family Medicine"));
        assert!(!filter.matches("ON", "Family Medicine"));
        assert!(!filter.matches("QC", "Radiology"));
    }
}
