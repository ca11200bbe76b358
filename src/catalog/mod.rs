//! Domain catalogs: scraped lists of crawlable domains.
//!
//! Catalogs are generated by scraping external sources, persisted one
//! JSON file per catalog, and read by the random selector and the
//! national mapper. A catalog is either absent or fully populated;
//! generation replaces it wholesale.

pub mod reddit;
pub mod store;
pub mod wikipedia;

pub use store::CatalogStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable, fully-populated domain list under one catalog name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCatalog {
    pub name: String,
    /// Insertion order is discovery order, deduplicated.
    pub domains: Vec<String>,
    /// When the last successful generation run finished.
    pub generated_at: DateTime<Utc>,
}

impl DomainCatalog {
    pub fn new(name: impl Into<String>, domains: Vec<String>) -> Self {
        Self {
            name: name.into(),
            domains,
            generated_at: Utc::now(),
        }
    }
}

/// Final result of a generation run, as reported on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub count: usize,
    pub catalog_name: String,
    /// Where the persisted catalog file landed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<std::path::PathBuf>,
}

/// Where a background generation run stands. Polled by re-issuing the
/// `generate` command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum GenerationStatus {
    #[serde(rename_all = "camelCase")]
    Running {
        catalog_name: String,
        started_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        #[serde(flatten)]
        report: GenerationReport,
        finished_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        catalog_name: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_wire_shape() {
        let report = GenerationReport {
            count: 12,
            catalog_name: "reddit".to_string(),
            filepath: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["count"], 12);
        assert_eq!(json["catalogName"], "reddit");
        assert!(json.get("filepath").is_none());
    }

    #[test]
    fn test_status_tags() {
        let status = GenerationStatus::Completed {
            report: GenerationReport {
                count: 3,
                catalog_name: "wikipedia-countries".to_string(),
                filepath: None,
            },
            finished_at: Utc::now(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "completed");
        assert_eq!(json["count"], 3);
    }
}
