//! Game catalog records.

use crate::config::ConnectionDescriptor;
use crate::error::{NimbusError, Result};
use crate::query::{QueryExecutor, QueryRequest};
use serde::{Deserialize, Serialize};

/// Statement backing the Epic catalog listing.
pub const EPIC_CATALOG_QUERY: &str = "select * from epic.catalogs";

/// One entry of the Epic store catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpicCatalog {
    /// Steam application id.
    pub appid: Option<i64>,

    pub name: Option<String>,

    /// Release date as `YYYY-MM-DD`.
    pub release_date: Option<String>,

    pub developer: Option<String>,

    pub positive_ratings: Option<i64>,

    /// Price in US dollars.
    pub price: Option<f64>,
}

impl EpicCatalog {
    /// Checks value ranges: `appid >= 1`, `positive_ratings >= 0`, `price >= 0`.
    pub fn validate(&self) -> Result<()> {
        let label = self.name.as_deref().unwrap_or("<unnamed>");
        if let Some(appid) = self.appid.filter(|id| *id < 1) {
            return Err(NimbusError::unexpected(format!(
                "Catalog entry '{label}' has invalid appid {appid}"
            )));
        }
        if let Some(ratings) = self.positive_ratings.filter(|r| *r < 0) {
            return Err(NimbusError::unexpected(format!(
                "Catalog entry '{label}' has negative positive_ratings {ratings}"
            )));
        }
        if let Some(price) = self.price.filter(|p| p.is_nan() || *p < 0.0) {
            return Err(NimbusError::unexpected(format!(
                "Catalog entry '{label}' has invalid price {price}"
            )));
        }
        Ok(())
    }
}

/// Loads the full Epic catalog. Any out-of-range record fails the whole load.
pub async fn fetch_epic_catalog(
    executor: &QueryExecutor<'_>,
    descriptor: &ConnectionDescriptor,
) -> Result<Vec<EpicCatalog>> {
    let catalog: Vec<EpicCatalog> = executor
        .execute(descriptor, &QueryRequest::new(EPIC_CATALOG_QUERY))
        .await?
        .to_records()?;

    for entry in &catalog {
        entry.validate()?;
    }
    Ok(catalog)
}
