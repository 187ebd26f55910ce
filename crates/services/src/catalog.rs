use std::sync::Arc;

use practice_core::model::{Topic, Unit, UnitId, UnitProgress, UserId};
use storage::repository::{ProgressRepository, UnitRepository};

use crate::error::CatalogError;

/// A unit together with its ordered topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDetail {
    pub unit: Unit,
    pub topics: Vec<Topic>,
}

/// Read-side catalog queries: units, topics, and progress overviews.
#[derive(Clone)]
pub struct CatalogService {
    units: Arc<dyn UnitRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(units: Arc<dyn UnitRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { units, progress }
    }

    /// Active units ordered by unit number.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when storage fails.
    pub async fn list_units(&self) -> Result<Vec<Unit>, CatalogError> {
        Ok(self.units.list_units().await?)
    }

    /// One unit with its topics.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnitNotFound` for an unknown unit.
    pub async fn unit_with_topics(&self, unit_id: UnitId) -> Result<UnitDetail, CatalogError> {
        let unit = self
            .units
            .get_unit(unit_id)
            .await?
            .ok_or(CatalogError::UnitNotFound)?;
        let topics = self.units.list_topics(unit_id).await?;
        Ok(UnitDetail { unit, topics })
    }

    /// Every progress record for a user, across units and topics.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when storage fails.
    pub async fn user_progress(&self, user_id: &UserId) -> Result<Vec<UnitProgress>, CatalogError> {
        Ok(self.progress.list_progress(user_id).await?)
    }
}
