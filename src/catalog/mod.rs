//! Measurement Catalog Resolver
//!
//! Discovers which fragment/series pairs the configured target supports, so
//! the configuration surface can offer them as badge selectors. For groups
//! only one representative device per device type is queried.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::capability::Inventory;
use crate::directory::DirectoryResolver;
use crate::error::SyncResult;
use crate::types::{Device, DeviceId, FragmentSeries};

/// Read-only catalog of supported measurement series
pub struct MeasurementCatalog {
    inventory: Arc<dyn Inventory>,
    directory: DirectoryResolver,
    default_device_type: String,
}

impl MeasurementCatalog {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        directory: DirectoryResolver,
        default_device_type: impl Into<String>,
    ) -> Self {
        Self {
            inventory,
            directory,
            default_device_type: default_device_type.into(),
        }
    }

    /// Supported series of the target (or of its devices, for a group)
    #[instrument(skip(self))]
    pub async fn discover(&self, target: &DeviceId) -> SyncResult<Vec<FragmentSeries>> {
        let root = self.directory.lookup(target).await?;
        let candidates = if self.directory.is_group(&root) {
            let devices = self.directory.expand(&root.id).await?;
            self.representatives(&devices)
        } else {
            vec![root.id]
        };

        let mut catalog = Vec::new();
        for id in candidates {
            debug!("Checking series for {}", id);
            let series = match self.inventory.supported_series(&id).await {
                Ok(series) => series,
                Err(e) => {
                    warn!("Supported series of {} unavailable: {}", id, e);
                    continue;
                }
            };
            let measurements = match self.inventory.supported_measurements(&id).await {
                Ok(measurements) => measurements,
                Err(e) => {
                    warn!("Supported measurements of {} unavailable: {}", id, e);
                    continue;
                }
            };
            merge_fragment_series(&mut catalog, &series, &measurements);
        }

        Ok(catalog)
    }

    /// First device of each distinct type, in directory order
    fn representatives(&self, devices: &[Device]) -> Vec<DeviceId> {
        let mut seen = HashSet::new();
        devices
            .iter()
            .filter(|d| seen.insert(d.type_or(&self.default_device_type).to_string()))
            .map(|d| d.id.clone())
            .collect()
    }
}

/// Pair each series with the first fragment type it contains and append the
/// entries not yet present in `catalog`
pub fn merge_fragment_series(
    catalog: &mut Vec<FragmentSeries>,
    series: &[String],
    measurements: &[String],
) {
    for full in series {
        let Some(fragment_type) = measurements.iter().find(|m| full.contains(m.as_str())) else {
            continue;
        };
        let name = full.replace(&format!("{fragment_type}."), "");
        let exists = catalog
            .iter()
            .any(|f| &f.fragment_type == fragment_type && f.name == name);
        if !exists {
            catalog.push(FragmentSeries {
                fragment_type: fragment_type.clone(),
                name,
                description: full.clone(),
            });
        }
    }
}
