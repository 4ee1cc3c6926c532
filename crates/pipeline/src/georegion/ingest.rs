//! Layer-by-layer region ingestion and the population-only update.

use std::collections::BTreeSet;

use fds_core::region::ars::{district_prefix, pad_ars, parent_keys};
use fds_core::region::{BoundaryFeature, LayerSpec, RegionKind, GOV_SEAT_LAYER, LAYERS};
use fds_db::models::georegion::{GeoRegion, GeoRegionFields};
use serde_json::json;

use super::dataset::{BoundaryDataset, WGS84_SRID};
use super::placement::{allocate_child_position, rebuild_tree};
use super::store::RegionStore;
use super::{IngestError, IngestOptions};

/// Outcome of one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    pub kind: RegionKind,
    /// Identifiers that were not current before the run.
    pub new: Vec<String>,
    /// Identifiers that were current before but are missing from the layer.
    pub obsolete: Vec<String>,
    /// Features filtered out or without identifier.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub layers: Vec<LayerReport>,
    pub gov_seats: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsReport {
    pub updated: usize,
    pub skipped: usize,
}

/// Ingests a boundary dataset into a [`RegionStore`].
pub struct GeoRegionIngester<'a> {
    store: &'a dyn RegionStore,
    options: IngestOptions,
    kinds: Vec<RegionKind>,
}

impl<'a> GeoRegionIngester<'a> {
    pub fn new(store: &'a dyn RegionStore, options: IngestOptions) -> Self {
        Self {
            store,
            options,
            kinds: LAYERS.iter().map(|layer| layer.kind).collect(),
        }
    }

    /// Full ingestion: every layer in order, then a tree rebuild, then the
    /// seats of administration.
    pub async fn ingest(&self, dataset: &dyn BoundaryDataset) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();
        for layer in LAYERS {
            let features = dataset.read_layer(layer.name, WGS84_SRID).await?;
            report.layers.push(self.ingest_layer(layer, &features).await?);
        }

        rebuild_tree(self.store).await?;

        let seats = dataset.read_layer(GOV_SEAT_LAYER, WGS84_SRID).await?;
        report.gov_seats = self.set_gov_seats(&seats).await?;
        Ok(report)
    }

    /// Upsert the features of one layer and invalidate the regions of its
    /// kind that are no longer present.
    pub async fn ingest_layer(
        &self,
        layer: LayerSpec,
        features: &[BoundaryFeature],
    ) -> Result<LayerReport, IngestError> {
        let kind = layer.kind;
        let before: BTreeSet<String> = self.store.identifiers_of_kind(kind).await?.into_iter().collect();
        let mut seen = BTreeSet::new();
        let mut skipped = 0;

        for feature in features {
            if !feature.is_importable() {
                skipped += 1;
                continue;
            }
            match self.upsert_feature(feature, kind).await? {
                Some(identifier) => {
                    seen.insert(identifier);
                }
                None => skipped += 1,
            }
        }

        let new: Vec<String> = seen.difference(&before).cloned().collect();
        let obsolete: Vec<String> = before.difference(&seen).cloned().collect();
        if !obsolete.is_empty() {
            self.store
                .mark_invalid(kind, &obsolete, self.options.valid_date)
                .await?;
        }

        tracing::info!(
            layer = layer.name,
            %kind,
            imported = seen.len(),
            skipped,
            new = ?new,
            obsolete = ?obsolete,
            "Ingested layer"
        );
        Ok(LayerReport {
            kind,
            new,
            obsolete,
            skipped,
        })
    }

    /// Create or update the region of one feature. Returns its padded
    /// identifier, or `None` when the feature carries none.
    pub async fn upsert_feature(
        &self,
        feature: &BoundaryFeature,
        kind: RegionKind,
    ) -> Result<Option<String>, IngestError> {
        let Some(identifier) = feature.region_identifier() else {
            tracing::debug!(name = %feature.name(), %kind, "Feature without ARS skipped");
            return Ok(None);
        };
        let name = feature.name();

        let valid_on = feature.valid_on();
        if valid_on.is_none() {
            tracing::warn!(identifier = %identifier, wsk = ?feature.text("WSK"), "Unparseable validity date");
        }

        let (existing, former_ars) = self.find_existing(&identifier, kind, &name).await?;
        let parent = self.find_parent(&identifier, kind).await?;
        let parent_id = parent.as_ref().map(|p| p.id);

        let mut data = json!({
            "label": feature.full_name(),
            "nuts": feature.nuts(),
            "DEBKG_ID": feature.debkg_id(),
        });
        if let Some(former_ars) = former_ars {
            data["former_ars"] = json!(former_ars);
        }

        let fields = GeoRegionFields {
            name,
            slug: feature.slug(),
            kind,
            kind_detail: feature.kind_detail(),
            region_identifier: identifier.clone(),
            global_identifier: feature.nuts(),
            geometry: (!feature.geometry.is_null()).then(|| feature.geometry.clone()),
            valid_on,
            data,
            part_of_id: parent_id,
        };

        match existing {
            Some(region) if region.part_of_id == parent_id => {
                self.store.update(region.id, &fields, None).await?;
            }
            Some(region) => {
                tracing::info!(identifier = %identifier, from = ?region.part_of_id, to = ?parent_id, "Region moved");
                let position = allocate_child_position(self.store, parent.as_ref()).await?;
                if let Some(old_parent_id) = region.part_of_id {
                    self.store.decrement_numchild(old_parent_id).await?;
                }
                if let Some(parent_id) = parent_id {
                    self.store.increment_numchild(parent_id).await?;
                }
                self.store.update(region.id, &fields, Some(&position)).await?;
            }
            None => {
                let position = allocate_child_position(self.store, parent.as_ref()).await?;
                if let Some(parent_id) = parent_id {
                    self.store.increment_numchild(parent_id).await?;
                }
                self.store.create(&fields, &position).await?;
            }
        }
        Ok(Some(identifier))
    }

    /// Existing region for a feature, plus the updated `former_ars` list when
    /// it was found under an earlier identifier.
    async fn find_existing(
        &self,
        identifier: &str,
        kind: RegionKind,
        name: &str,
    ) -> Result<(Option<GeoRegion>, Option<Vec<String>>), IngestError> {
        if let Some(region) = self.store.find_by_identifier(identifier, kind).await? {
            return Ok((Some(region), None));
        }
        let prefix = district_prefix(identifier);
        let Some(region) = self.store.find_by_district_and_name(prefix, kind, name).await? else {
            return Ok((None, None));
        };

        let mut former_ars = region.former_ars();
        if !former_ars.contains(&region.region_identifier) {
            former_ars.push(region.region_identifier.clone());
        }
        tracing::info!(
            old = %region.region_identifier,
            new = %identifier,
            name,
            "Region identifier changed"
        );
        Ok((Some(region), Some(former_ars)))
    }

    async fn find_parent(
        &self,
        identifier: &str,
        kind: RegionKind,
    ) -> Result<Option<GeoRegion>, IngestError> {
        for key in parent_keys(identifier) {
            if let Some(parent) = self.store.find_parent(&key, &self.kinds, kind.level()).await? {
                return Ok(Some(parent));
            }
        }
        Ok(None)
    }

    /// Store the seat of administration points. Points without a matching
    /// region are skipped.
    pub async fn set_gov_seats(&self, features: &[BoundaryFeature]) -> Result<u64, IngestError> {
        let mut updated = 0;
        for feature in features {
            let Some(key) = feature.ars().or_else(|| feature.text("RS")) else {
                continue;
            };
            if feature.geometry.is_null() {
                continue;
            }
            let identifier = pad_ars(&key);
            let rows = self.store.set_gov_seat(&identifier, &feature.geometry).await?;
            if rows == 0 {
                tracing::debug!(identifier = %identifier, "No region for seat of administration");
            }
            updated += rows;
        }
        tracing::info!(updated, "Set seats of administration");
        Ok(updated)
    }

    /// Refresh population figures only. Every feature with a population must
    /// resolve to an existing region.
    pub async fn update_stats(&self, dataset: &dyn BoundaryDataset) -> Result<StatsReport, IngestError> {
        let mut report = StatsReport::default();
        for layer in LAYERS {
            let features = dataset.read_layer(layer.name, WGS84_SRID).await?;
            for feature in &features {
                if !feature.is_importable() {
                    continue;
                }
                let (Some(population), Some(identifier)) = (feature.population(), feature.region_identifier())
                else {
                    report.skipped += 1;
                    continue;
                };
                let region = self.find_for_stats(&identifier, layer.kind, &feature.name()).await?;
                self.store.update_population(region.id, population).await?;
                report.updated += 1;
            }
            tracing::info!(layer = layer.name, updated = report.updated, "Updated population");
        }
        Ok(report)
    }

    async fn find_for_stats(
        &self,
        identifier: &str,
        kind: RegionKind,
        name: &str,
    ) -> Result<GeoRegion, IngestError> {
        if let Some(region) = self.store.find_by_identifier(identifier, kind).await? {
            return Ok(region);
        }
        let prefix = district_prefix(identifier);
        if let Some(region) = self.store.find_by_former_identifier(prefix, kind, identifier).await? {
            return Ok(region);
        }
        if let Some(region) = self.store.find_by_district_and_name(prefix, kind, name).await? {
            return Ok(region);
        }
        Err(IngestError::MissingRegion {
            kind,
            identifier: identifier.to_string(),
            name: name.to_string(),
        })
    }
}
