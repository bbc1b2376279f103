//! Lossless export/import of tracker state.
//!
//! The export shape is the persistence contract: re-importing an export
//! must reproduce identical attribution text and hyperlinks for every
//! data-point ID.

use deckweave_core::errors::AttributionError;
use deckweave_core::types::collections::FxHashMap;
use serde::{Deserialize, Serialize};

use super::tracker::SourceTracker;
use super::types::{DataPoint, DocumentRecord};

pub const TRACKER_VERSION: &str = "1.0";

/// Serializable snapshot of a tracker's full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionExport {
    pub data_points: FxHashMap<String, DataPoint>,
    pub documents: FxHashMap<String, DocumentRecord>,
    pub source_mappings: FxHashMap<String, Vec<String>>,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub total_data_points: usize,
    pub total_documents: usize,
    pub tracker_version: String,
}

impl SourceTracker {
    /// Snapshot all attribution data for persistence or transfer.
    pub fn export_attribution_data(&self) -> AttributionExport {
        AttributionExport {
            data_points: self.data_points.clone(),
            documents: self.documents.clone(),
            source_mappings: self.source_mappings.clone(),
            metadata: ExportMetadata {
                total_data_points: self.data_points.len(),
                total_documents: self.documents.len(),
                tracker_version: TRACKER_VERSION.to_string(),
            },
        }
    }

    /// Replace this tracker's state with an export snapshot.
    ///
    /// The internal ID counter is advanced past every imported ID so
    /// subsequently issued IDs cannot collide.
    pub fn import_attribution_data(
        &mut self,
        data: AttributionExport,
    ) -> Result<(), AttributionError> {
        if data.metadata.tracker_version != TRACKER_VERSION {
            return Err(AttributionError::UnsupportedVersion(
                data.metadata.tracker_version,
            ));
        }
        for (id, dp) in &data.data_points {
            if *id != dp.id {
                return Err(AttributionError::MalformedExport(format!(
                    "data point keyed {id} carries id {}",
                    dp.id
                )));
            }
        }

        let mut ids = deckweave_core::types::ids::IdGenerator::new();
        let max_seq = data
            .data_points
            .keys()
            .chain(data.documents.keys())
            .filter_map(|id| {
                id.rsplit('-')
                    .next()
                    .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            })
            .max();
        if let Some(max_seq) = max_seq {
            // Burn through the used range so fresh IDs stay unique.
            for _ in 0..=max_seq {
                ids.next_id("dp");
            }
        }

        self.data_points = data.data_points;
        self.documents = data.documents;
        self.source_mappings = data.source_mappings;
        self.ids = ids;
        Ok(())
    }

    /// Export as a JSON string.
    pub fn export_json(&self) -> Result<String, AttributionError> {
        Ok(serde_json::to_string(&self.export_attribution_data())?)
    }

    /// Import from a JSON string produced by `export_json`.
    pub fn import_json(&mut self, json: &str) -> Result<(), AttributionError> {
        let data: AttributionExport =
            serde_json::from_str(json).map_err(AttributionError::Serialization)?;
        self.import_attribution_data(data)
    }
}
