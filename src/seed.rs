//! First-launch sample data.
//!
//! A JSON seed file is consumed once to populate sample trips when the
//! store is empty. Seed images come from an [`AssetCatalog`], an opaque
//! lookup into whatever bundled images the host ships; a trip's gallery is
//! `"{identifier}_1"`, `"{identifier}_2"`, ... until the catalog runs out.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::SeedError;
use crate::model::TripCategory;
use crate::store::Store;
use crate::thumbnails;

/// Cap on how many sample trips a seed run creates.
pub const DEFAULT_MAX_SEED_TRIPS: usize = 5;

/// One entry of the seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedTrip {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, rename = "categoryValue")]
    pub category_value: String,
    #[serde(default, rename = "image_identifier")]
    pub image_identifier: String,
}

/// Lookup for bundled sample images by name.
pub trait AssetCatalog {
    fn image_data(&self, name: &str) -> Option<Vec<u8>>;
}

impl AssetCatalog for HashMap<String, Vec<u8>> {
    fn image_data(&self, name: &str) -> Option<Vec<u8>> {
        self.get(name).cloned()
    }
}

pub fn load_seed(reader: impl Read) -> Result<Vec<SeedTrip>, SeedError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_seed_file(path: &Path) -> Result<Vec<SeedTrip>, SeedError> {
    load_seed(BufReader::new(File::open(path)?))
}

/// Populate sample trips unless the store already holds any.
///
/// Returns the number of trips created (zero when the store was non-empty).
/// Everything is staged in one context and committed with a single save.
pub fn populate_if_empty(
    store: &Store,
    seed: &[SeedTrip],
    assets: &impl AssetCatalog,
    max_trips: usize,
) -> Result<usize, SeedError> {
    if store.trip_count()? > 0 {
        return Ok(0);
    }

    let mut context = store.new_context();
    let mut created = 0usize;
    for entry in seed {
        let mut trip = context.new_trip();
        trip.title = entry.title.clone();
        trip.notes = entry.notes.clone();
        trip.is_favorite = true;
        trip.category = TripCategory::parse(&entry.category_value);
        context.update_trip(&trip);

        let mut index = 1;
        while let Some(data) = assets.image_data(&format!("{}_{}", entry.image_identifier, index))
        {
            match thumbnails::generate(&data) {
                Ok(thumbnail) => {
                    context.add_photo(trip.id, data, thumbnail, None);
                }
                Err(error) => {
                    tracing::warn!(
                        trip = %trip.title,
                        "failed to create a thumbnail for a sample image: {error}"
                    );
                    break;
                }
            }
            index += 1;
        }

        created += 1;
        if created == max_trips {
            break;
        }
    }

    store.save(&mut context)?;
    tracing::info!(trips = created, "sample data generated");
    Ok(created)
}
