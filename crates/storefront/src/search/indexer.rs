//! Search index builder.
//!
//! Rebuilds the whole index from `forno.products` on every run. Menus are
//! small, so a full rebuild is simpler than tracking individual changes.

use std::collections::HashMap;
use std::time::Duration;

use forno_core::{Category, CategoryId, Product};
use sqlx::PgPool;
use tantivy::{Index, doc};
use tantivy::tokenizer::{
    AsciiFoldingFilter, LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use super::{MENU_TOKENIZER, SearchError, SearchFields, SearchIndex};
use crate::db::CatalogRepository;

const WRITER_MEMORY_BYTES: usize = 20_000_000;

/// Spawn a background task that rebuilds the index now and then every
/// `interval`.
#[must_use]
pub fn spawn_reindexer(search: SearchIndex, pool: PgPool, interval: Duration) -> JoinHandle<()> {
    info!(?interval, "Spawning background search index task");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match reindex(&search, &pool).await {
                Ok(()) => info!(docs = search.num_docs(), "Search index is ready"),
                Err(e) => error!(error = %e, "Failed to rebuild search index"),
            }
        }
    })
}

async fn reindex(search: &SearchIndex, pool: &PgPool) -> Result<(), SearchError> {
    let catalog = CatalogRepository::new(pool);
    let products = catalog
        .all_products()
        .await
        .map_err(|e| SearchError::Build(format!("Failed to load products: {e}")))?;
    let categories = catalog
        .categories()
        .await
        .map_err(|e| SearchError::Build(format!("Failed to load categories: {e}")))?;

    let (index, fields) =
        tokio::task::spawn_blocking(move || build_index(&products, &categories))
            .await
            .map_err(|e| SearchError::Build(format!("Index build task failed: {e}")))??;

    search.set_ready(&index, fields)
}

/// Build an in-memory index over `products`.
///
/// # Errors
///
/// Returns an error if Tantivy fails to write or commit the index.
#[instrument(skip_all, fields(products = products.len()))]
pub fn build_index(
    products: &[Product],
    categories: &[Category],
) -> Result<(Index, SearchFields), SearchError> {
    let (schema, fields) = SearchIndex::build_schema();
    let index = Index::create_in_ram(schema);

    // Lowercase and strip accents so "tiramisu" finds "Tiramisù".
    index.tokenizers().register(
        MENU_TOKENIZER,
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(40))
            .filter(LowerCaser)
            .filter(AsciiFoldingFilter)
            .build(),
    );

    let mut writer: tantivy::IndexWriter = index
        .writer_with_num_threads(1, WRITER_MEMORY_BYTES)
        .map_err(|e| SearchError::Build(format!("Failed to create writer: {e}")))?;

    let category_names: HashMap<CategoryId, &str> = categories
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    for product in products {
        let category = product
            .category_id
            .and_then(|id| category_names.get(&id).copied())
            .unwrap_or("");
        let doc = doc!(
            fields.product_id => u64::try_from(product.id.as_i32()).unwrap_or_default(),
            fields.name => product.name.as_str(),
            fields.description => product.description.as_str(),
            fields.category => category,
            fields.price => product.price.to_string(),
            fields.image_path => product.image_path.as_deref().unwrap_or(""),
            fields.available => u64::from(product.is_available),
            fields.name_text => product.name.as_str(),
            fields.description_text => product.description.as_str(),
            fields.category_text => category,
        );
        writer
            .add_document(doc)
            .map_err(|e| SearchError::Build(format!("Failed to add product {}: {e}", product.id)))?;
    }

    writer
        .commit()
        .map_err(|e| SearchError::Build(format!("Failed to commit index: {e}")))?;

    Ok((index, fields))
}
