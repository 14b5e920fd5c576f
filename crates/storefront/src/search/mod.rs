//! Full-text menu search using Tantivy.
//!
//! The index lives in RAM and is rebuilt from the database on a fixed
//! interval (see [`spawn_reindexer`]). The app starts with an empty index;
//! searches return nothing until the first build is swapped in.

mod indexer;

use std::str::FromStr;
use std::sync::{Arc, RwLock};

use forno_core::ProductId;
use rust_decimal::Decimal;
use serde::Serialize;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, RegexQuery, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, STORED, Schema, TextFieldIndexing, TextOptions,
    Value,
};
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument, Term};
use tracing::instrument;

pub use indexer::{build_index, spawn_reindexer};

/// Name of the tokenizer registered on every index.
pub(crate) const MENU_TOKENIZER: &str = "menu";

/// A search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub price: Decimal,
    pub image_path: Option<String>,
    pub is_available: bool,
    pub score: f32,
}

/// Schema field handles for the search index.
#[derive(Clone)]
pub struct SearchFields {
    // Stored fields (returned in results)
    pub product_id: Field,
    pub name: Field,
    pub description: Field,
    pub category: Field,
    pub price: Field,
    pub image_path: Field,
    pub available: Field,
    // Text fields for full-text search (not stored, just indexed)
    pub name_text: Field,
    pub description_text: Field,
    pub category_text: Field,
}

/// Inner index state (once built).
struct ReadyIndex {
    reader: IndexReader,
    fields: SearchFields,
    analyzer: TextAnalyzer,
}

/// The search index. Cheap to clone.
#[derive(Clone, Default)]
pub struct SearchIndex {
    inner: Arc<RwLock<Option<ReadyIndex>>>,
}

impl SearchIndex {
    /// Create a new empty search index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the index is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Swap in a freshly built index.
    ///
    /// # Errors
    ///
    /// Returns an error if a reader cannot be created or the lock is poisoned.
    pub fn set_ready(&self, index: &Index, fields: SearchFields) -> Result<(), SearchError> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::Index(format!("Failed to create reader: {e}")))?;
        let analyzer = index
            .tokenizers()
            .get(MENU_TOKENIZER)
            .ok_or_else(|| SearchError::Index("menu tokenizer not registered".to_string()))?;

        *self
            .inner
            .write()
            .map_err(|_| SearchError::Index("Lock poisoned".to_string()))? = Some(ReadyIndex {
            reader,
            fields,
            analyzer,
        });

        Ok(())
    }

    /// Build the schema for the search index.
    pub(crate) fn build_schema() -> (Schema, SearchFields) {
        let mut schema_builder = Schema::builder();

        let stored_u64 = NumericOptions::default().set_stored().set_indexed();
        let product_id = schema_builder.add_u64_field("product_id", stored_u64.clone());
        let name = schema_builder.add_text_field("name", STORED);
        let description = schema_builder.add_text_field("description", STORED);
        let category = schema_builder.add_text_field("category", STORED);
        let price = schema_builder.add_text_field("price", STORED);
        let image_path = schema_builder.add_text_field("image_path", STORED);
        let available = schema_builder.add_u64_field("available", stored_u64);

        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer(MENU_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_options = TextOptions::default().set_indexing_options(text_indexing);

        let name_text = schema_builder.add_text_field("name_text", text_options.clone());
        let description_text =
            schema_builder.add_text_field("description_text", text_options.clone());
        let category_text = schema_builder.add_text_field("category_text", text_options);

        let fields = SearchFields {
            product_id,
            name,
            description,
            category,
            price,
            image_path,
            available,
            name_text,
            description_text,
            category_text,
        };

        (schema_builder.build(), fields)
    }

    /// Search product names, descriptions and categories.
    ///
    /// Short terms match as prefixes ("ma" finds "margherita"); longer terms
    /// also match with one typo. Returns nothing for an empty query or while
    /// the index is still being built.
    ///
    /// # Errors
    ///
    /// Returns an error if the index lock is poisoned or the search query fails.
    #[instrument(skip(self))]
    // The read guard must outlive `ready`, which borrows from it.
    #[allow(clippy::significant_drop_tightening)]
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        available_only: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| SearchError::Index("Lock poisoned".to_string()))?;

        let Some(ready) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let terms = tokenize(&mut ready.analyzer.clone(), query_str);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for term in &terms {
            let fields = &ready.fields;
            for field in [fields.name_text, fields.category_text] {
                let exact = Term::from_field_text(field, term);
                subqueries.push((
                    Occur::Should,
                    Box::new(TermQuery::new(exact, IndexRecordOption::WithFreqs)),
                ));
            }

            let pattern = format!("{}.*", escape_regex(term));
            if let Ok(prefix) = RegexQuery::from_pattern(&pattern, fields.name_text) {
                subqueries.push((Occur::Should, Box::new(prefix)));
            }

            if term.chars().count() >= 4 {
                for field in [fields.name_text, fields.description_text] {
                    let fuzzy = FuzzyTermQuery::new(Term::from_field_text(field, term), 1, true);
                    subqueries.push((Occur::Should, Box::new(fuzzy)));
                }
            } else {
                let exact = Term::from_field_text(fields.description_text, term);
                subqueries.push((
                    Occur::Should,
                    Box::new(TermQuery::new(exact, IndexRecordOption::WithFreqs)),
                ));
            }
        }

        let text_query: Box<dyn Query> = Box::new(BooleanQuery::new(subqueries));
        let query: Box<dyn Query> = if available_only {
            let available = Term::from_field_u64(ready.fields.available, 1);
            Box::new(BooleanQuery::new(vec![
                (Occur::Must, text_query),
                (
                    Occur::Must,
                    Box::new(TermQuery::new(available, IndexRecordOption::Basic)),
                ),
            ]))
        } else {
            text_query
        };

        let searcher = ready.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .map_err(|e| SearchError::Query(format!("Search failed: {e}")))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc = searcher
                .doc::<TantivyDocument>(address)
                .map_err(|e| SearchError::Query(format!("Failed to retrieve doc: {e}")))?;
            hits.push(doc_to_hit(&ready.fields, &doc, score)?);
        }

        Ok(hits)
    }

    /// Get the number of documents in the index, or 0 if not ready.
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|r| r.reader.searcher().num_docs()))
            .unwrap_or(0)
    }
}

/// Run `text` through the index analyzer so query terms match indexed terms.
fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while stream.advance() {
        let token = stream.token().text.clone();
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

fn escape_regex(term: &str) -> String {
    term.chars()
        .flat_map(|c| match c {
            '.' | '*' | '+' | '?' | '^' | '$' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' => {
                vec!['\\', c]
            }
            _ => vec![c],
        })
        .collect()
}

fn doc_to_hit(
    fields: &SearchFields,
    doc: &TantivyDocument,
    score: f32,
) -> Result<SearchHit, SearchError> {
    let get_text = |field: Field| -> String {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };
    let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };

    let raw_id = doc
        .get_first(fields.product_id)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| SearchError::Query("document without product_id".to_string()))?;
    let product_id = i32::try_from(raw_id)
        .map(ProductId::new)
        .map_err(|_| SearchError::Query(format!("invalid product_id: {raw_id}")))?;
    let price_text = get_text(fields.price);
    let price = Decimal::from_str(&price_text)
        .map_err(|e| SearchError::Query(format!("invalid price {price_text:?}: {e}")))?;

    Ok(SearchHit {
        product_id,
        name: get_text(fields.name),
        description: get_text(fields.description),
        category: non_empty(get_text(fields.category)),
        price,
        image_path: non_empty(get_text(fields.image_path)),
        is_available: doc
            .get_first(fields.available)
            .and_then(|v| v.as_u64())
            .is_some_and(|v| v == 1),
        score,
    })
}

/// Search errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Index error: {0}")]
    Index(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Build error: {0}")]
    Build(String),
}
