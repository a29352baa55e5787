//! Liked-recipes collection: id pages hydrated into full records.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::collections::paged::{PageSnapshot, PageSource, PagedCollection};
use crate::error::GatewayError;
use crate::gateway::RecipeGateway;
use crate::types::{Page, Recipe};

/// Two-stage page source: a page of liked recipe ids, then one batch fetch
/// of the full records.
///
/// The stages run in strict sequence and a failure in either one surfaces
/// before any collection state changes, so the cursor and items only ever
/// advance together. The merged page is ordered by the id page, not by the
/// batch response; ids the batch did not return are dropped.
struct LikedRecipesSource {
    gateway: Arc<dyn RecipeGateway>,
    user_id: String,
}

#[async_trait]
impl PageSource<Recipe> for LikedRecipesSource {
    async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Page<Recipe>, GatewayError> {
        let ids_page = self
            .gateway
            .liked_recipe_ids(&self.user_id, skip, limit)
            .await?;
        let total = ids_page.total;

        if ids_page.recipe_ids.is_empty() {
            return Ok(Page {
                results: Vec::new(),
                total,
            });
        }

        let records = match self.gateway.recipes_by_ids(&ids_page.recipe_ids).await {
            Ok(records) => records,
            // Every id on the page was stale; an empty page is still a page.
            Err(GatewayError::NotFound(reason)) => {
                tracing::debug!(reason = %reason, "hydrate batch returned no records");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut by_id: HashMap<String, Recipe> =
            records.into_iter().map(|r| (r.id.clone(), r)).collect();
        let results: Vec<Recipe> = ids_page
            .recipe_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        if results.len() < ids_page.recipe_ids.len() {
            tracing::debug!(
                requested = ids_page.recipe_ids.len(),
                hydrated = results.len(),
                "some liked ids had no record"
            );
        }
        Ok(Page { results, total })
    }
}

/// Recipes the user has liked, loaded incrementally.
///
/// Pagination semantics match [`PagedCollection`]; `total` comes from the
/// id-page response. Liking or unliking a recipe elsewhere leaves this
/// collection stale until its next `reset`.
pub struct LikesCollection {
    user_id: String,
    inner: PagedCollection<Recipe>,
}

impl LikesCollection {
    pub fn new(gateway: Arc<dyn RecipeGateway>, user_id: &str, page_size: usize) -> Self {
        let source = Arc::new(LikedRecipesSource {
            gateway,
            user_id: user_id.to_string(),
        });
        Self {
            user_id: user_id.to_string(),
            inner: PagedCollection::new(source, page_size).with_item_key(|r: &Recipe| r.id.clone()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    pub async fn reset(&self) -> Result<(), GatewayError> {
        self.inner.reset().await
    }

    pub async fn load_more(&self) -> Result<bool, GatewayError> {
        self.inner.load_more().await
    }

    pub fn snapshot(&self) -> PageSnapshot<Recipe> {
        self.inner.snapshot()
    }

    pub fn items(&self) -> Vec<Recipe> {
        self.inner.items()
    }

    pub fn total(&self) -> usize {
        self.inner.total()
    }

    pub fn skip(&self) -> usize {
        self.inner.skip()
    }

    pub fn loading(&self) -> bool {
        self.inner.loading()
    }

    pub fn all_loaded(&self) -> bool {
        self.inner.all_loaded()
    }
}
