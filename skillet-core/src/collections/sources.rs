//! Page sources backing the list views.

use std::sync::Arc;

use async_trait::async_trait;

use crate::collections::paged::PageSource;
use crate::error::GatewayError;
use crate::gateway::RecipeGateway;
use crate::types::{Page, Recipe, SearchQuery};

/// The user's own recipes.
pub struct UserRecipesSource {
    gateway: Arc<dyn RecipeGateway>,
    user_id: String,
}

impl UserRecipesSource {
    pub fn new(gateway: Arc<dyn RecipeGateway>, user_id: &str) -> Self {
        Self {
            gateway,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl PageSource<Recipe> for UserRecipesSource {
    async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Page<Recipe>, GatewayError> {
        self.gateway
            .list_user_recipes(&self.user_id, skip, limit)
            .await
    }
}

/// Results of one submitted search query. A new query gets a new collection.
pub struct SearchSource {
    gateway: Arc<dyn RecipeGateway>,
    query: SearchQuery,
}

impl SearchSource {
    pub fn new(gateway: Arc<dyn RecipeGateway>, query: SearchQuery) -> Self {
        Self { gateway, query }
    }
}

#[async_trait]
impl PageSource<Recipe> for SearchSource {
    async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Page<Recipe>, GatewayError> {
        self.gateway.search_recipes(&self.query, skip, limit).await
    }
}

/// Per-user recommendations.
///
/// Normalizes the canonical `{results, total, mode}` response into a plain
/// page. When the server omits `total`, a short page reads as the end of
/// the list and a full page keeps pagination open by reporting one more
/// item than has been seen so far.
pub struct RecommendationsSource {
    gateway: Arc<dyn RecipeGateway>,
    user_id: String,
}

impl RecommendationsSource {
    pub fn new(gateway: Arc<dyn RecipeGateway>, user_id: &str) -> Self {
        Self {
            gateway,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl PageSource<Recipe> for RecommendationsSource {
    async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Page<Recipe>, GatewayError> {
        let page = self
            .gateway
            .recommendations(&self.user_id, skip, limit)
            .await?;
        let seen = skip + page.results.len();
        let total = page.total.unwrap_or(if page.results.len() < limit {
            seen
        } else {
            seen + 1
        });
        Ok(Page {
            results: page.results,
            total,
        })
    }
}
