//! Remote data gateway: the client's only view of the server.
//!
//! Everything the collections and the like toggle do goes through the
//! [`RecipeGateway`] trait, so the pagination logic can be exercised against
//! the in-memory [`MockGateway`] and shipped against the HTTP implementation.

mod http;
mod mock;

pub use http::{HttpGateway, HttpGatewayBuilder};
pub use mock::{MockGateway, MockOp};

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{
    LikedIdsPage, NewRecipe, Page, Recipe, RecipePatch, RecommendationPage, SearchQuery, User,
};

/// Abstract operations of the recipe-sharing API.
///
/// Implementations are stateless from the caller's perspective and safe to
/// share behind an `Arc`. All list operations use server-side offset
/// pagination (`skip`/`limit`).
#[async_trait]
pub trait RecipeGateway: Send + Sync {
    async fn list_users(&self, skip: usize, limit: usize) -> Result<Vec<User>, GatewayError>;

    async fn get_user(&self, user_id: &str) -> Result<User, GatewayError>;

    async fn list_user_recipes(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Page<Recipe>, GatewayError>;

    async fn create_recipe(&self, user_id: &str, draft: &NewRecipe)
        -> Result<Recipe, GatewayError>;

    async fn update_recipe(
        &self,
        user_id: &str,
        recipe_id: &str,
        patch: &RecipePatch,
    ) -> Result<Recipe, GatewayError>;

    /// Idempotent on success: deleting an already-deleted recipe is a 404.
    async fn delete_recipe(&self, user_id: &str, recipe_id: &str) -> Result<(), GatewayError>;

    async fn get_recipe(&self, recipe_id: &str) -> Result<Recipe, GatewayError>;

    async fn list_categories(&self) -> Result<Vec<String>, GatewayError>;

    async fn search_recipes(
        &self,
        query: &SearchQuery,
        skip: usize,
        limit: usize,
    ) -> Result<Page<Recipe>, GatewayError>;

    /// Batch lookup by id. The response order is not guaranteed and missing
    /// ids are silently absent; callers re-order against their id list.
    async fn recipes_by_ids(&self, ids: &[String]) -> Result<Vec<Recipe>, GatewayError>;

    /// One page of recipe ids the user has liked, with the like total.
    async fn liked_recipe_ids(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<LikedIdsPage, GatewayError>;

    async fn like_recipe(&self, user_id: &str, recipe_id: &str) -> Result<(), GatewayError>;

    async fn unlike_recipe(&self, user_id: &str, recipe_id: &str) -> Result<(), GatewayError>;

    async fn like_exists(&self, user_id: &str, recipe_id: &str) -> Result<bool, GatewayError>;

    async fn like_count(&self, recipe_id: &str) -> Result<u64, GatewayError>;

    async fn recommendations(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<RecommendationPage, GatewayError>;
}
