//! In-memory gateway for tests and offline development.
//!
//! Behaves like a small recipe server: seeded users, recipes, likes and
//! categories with offset pagination over the stored order. Supports
//! scripted failures per operation and checkpoints (hold/release gates) so
//! tests can interleave requests deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::gateway::RecipeGateway;
use crate::types::{
    DescriptionPatch, LikedIdsPage, NewRecipe, Page, Recipe, RecipeAuthor, RecipePatch,
    RecommendationMode, RecommendationPage, SearchQuery, User,
};

/// Identifies a gateway operation for scripted failures, gates and the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    ListUsers,
    GetUser,
    ListUserRecipes,
    CreateRecipe,
    UpdateRecipe,
    DeleteRecipe,
    GetRecipe,
    ListCategories,
    SearchRecipes,
    RecipesByIds,
    LikedRecipeIds,
    LikeRecipe,
    UnlikeRecipe,
    LikeExists,
    LikeCount,
    Recommendations,
}

#[derive(Default)]
struct MockState {
    users: Vec<User>,
    recipes: Vec<Recipe>,
    /// (user_id, recipe_id) pairs in like order.
    likes: Vec<(String, String)>,
    categories: Vec<String>,
    failures: HashMap<MockOp, VecDeque<GatewayError>>,
}

/// Configurable in-memory implementation of [`RecipeGateway`].
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
    gates: Mutex<HashMap<MockOp, Arc<Semaphore>>>,
    calls: Mutex<Vec<MockOp>>,
}

impl MockGateway {
    /// Create an empty mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user.
    pub fn with_user(self, id: &str, username: &str) -> Self {
        self.state.lock().unwrap().users.push(User {
            id: id.to_string(),
            username: username.to_string(),
        });
        self
    }

    /// Seed a recipe as stored server-side.
    pub fn with_recipe(self, recipe: Recipe) -> Self {
        self.state.lock().unwrap().recipes.push(recipe);
        self
    }

    /// Seed a like edge as-is; stale recipe ids are allowed so tests can
    /// exercise hydrate misses.
    pub fn with_like(self, user_id: &str, recipe_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .likes
            .push((user_id.to_string(), recipe_id.to_string()));
        self
    }

    pub fn with_categories(self, categories: &[&str]) -> Self {
        self.state.lock().unwrap().categories =
            categories.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Insert a like at the front of the user's like order, shifting every
    /// offset the way new server-side data does between page loads.
    pub fn add_like_first(&self, user_id: &str, recipe_id: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .likes
            .insert(0, (user_id.to_string(), recipe_id.to_string()));
    }

    /// Script the next call to `op` to fail with `error`.
    pub fn fail_next(&self, op: MockOp, error: GatewayError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Make the next calls to `op` block until [`MockGateway::release`].
    pub fn hold(&self, op: MockOp) {
        self.gates
            .lock()
            .unwrap()
            .insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held calls to `op` proceed.
    pub fn release(&self, op: MockOp, n: usize) {
        if let Some(gate) = self.gates.lock().unwrap().get(&op) {
            gate.add_permits(n);
        }
    }

    /// Number of calls recorded for `op`.
    pub fn call_count(&self, op: MockOp) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    async fn checkpoint(&self, op: MockOp) {
        let gate = self.gates.lock().unwrap().get(&op).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    /// Record the call and pop a scripted failure if one is queued.
    fn begin(&self, op: MockOp) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(op);
        let mut state = self.state.lock().unwrap();
        if let Some(queue) = state.failures.get_mut(&op) {
            if let Some(error) = queue.pop_front() {
                return Err(error);
            }
        }
        Ok(())
    }

    fn page_of<T>(items: Vec<T>, skip: usize, limit: usize) -> Page<T> {
        let total = items.len();
        let results = items.into_iter().skip(skip).take(limit).collect();
        Page { results, total }
    }

    fn username_of(state: &MockState, user_id: &str) -> String {
        state
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| user_id.to_string())
    }

    fn likes_for_recipe(state: &MockState, recipe_id: &str) -> usize {
        state.likes.iter().filter(|(_, r)| r == recipe_id).count()
    }
}

#[async_trait]
impl RecipeGateway for MockGateway {
    async fn list_users(&self, skip: usize, limit: usize) -> Result<Vec<User>, GatewayError> {
        self.checkpoint(MockOp::ListUsers).await;
        self.begin(MockOp::ListUsers)?;
        let users = self.state.lock().unwrap().users.clone();
        Ok(Self::page_of(users, skip, limit).results)
    }

    async fn get_user(&self, user_id: &str) -> Result<User, GatewayError> {
        self.checkpoint(MockOp::GetUser).await;
        self.begin(MockOp::GetUser)?;
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("User {} not found", user_id)))
    }

    async fn list_user_recipes(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Page<Recipe>, GatewayError> {
        self.checkpoint(MockOp::ListUserRecipes).await;
        self.begin(MockOp::ListUserRecipes)?;
        let state = self.state.lock().unwrap();
        let mine: Vec<Recipe> = state
            .recipes
            .iter()
            .filter(|r| r.created_by.as_ref().is_some_and(|a| a.id == user_id))
            .cloned()
            .collect();
        Ok(Self::page_of(mine, skip, limit))
    }

    async fn create_recipe(
        &self,
        user_id: &str,
        draft: &NewRecipe,
    ) -> Result<Recipe, GatewayError> {
        self.checkpoint(MockOp::CreateRecipe).await;
        self.begin(MockOp::CreateRecipe)?;
        let mut state = self.state.lock().unwrap();
        if !state.users.iter().any(|u| u.id == user_id) {
            return Err(GatewayError::NotFound(format!(
                "User {} not found",
                user_id
            )));
        }
        let recipe = Recipe {
            id: Uuid::new_v4().to_string(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category.clone(),
            ingredients: draft.ingredients.iter().map(|i| i.to_ingredient()).collect(),
            created_by: Some(RecipeAuthor {
                id: user_id.to_string(),
                username: Self::username_of(&state, user_id),
            }),
        };
        state.recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(
        &self,
        user_id: &str,
        recipe_id: &str,
        patch: &RecipePatch,
    ) -> Result<Recipe, GatewayError> {
        self.checkpoint(MockOp::UpdateRecipe).await;
        self.begin(MockOp::UpdateRecipe)?;
        let mut state = self.state.lock().unwrap();
        let recipe = state
            .recipes
            .iter_mut()
            .find(|r| r.id == recipe_id && r.created_by.as_ref().is_some_and(|a| a.id == user_id))
            .ok_or_else(|| GatewayError::NotFound(format!("Recipe {} not found", recipe_id)))?;
        if let Some(title) = &patch.title {
            recipe.title = title.clone();
        }
        match &patch.description {
            DescriptionPatch::Keep => {}
            DescriptionPatch::Clear => recipe.description = None,
            DescriptionPatch::Set(text) => recipe.description = Some(text.clone()),
        }
        if let Some(category) = &patch.category {
            recipe.category = category.clone();
        }
        if let Some(ingredients) = &patch.ingredients {
            recipe.ingredients = ingredients.iter().map(|i| i.to_ingredient()).collect();
        }
        Ok(recipe.clone())
    }

    async fn delete_recipe(&self, user_id: &str, recipe_id: &str) -> Result<(), GatewayError> {
        self.checkpoint(MockOp::DeleteRecipe).await;
        self.begin(MockOp::DeleteRecipe)?;
        let mut state = self.state.lock().unwrap();
        let before = state.recipes.len();
        state.recipes.retain(|r| {
            !(r.id == recipe_id && r.created_by.as_ref().is_some_and(|a| a.id == user_id))
        });
        if state.recipes.len() == before {
            return Err(GatewayError::NotFound(format!(
                "Recipe {} not found",
                recipe_id
            )));
        }
        state.likes.retain(|(_, r)| r != recipe_id);
        Ok(())
    }

    async fn get_recipe(&self, recipe_id: &str) -> Result<Recipe, GatewayError> {
        self.checkpoint(MockOp::GetRecipe).await;
        self.begin(MockOp::GetRecipe)?;
        let state = self.state.lock().unwrap();
        state
            .recipes
            .iter()
            .find(|r| r.id == recipe_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("Recipe {} not found", recipe_id)))
    }

    async fn list_categories(&self) -> Result<Vec<String>, GatewayError> {
        self.checkpoint(MockOp::ListCategories).await;
        self.begin(MockOp::ListCategories)?;
        Ok(self.state.lock().unwrap().categories.clone())
    }

    async fn search_recipes(
        &self,
        query: &SearchQuery,
        skip: usize,
        limit: usize,
    ) -> Result<Page<Recipe>, GatewayError> {
        self.checkpoint(MockOp::SearchRecipes).await;
        self.begin(MockOp::SearchRecipes)?;
        let state = self.state.lock().unwrap();
        let matching: Vec<Recipe> = state
            .recipes
            .iter()
            .filter(|r| match query {
                SearchQuery::Category(category) => r.category == *category,
                SearchQuery::Ingredients(wanted) => wanted.iter().all(|w| {
                    r.ingredients
                        .iter()
                        .any(|i| i.name.to_lowercase() == w.to_lowercase())
                }),
                SearchQuery::Description(text) => r
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&text.to_lowercase())),
            })
            .cloned()
            .collect();
        Ok(Self::page_of(matching, skip, limit))
    }

    async fn recipes_by_ids(&self, ids: &[String]) -> Result<Vec<Recipe>, GatewayError> {
        self.checkpoint(MockOp::RecipesByIds).await;
        self.begin(MockOp::RecipesByIds)?;
        let state = self.state.lock().unwrap();
        // Storage order, not request order: the batch endpoint does not
        // guarantee ordering and silently skips missing ids.
        Ok(state
            .recipes
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn liked_recipe_ids(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<LikedIdsPage, GatewayError> {
        self.checkpoint(MockOp::LikedRecipeIds).await;
        self.begin(MockOp::LikedRecipeIds)?;
        let state = self.state.lock().unwrap();
        let ids: Vec<String> = state
            .likes
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, r)| r.clone())
            .collect();
        let total = ids.len();
        let recipe_ids = ids.into_iter().skip(skip).take(limit).collect();
        Ok(LikedIdsPage { recipe_ids, total })
    }

    async fn like_recipe(&self, user_id: &str, recipe_id: &str) -> Result<(), GatewayError> {
        self.checkpoint(MockOp::LikeRecipe).await;
        self.begin(MockOp::LikeRecipe)?;
        let mut state = self.state.lock().unwrap();
        if !state.users.iter().any(|u| u.id == user_id)
            || !state.recipes.iter().any(|r| r.id == recipe_id)
        {
            return Err(GatewayError::NotFound(
                "User or Recipe not found".to_string(),
            ));
        }
        // MERGE semantics: liking twice is not an error and stores one edge.
        if !state
            .likes
            .iter()
            .any(|(u, r)| u == user_id && r == recipe_id)
        {
            state
                .likes
                .push((user_id.to_string(), recipe_id.to_string()));
        }
        Ok(())
    }

    async fn unlike_recipe(&self, user_id: &str, recipe_id: &str) -> Result<(), GatewayError> {
        self.checkpoint(MockOp::UnlikeRecipe).await;
        self.begin(MockOp::UnlikeRecipe)?;
        let mut state = self.state.lock().unwrap();
        let before = state.likes.len();
        state
            .likes
            .retain(|(u, r)| !(u == user_id && r == recipe_id));
        if state.likes.len() == before {
            return Err(GatewayError::NotFound("Like not found".to_string()));
        }
        Ok(())
    }

    async fn like_exists(&self, user_id: &str, recipe_id: &str) -> Result<bool, GatewayError> {
        self.checkpoint(MockOp::LikeExists).await;
        self.begin(MockOp::LikeExists)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .likes
            .iter()
            .any(|(u, r)| u == user_id && r == recipe_id))
    }

    async fn like_count(&self, recipe_id: &str) -> Result<u64, GatewayError> {
        self.checkpoint(MockOp::LikeCount).await;
        self.begin(MockOp::LikeCount)?;
        let state = self.state.lock().unwrap();
        Ok(Self::likes_for_recipe(&state, recipe_id) as u64)
    }

    async fn recommendations(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<RecommendationPage, GatewayError> {
        self.checkpoint(MockOp::Recommendations).await;
        self.begin(MockOp::Recommendations)?;
        let state = self.state.lock().unwrap();
        let liked: Vec<&String> = state
            .likes
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, r)| r)
            .collect();
        let (mode, mut candidates): (RecommendationMode, Vec<Recipe>) = if liked.is_empty() {
            let mut all = state.recipes.clone();
            all.sort_by(|a, b| {
                Self::likes_for_recipe(&state, &b.id)
                    .cmp(&Self::likes_for_recipe(&state, &a.id))
                    .then_with(|| a.title.cmp(&b.title))
            });
            (RecommendationMode::Popular, all)
        } else {
            let rest = state
                .recipes
                .iter()
                .filter(|r| !liked.contains(&&r.id))
                .cloned()
                .collect();
            (RecommendationMode::Content, rest)
        };
        let total = candidates.len();
        let results: Vec<Recipe> = candidates.drain(..).skip(skip).take(limit).collect();
        Ok(RecommendationPage {
            results,
            total: Some(total),
            mode: Some(mode),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: &str, title: &str, owner: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            category: "uncategorized".to_string(),
            ingredients: Vec::new(),
            created_by: Some(RecipeAuthor {
                id: owner.to_string(),
                username: owner.to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn paginates_user_recipes_in_storage_order() {
        let gw = MockGateway::new()
            .with_user("u1", "ana")
            .with_recipe(recipe("r1", "A", "u1"))
            .with_recipe(recipe("r2", "B", "u1"))
            .with_recipe(recipe("r3", "C", "u1"));
        let page = gw.list_user_recipes("u1", 1, 2).await.unwrap();
        assert_eq!(page.total, 3);
        let titles: Vec<_> = page.results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["B", "C"]);
    }

    #[tokio::test]
    async fn scripted_failure_fires_once() {
        let gw = MockGateway::new().with_user("u1", "ana");
        gw.fail_next(MockOp::GetUser, GatewayError::Transport("down".to_string()));
        assert!(gw.get_user("u1").await.is_err());
        assert!(gw.get_user("u1").await.is_ok());
        assert_eq!(gw.call_count(MockOp::GetUser), 2);
    }

    #[tokio::test]
    async fn unlike_of_missing_like_is_not_found() {
        let gw = MockGateway::new().with_user("u1", "ana");
        let err = gw.unlike_recipe("u1", "r9").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }
}
