//! The active user and the collections that belong to them.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::collections::{
    LikesCollection, PagedCollection, RecommendationsSource, SearchSource, UserRecipesSource,
};
use crate::error::GatewayError;
use crate::gateway::RecipeGateway;
use crate::like_toggle::LikeToggle;
use crate::types::{NewRecipe, Recipe, RecipePatch, SearchQuery, User};

/// The three per-user list views, built together when a user becomes active.
pub struct UserCollections {
    user_id: String,
    /// Recipes the user created.
    pub recipes: Arc<PagedCollection<Recipe>>,
    /// Recipes the user liked, hydrated from id pages.
    pub likes: Arc<LikesCollection>,
    /// Per-user recommendations.
    pub recommendations: Arc<PagedCollection<Recipe>>,
}

impl UserCollections {
    fn new(gateway: Arc<dyn RecipeGateway>, user_id: &str, page_size: usize) -> Self {
        Self {
            user_id: user_id.to_string(),
            recipes: Arc::new(PagedCollection::new(
                Arc::new(UserRecipesSource::new(gateway.clone(), user_id)),
                page_size,
            )),
            likes: Arc::new(LikesCollection::new(gateway.clone(), user_id, page_size)),
            recommendations: Arc::new(PagedCollection::new(
                Arc::new(RecommendationsSource::new(gateway, user_id)),
                page_size,
            )),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// A recipe detail view: the record plus its like toggle.
#[derive(Debug)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub toggle: LikeToggle,
}

/// Client session: tracks the active user and owns their collections.
///
/// Switching users replaces the whole [`UserCollections`] set at once, so
/// views never observe one user's recipes next to another user's likes. A
/// load that was in flight for the previous user resolves against the
/// discarded collection set and never touches the new one.
pub struct Session {
    gateway: Arc<dyn RecipeGateway>,
    page_size: usize,
    user_tx: watch::Sender<String>,
    collections: Mutex<Arc<UserCollections>>,
}

impl Session {
    pub fn new(gateway: Arc<dyn RecipeGateway>, user_id: &str, page_size: usize) -> Self {
        let (user_tx, _) = watch::channel(user_id.to_string());
        let collections = Mutex::new(Arc::new(UserCollections::new(
            gateway.clone(),
            user_id,
            page_size,
        )));
        Self {
            gateway,
            page_size,
            user_tx,
            collections,
        }
    }

    pub fn current_user(&self) -> String {
        self.user_tx.borrow().clone()
    }

    /// Watch the active user id; fires on every switch.
    pub fn subscribe_user(&self) -> watch::Receiver<String> {
        self.user_tx.subscribe()
    }

    /// The active user's collection set. Cheap to call; holds no lock across
    /// awaits.
    pub fn collections(&self) -> Arc<UserCollections> {
        self.collections.lock().unwrap().clone()
    }

    /// Make `user_id` the active user. A no-op when the user is unchanged;
    /// otherwise every collection starts over empty for the new user.
    pub fn set_user(&self, user_id: &str) {
        {
            let mut collections = self.collections.lock().unwrap();
            if collections.user_id() == user_id {
                return;
            }
            tracing::debug!(user_id, "switching active user");
            *collections = Arc::new(UserCollections::new(
                self.gateway.clone(),
                user_id,
                self.page_size,
            ));
        }
        self.user_tx.send_replace(user_id.to_string());
    }

    /// Start a new search. Each submitted query gets a fresh collection;
    /// pagination state never leaks between queries.
    pub fn search(&self, query: SearchQuery) -> PagedCollection<Recipe> {
        PagedCollection::new(
            Arc::new(SearchSource::new(self.gateway.clone(), query)),
            self.page_size,
        )
    }

    /// Open a recipe detail view: fetch the record and initialize its like
    /// toggle for the active user, concurrently.
    pub async fn open_recipe(&self, recipe_id: &str) -> Result<RecipeDetail, GatewayError> {
        let user_id = self.current_user();
        let (recipe, toggle) = tokio::try_join!(
            self.gateway.get_recipe(recipe_id),
            LikeToggle::open(self.gateway.clone(), &user_id, recipe_id),
        )?;
        Ok(RecipeDetail { recipe, toggle })
    }

    /// Create a recipe as the active user. The own-recipes collection is
    /// stale afterwards until its next `reset`.
    pub async fn create_recipe(&self, draft: &NewRecipe) -> Result<Recipe, GatewayError> {
        self.gateway
            .create_recipe(&self.current_user(), draft)
            .await
    }

    pub async fn update_recipe(
        &self,
        recipe_id: &str,
        patch: &RecipePatch,
    ) -> Result<Recipe, GatewayError> {
        self.gateway
            .update_recipe(&self.current_user(), recipe_id, patch)
            .await
    }

    pub async fn delete_recipe(&self, recipe_id: &str) -> Result<(), GatewayError> {
        self.gateway
            .delete_recipe(&self.current_user(), recipe_id)
            .await
    }

    pub async fn list_users(&self, skip: usize, limit: usize) -> Result<Vec<User>, GatewayError> {
        self.gateway.list_users(skip, limit).await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, GatewayError> {
        self.gateway.get_user(user_id).await
    }

    pub async fn list_categories(&self) -> Result<Vec<String>, GatewayError> {
        self.gateway.list_categories().await
    }
}
