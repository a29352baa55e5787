//! Like/unlike state machine for a recipe detail view.

use std::sync::{Arc, Mutex};

use crate::error::{GatewayError, ToggleError};
use crate::gateway::RecipeGateway;

/// Point-in-time view of a toggle, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggleSnapshot {
    pub liked: bool,
    pub count: u64,
    pub busy: bool,
}

#[derive(Debug)]
struct ToggleState {
    liked: bool,
    count: u64,
    busy: bool,
}

/// Reconciles a recipe's liked flag and like count against toggle actions.
///
/// The count is an optimistic client-side adjustment: it moves by one on a
/// confirmed toggle and is not re-fetched afterwards, so it can drift from
/// server truth while other users like or unlike the same recipe. The drift
/// lasts until the detail view is reloaded; that is accepted behavior.
/// Toggling a recipe that a likes collection has already cached leaves that
/// collection stale until its next reset.
pub struct LikeToggle {
    gateway: Arc<dyn RecipeGateway>,
    user_id: String,
    recipe_id: String,
    state: Mutex<ToggleState>,
}

impl std::fmt::Debug for LikeToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LikeToggle")
            .field("user_id", &self.user_id)
            .field("recipe_id", &self.recipe_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl LikeToggle {
    /// Initialize the toggle for a recipe detail view.
    ///
    /// Fetches the recipe's like count and the current user's like flag
    /// concurrently; no toggle exists until both have resolved, so calls
    /// cannot race the initial state.
    pub async fn open(
        gateway: Arc<dyn RecipeGateway>,
        user_id: &str,
        recipe_id: &str,
    ) -> Result<Self, GatewayError> {
        let (count, liked) = tokio::try_join!(
            gateway.like_count(recipe_id),
            gateway.like_exists(user_id, recipe_id),
        )?;
        tracing::debug!(recipe_id, count, liked, "like toggle opened");
        Ok(Self {
            gateway,
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            state: Mutex::new(ToggleState {
                liked,
                count,
                busy: false,
            }),
        })
    }

    #[cfg(test)]
    fn seeded(
        gateway: Arc<dyn RecipeGateway>,
        user_id: &str,
        recipe_id: &str,
        liked: bool,
        count: u64,
    ) -> Self {
        Self {
            gateway,
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            state: Mutex::new(ToggleState {
                liked,
                count,
                busy: false,
            }),
        }
    }

    pub fn recipe_id(&self) -> &str {
        &self.recipe_id
    }

    pub fn liked(&self) -> bool {
        self.state.lock().unwrap().liked
    }

    pub fn count(&self) -> u64 {
        self.state.lock().unwrap().count
    }

    pub fn busy(&self) -> bool {
        self.state.lock().unwrap().busy
    }

    pub fn snapshot(&self) -> LikeToggleSnapshot {
        let state = self.state.lock().unwrap();
        LikeToggleSnapshot {
            liked: state.liked,
            count: state.count,
            busy: state.busy,
        }
    }

    /// Like the recipe. Valid only from the unliked state; rejected while a
    /// toggle request is in flight. On success the count goes up by one; on
    /// failure nothing changes.
    pub async fn like(&self) -> Result<(), ToggleError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.busy {
                return Err(ToggleError::Busy);
            }
            if state.liked {
                return Err(ToggleError::AlreadyLiked);
            }
            state.busy = true;
        }

        let result = self
            .gateway
            .like_recipe(&self.user_id, &self.recipe_id)
            .await;

        let mut state = self.state.lock().unwrap();
        state.busy = false;
        result?;
        state.liked = true;
        state.count += 1;
        tracing::debug!(recipe_id = %self.recipe_id, count = state.count, "liked");
        Ok(())
    }

    /// Unlike the recipe. Valid only from the liked state; symmetric to
    /// [`LikeToggle::like`]. The count decrement is floored at zero in case
    /// the server's count was already behind.
    pub async fn unlike(&self) -> Result<(), ToggleError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.busy {
                return Err(ToggleError::Busy);
            }
            if !state.liked {
                return Err(ToggleError::NotLiked);
            }
            state.busy = true;
        }

        let result = self
            .gateway
            .unlike_recipe(&self.user_id, &self.recipe_id)
            .await;

        let mut state = self.state.lock().unwrap();
        state.busy = false;
        result?;
        state.liked = false;
        state.count = state.count.saturating_sub(1);
        tracing::debug!(recipe_id = %self.recipe_id, count = state.count, "unliked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockGateway, MockOp};
    use crate::types::{Recipe, RecipeAuthor};

    fn recipe(id: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            title: format!("Recipe {id}"),
            description: None,
            category: "uncategorized".to_string(),
            ingredients: Vec::new(),
            created_by: Some(RecipeAuthor {
                id: "author".to_string(),
                username: "author".to_string(),
            }),
        }
    }

    fn seeded_gateway() -> Arc<MockGateway> {
        Arc::new(
            MockGateway::new()
                .with_user("u1", "ana")
                .with_user("u2", "boris")
                .with_user("u3", "vera")
                .with_user("u4", "miloš")
                .with_user("u5", "sara")
                .with_recipe(recipe("r1"))
                .with_like("u2", "r1")
                .with_like("u3", "r1")
                .with_like("u4", "r1")
                .with_like("u5", "r1"),
        )
    }

    #[tokio::test]
    async fn open_reads_count_and_flag() {
        let gateway = seeded_gateway();
        let toggle = LikeToggle::open(gateway, "u1", "r1").await.unwrap();
        assert_eq!(
            toggle.snapshot(),
            LikeToggleSnapshot {
                liked: false,
                count: 4,
                busy: false
            }
        );
    }

    #[tokio::test]
    async fn like_success_increments_count() {
        let gateway = seeded_gateway();
        let toggle = LikeToggle::open(gateway, "u1", "r1").await.unwrap();

        toggle.like().await.unwrap();
        assert!(toggle.liked());
        assert_eq!(toggle.count(), 5);
        assert!(!toggle.busy());
    }

    #[tokio::test]
    async fn like_failure_leaves_state_unchanged() {
        let gateway = seeded_gateway();
        let toggle = LikeToggle::open(gateway.clone(), "u1", "r1").await.unwrap();

        gateway.fail_next(
            MockOp::LikeRecipe,
            GatewayError::Transport("down".to_string()),
        );
        let err = toggle.like().await.unwrap_err();
        assert!(matches!(err, ToggleError::Gateway(GatewayError::Transport(_))));
        assert!(!toggle.liked());
        assert_eq!(toggle.count(), 4);
        assert!(!toggle.busy());

        // Busy cleared on the failure path, so the retry goes through.
        toggle.like().await.unwrap();
        assert_eq!(toggle.count(), 5);
    }

    #[tokio::test]
    async fn unlike_returns_to_previous_count() {
        let gateway = seeded_gateway();
        let toggle = LikeToggle::open(gateway, "u2", "r1").await.unwrap();
        assert!(toggle.liked());
        assert_eq!(toggle.count(), 4);

        toggle.unlike().await.unwrap();
        assert!(!toggle.liked());
        assert_eq!(toggle.count(), 3);
    }

    #[tokio::test]
    async fn unlike_floors_count_at_zero() {
        // Inconsistent server state: the like edge exists but the count
        // already reads zero.
        let gateway = Arc::new(
            MockGateway::new()
                .with_user("u1", "ana")
                .with_recipe(recipe("r1"))
                .with_like("u1", "r1"),
        );
        let toggle = LikeToggle::seeded(gateway, "u1", "r1", true, 0);

        toggle.unlike().await.unwrap();
        assert!(!toggle.liked());
        assert_eq!(toggle.count(), 0);
    }

    #[tokio::test]
    async fn like_from_liked_state_is_rejected() {
        let gateway = seeded_gateway();
        let toggle = LikeToggle::open(gateway, "u2", "r1").await.unwrap();
        assert!(matches!(toggle.like().await, Err(ToggleError::AlreadyLiked)));
        assert!(matches!(
            LikeToggle::seeded(seeded_gateway(), "u1", "r1", false, 4)
                .unlike()
                .await,
            Err(ToggleError::NotLiked)
        ));
    }

    #[tokio::test]
    async fn reentrant_like_is_rejected_while_busy() {
        let gateway = seeded_gateway();
        gateway.hold(MockOp::LikeRecipe);
        let toggle = Arc::new(LikeToggle::open(gateway.clone(), "u1", "r1").await.unwrap());

        let background = {
            let toggle = toggle.clone();
            tokio::spawn(async move { toggle.like().await })
        };
        while !toggle.busy() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(toggle.like().await, Err(ToggleError::Busy)));

        gateway.release(MockOp::LikeRecipe, 1);
        background.await.unwrap().unwrap();
        assert!(toggle.liked());
        assert_eq!(toggle.count(), 5);
    }
}
