pub mod collections;
pub mod error;
pub mod gateway;
pub mod like_toggle;
pub mod session;
pub mod types;

pub use collections::{
    LikesCollection, PageSnapshot, PageSource, PagedCollection, RecommendationsSource,
    SearchSource, UserRecipesSource,
};
pub use error::{GatewayError, ToggleError};
pub use gateway::{HttpGateway, HttpGatewayBuilder, MockGateway, MockOp, RecipeGateway};
pub use like_toggle::{LikeToggle, LikeToggleSnapshot};
pub use session::{RecipeDetail, Session, UserCollections};
pub use types::{
    DescriptionPatch, Ingredient, IngredientInput, LikedIdsPage, NewRecipe, Page, Recipe,
    RecipeAuthor, RecipePatch, RecommendationMode, RecommendationPage, SearchQuery, User,
    DEFAULT_CATEGORY, DEFAULT_PAGE_SIZE,
};
