//! HTTP implementation of the recipe gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::gateway::RecipeGateway;
use crate::types::{
    LikedIdsPage, NewRecipe, Page, Recipe, RecipePatch, RecommendationPage, SearchQuery, User,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("skillet/", env!("CARGO_PKG_VERSION"));

/// Configuration for [`HttpGateway`].
#[derive(Clone)]
pub struct HttpGatewayBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl HttpGatewayBuilder {
    /// Create a builder pointing at the server's base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Build the gateway, validating the base URL.
    pub fn build(self) -> Result<HttpGateway, GatewayError> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            GatewayError::Transport(format!("invalid base URL {}: {}", self.base_url, e))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(GatewayError::Transport(format!(
                "unsupported base URL scheme: {}",
                base.scheme()
            )));
        }
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?;
        Ok(HttpGateway { inner, base })
    }
}

/// Production gateway speaking JSON over HTTP.
///
/// Error bodies carry a `detail` message which is surfaced verbatim; 404
/// maps to [`GatewayError::NotFound`], other 4xx to
/// [`GatewayError::Validation`], everything else to
/// [`GatewayError::Transport`].
pub struct HttpGateway {
    /// Shared reqwest client for connection pooling.
    inner: reqwest::Client,
    base: Url,
}

impl HttpGateway {
    /// Create a gateway with default configuration.
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        HttpGatewayBuilder::new(base_url).build()
    }

    /// Get a builder for custom configuration.
    pub fn builder(base_url: &str) -> HttpGatewayBuilder {
        HttpGatewayBuilder::new(base_url)
    }

    /// Join percent-encoded path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // The base is validated http(s), which is never cannot-be-a-base.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn paged(&self, segments: &[&str], skip: usize, limit: usize) -> Url {
        let mut url = self.endpoint(segments);
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GatewayError> {
        tracing::debug!(url = %url, "GET");
        let response = self.inner.get(url).send().await?;
        Self::parse_json(response).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<T, GatewayError> {
        tracing::debug!(url = %url, method = %method, "request");
        let response = self.inner.request(method, url).json(body).send().await?;
        Self::parse_json(response).await
    }

    async fn send_no_content<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<(), GatewayError> {
        tracing::debug!(url = %url, method = %method, "request");
        let mut request = self.inner.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for(status, response).await);
        }
        Ok(())
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for(status, response).await);
        }
        Ok(response.json::<T>().await?)
    }

    /// Map a non-success response to the error taxonomy, pulling the
    /// server's `detail` message out of the body when there is one.
    async fn error_for(status: StatusCode, response: Response) -> GatewayError {
        let fallback = format!("HTTP {}", status.as_u16());
        let message = match response.text().await {
            Ok(body) if !body.trim().is_empty() => {
                match serde_json::from_str::<serde_json::Value>(&body) {
                    Ok(value) => match value.get("detail") {
                        Some(serde_json::Value::String(detail)) => detail.clone(),
                        Some(other) => other.to_string(),
                        None => value.to_string(),
                    },
                    Err(_) => body,
                }
            }
            _ => fallback.clone(),
        };
        tracing::debug!(status = status.as_u16(), message = %message, "request failed");
        if status == StatusCode::NOT_FOUND {
            GatewayError::NotFound(message)
        } else if status.is_client_error() {
            GatewayError::Validation(message)
        } else if message == fallback {
            GatewayError::Transport(fallback)
        } else {
            GatewayError::Transport(format!("{}: {}", fallback, message))
        }
    }
}

#[derive(Deserialize)]
struct Results<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct ExistsBody {
    exists: bool,
}

#[derive(Deserialize)]
struct LikesBody {
    likes: u64,
}

#[derive(Serialize)]
struct LikeBody<'a> {
    user_id: &'a str,
    recipe_id: &'a str,
}

#[derive(Serialize)]
struct IdsBody<'a> {
    ids: &'a [String],
}

#[async_trait]
impl RecipeGateway for HttpGateway {
    async fn list_users(&self, skip: usize, limit: usize) -> Result<Vec<User>, GatewayError> {
        let url = self.paged(&["users"], skip, limit);
        let body: Results<User> = self.get_json(url).await?;
        Ok(body.results)
    }

    async fn get_user(&self, user_id: &str) -> Result<User, GatewayError> {
        self.get_json(self.endpoint(&["users", user_id])).await
    }

    async fn list_user_recipes(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Page<Recipe>, GatewayError> {
        let url = self.paged(&["users", user_id, "recipes"], skip, limit);
        self.get_json(url).await
    }

    async fn create_recipe(
        &self,
        user_id: &str,
        draft: &NewRecipe,
    ) -> Result<Recipe, GatewayError> {
        let url = self.endpoint(&["users", user_id, "recipes"]);
        self.send_json(Method::POST, url, draft).await
    }

    async fn update_recipe(
        &self,
        user_id: &str,
        recipe_id: &str,
        patch: &RecipePatch,
    ) -> Result<Recipe, GatewayError> {
        let url = self.endpoint(&["users", user_id, "recipes", recipe_id]);
        self.send_json(Method::PATCH, url, patch).await
    }

    async fn delete_recipe(&self, user_id: &str, recipe_id: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(&["users", user_id, "recipes", recipe_id]);
        self.send_no_content::<()>(Method::DELETE, url, None).await
    }

    async fn get_recipe(&self, recipe_id: &str) -> Result<Recipe, GatewayError> {
        self.get_json(self.endpoint(&["recipes", recipe_id])).await
    }

    async fn list_categories(&self) -> Result<Vec<String>, GatewayError> {
        let body: Results<String> = self.get_json(self.endpoint(&["categories"])).await?;
        Ok(body.results)
    }

    async fn search_recipes(
        &self,
        query: &SearchQuery,
        skip: usize,
        limit: usize,
    ) -> Result<Page<Recipe>, GatewayError> {
        let mut url = match query {
            SearchQuery::Category(category) => {
                let mut url = self.endpoint(&["recipes", "search_by_category"]);
                url.query_pairs_mut().append_pair("category", category);
                url
            }
            SearchQuery::Ingredients(items) => {
                let mut url = self.endpoint(&["recipes", "search"]);
                {
                    let mut pairs = url.query_pairs_mut();
                    for item in items {
                        pairs.append_pair("ingredients", item);
                    }
                }
                url
            }
            SearchQuery::Description(text) => {
                let mut url = self.endpoint(&["recipes", "search_by_description"]);
                url.query_pairs_mut().append_pair("q", text);
                url
            }
        };
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());
        self.get_json(url).await
    }

    async fn recipes_by_ids(&self, ids: &[String]) -> Result<Vec<Recipe>, GatewayError> {
        let url = self.endpoint(&["recipes", "by_ids"]);
        let body: Results<Recipe> = self
            .send_json(Method::POST, url, &IdsBody { ids })
            .await?;
        Ok(body.results)
    }

    async fn liked_recipe_ids(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<LikedIdsPage, GatewayError> {
        let url = self.paged(&["likes", "users", user_id, "ids"], skip, limit);
        self.get_json(url).await
    }

    async fn like_recipe(&self, user_id: &str, recipe_id: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(&["likes"]);
        // 201 with a body we don't need anything from.
        let response = self
            .inner
            .post(url)
            .json(&LikeBody { user_id, recipe_id })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for(status, response).await);
        }
        Ok(())
    }

    async fn unlike_recipe(&self, user_id: &str, recipe_id: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(&["likes"]);
        self.send_no_content(Method::DELETE, url, Some(&LikeBody { user_id, recipe_id }))
            .await
    }

    async fn like_exists(&self, user_id: &str, recipe_id: &str) -> Result<bool, GatewayError> {
        let mut url = self.endpoint(&["likes", "exists"]);
        url.query_pairs_mut()
            .append_pair("user_id", user_id)
            .append_pair("recipe_id", recipe_id);
        let body: ExistsBody = self.get_json(url).await?;
        Ok(body.exists)
    }

    async fn like_count(&self, recipe_id: &str) -> Result<u64, GatewayError> {
        let url = self.endpoint(&["recipes", recipe_id, "likes_count"]);
        let body: LikesBody = self.get_json(url).await?;
        Ok(body.likes)
    }

    async fn recommendations(
        &self,
        user_id: &str,
        skip: usize,
        limit: usize,
    ) -> Result<RecommendationPage, GatewayError> {
        let url = self.paged(&["recommendations", user_id], skip, limit);
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(base).unwrap()
    }

    #[test]
    fn endpoint_joins_and_encodes_segments() {
        let gw = gateway("http://localhost:8000");
        let url = gw.endpoint(&["users", "id with space", "recipes"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/users/id%20with%20space/recipes"
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash_on_base() {
        let gw = gateway("http://localhost:8000/api/");
        let url = gw.endpoint(&["categories"]);
        assert_eq!(url.as_str(), "http://localhost:8000/api/categories");
    }

    #[test]
    fn paged_appends_cursor_parameters() {
        let gw = gateway("http://localhost:8000");
        let url = gw.paged(&["users", "u1", "recipes"], 20, 20);
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/users/u1/recipes?skip=20&limit=20"
        );
    }

    #[test]
    fn ingredient_search_repeats_query_parameter() {
        let gw = gateway("http://localhost:8000");
        let mut url = gw.endpoint(&["recipes", "search"]);
        {
            let mut pairs = url.query_pairs_mut();
            for item in ["jaja", "beli luk"] {
                pairs.append_pair("ingredients", item);
            }
        }
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/recipes/search?ingredients=jaja&ingredients=beli+luk"
        );
    }

    #[test]
    fn builder_rejects_non_http_base() {
        assert!(HttpGateway::new("ftp://example.com").is_err());
        assert!(HttpGateway::new("not a url").is_err());
    }
}
