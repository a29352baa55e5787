//! Domain and wire types for the recipe-sharing service.

use serde::{Deserialize, Serialize, Serializer};

/// Category assigned to recipes that were created without one.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Page size the collections request unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 20;

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A user of the recipe-sharing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// Creator reference embedded in a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeAuthor {
    pub id: String,
    pub username: String,
}

/// A single ingredient line as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// A recipe as returned by the server.
///
/// Recommendation responses carry extra scoring fields per row; those are
/// ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub created_by: Option<RecipeAuthor>,
}

/// One page of an offset-paginated result set.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total: usize,
}

/// One page of liked recipe identifiers, before hydration.
#[derive(Debug, Clone, Deserialize)]
pub struct LikedIdsPage {
    #[serde(default)]
    pub recipe_ids: Vec<String>,
    #[serde(default)]
    pub total: usize,
}

/// How a recommendation page was computed server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationMode {
    /// Global popularity fallback for users with no likes.
    Popular,
    /// Content-based on the user's liked-ingredient profile.
    Content,
}

/// Canonical recommendation page shape: `{results, total, mode}`.
///
/// `total` is optional on the wire; a missing value is derived from the
/// returned page so that a short page terminates pagination.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationPage {
    #[serde(default)]
    pub results: Vec<Recipe>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub mode: Option<RecommendationMode>,
}

/// A search the server can run; each variant maps to its own endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Exact category match.
    Category(String),
    /// Recipes containing the given ingredient names.
    Ingredients(Vec<String>),
    /// Full-text match against the description.
    Description(String),
}

impl SearchQuery {
    /// Parse a comma-separated ingredient list the way the search form does:
    /// split on commas, trim, lowercase, drop empties.
    pub fn ingredients_from_text(text: &str) -> Self {
        let items = text
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        SearchQuery::Ingredients(items)
    }
}

/// An ingredient line validated for transmission.
///
/// Construction enforces the editing-boundary invariant: the name is trimmed
/// and non-empty, the amount is non-negative, and a unit is kept only when
/// the amount is present and non-zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientInput {
    pub(crate) name: String,
    pub(crate) amount: Option<f64>,
    pub(crate) unit: Option<String>,
}

impl IngredientInput {
    /// Build a validated ingredient line. Returns `None` when the name is
    /// empty after trimming, matching the form's filter.
    pub fn new(name: &str, amount: Option<f64>, unit: Option<&str>) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let amount = amount.map(|a| a.max(0.0));
        let unit = match amount {
            Some(a) if a > 0.0 => unit
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            // No amount (or zero): the unit is meaningless and must not be sent.
            _ => None,
        };
        Some(Self {
            name: name.to_string(),
            amount,
            unit,
        })
    }

    /// Revalidate a stored ingredient for transmission, e.g. when echoing a
    /// recipe back through an update.
    pub fn from_ingredient(ingredient: &Ingredient) -> Option<Self> {
        Self::new(
            &ingredient.name,
            ingredient.amount,
            ingredient.unit.as_deref(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> Option<f64> {
        self.amount
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub(crate) fn to_ingredient(&self) -> Ingredient {
        Ingredient {
            name: self.name.clone(),
            amount: self.amount,
            unit: self.unit.clone(),
        }
    }
}

/// Payload for creating a recipe.
#[derive(Debug, Clone, Serialize)]
pub struct NewRecipe {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) category: String,
    pub(crate) ingredients: Vec<IngredientInput>,
}

impl NewRecipe {
    /// Start a create payload. Returns `None` when the title is empty after
    /// trimming; the server rejects blank titles anyway.
    pub fn new(title: &str) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            description: None,
            category: DEFAULT_CATEGORY.to_string(),
            ingredients: Vec::new(),
        })
    }

    /// Set the description; blank text means "no description".
    pub fn description(mut self, description: &str) -> Self {
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description.to_string())
        };
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn ingredient(mut self, ingredient: IngredientInput) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    pub fn ingredients(mut self, ingredients: Vec<IngredientInput>) -> Self {
        self.ingredients = ingredients;
        self
    }
}

/// Three-way description change for updates.
///
/// The server distinguishes `""` (delete the description) from an omitted
/// field (leave it unchanged); this marker keeps the two cases explicit
/// instead of conflating them with an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DescriptionPatch {
    /// Leave the description unchanged (field omitted from the payload).
    #[default]
    Keep,
    /// Delete the description (sent as the empty string).
    Clear,
    /// Replace the description.
    Set(String),
}

impl DescriptionPatch {
    pub fn is_keep(&self) -> bool {
        matches!(self, DescriptionPatch::Keep)
    }
}

impl Serialize for DescriptionPatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Keep is skipped at the field level; nothing sensible to emit here.
            DescriptionPatch::Keep => serializer.serialize_none(),
            DescriptionPatch::Clear => serializer.serialize_str(""),
            DescriptionPatch::Set(text) => serializer.serialize_str(text),
        }
    }
}

/// Partial update payload for a recipe. Unset fields are omitted from the
/// wire payload and left unchanged by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecipePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) title: Option<String>,
    #[serde(skip_serializing_if = "DescriptionPatch::is_keep")]
    pub(crate) description: DescriptionPatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) ingredients: Option<Vec<IngredientInput>>,
}

impl RecipePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_keep()
            && self.category.is_none()
            && self.ingredients.is_none()
    }

    /// Set a new title; blank text is ignored rather than sent.
    pub fn title(mut self, title: &str) -> Self {
        let title = title.trim();
        if !title.is_empty() {
            self.title = Some(title.to_string());
        }
        self
    }

    pub fn set_description(mut self, description: &str) -> Self {
        self.description = DescriptionPatch::Set(description.to_string());
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = DescriptionPatch::Clear;
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn ingredients(mut self, ingredients: Vec<IngredientInput>) -> Self {
        self.ingredients = Some(ingredients);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ingredient_without_amount_drops_unit() {
        let ing = IngredientInput::new("jaja", None, Some("kom")).unwrap();
        assert_eq!(
            serde_json::to_value(&ing).unwrap(),
            json!({"name": "jaja", "amount": null, "unit": null})
        );
    }

    #[test]
    fn ingredient_with_zero_amount_drops_unit() {
        let ing = IngredientInput::new("salt", Some(0.0), Some("g")).unwrap();
        assert_eq!(ing.amount(), Some(0.0));
        assert_eq!(ing.unit(), None);
    }

    #[test]
    fn ingredient_negative_amount_clamped() {
        let ing = IngredientInput::new("flour", Some(-3.0), Some("g")).unwrap();
        assert_eq!(ing.amount(), Some(0.0));
        assert_eq!(ing.unit(), None);
    }

    #[test]
    fn ingredient_keeps_unit_with_positive_amount() {
        let ing = IngredientInput::new(" flour ", Some(300.0), Some(" g ")).unwrap();
        assert_eq!(ing.name(), "flour");
        assert_eq!(ing.unit(), Some("g"));
    }

    #[test]
    fn ingredient_blank_name_rejected() {
        assert!(IngredientInput::new("   ", Some(1.0), Some("g")).is_none());
    }

    #[test]
    fn stale_unit_dropped_when_amount_cleared() {
        // A unit entered before the amount was cleared must not survive
        // revalidation for transmission.
        let stored = Ingredient {
            name: "sugar".to_string(),
            amount: None,
            unit: Some("tbsp".to_string()),
        };
        let ing = IngredientInput::from_ingredient(&stored).unwrap();
        assert_eq!(ing.unit(), None);
        assert_eq!(
            serde_json::to_value(&ing).unwrap()["unit"],
            serde_json::Value::Null
        );
    }

    #[test]
    fn patch_omits_kept_description() {
        let patch = RecipePatch::new().title("Omlet");
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({"title": "Omlet"}));
    }

    #[test]
    fn patch_clear_description_serializes_empty_string() {
        let patch = RecipePatch::new().clear_description();
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({"description": ""}));
    }

    #[test]
    fn patch_set_description_serializes_text() {
        let patch = RecipePatch::new().set_description("Kratak opis");
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({"description": "Kratak opis"}));
    }

    #[test]
    fn recipe_category_defaults_on_deserialize() {
        let recipe: Recipe = serde_json::from_value(json!({
            "id": "r1",
            "title": "Omlet",
        }))
        .unwrap();
        assert_eq!(recipe.category, DEFAULT_CATEGORY);
        assert!(recipe.ingredients.is_empty());
        assert!(recipe.created_by.is_none());
    }

    #[test]
    fn recipe_ignores_recommendation_scoring_fields() {
        let recipe: Recipe = serde_json::from_value(json!({
            "id": "r1",
            "title": "Omlet",
            "score": 3,
            "mode": "content",
        }))
        .unwrap();
        assert_eq!(recipe.id, "r1");
    }

    #[test]
    fn ingredients_text_parsing() {
        let query = SearchQuery::ingredients_from_text(" Jaja , sir,, MLEKO ");
        assert_eq!(
            query,
            SearchQuery::Ingredients(vec![
                "jaja".to_string(),
                "sir".to_string(),
                "mleko".to_string()
            ])
        );
    }
}
