use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use skillet_core::{
    HttpGateway, IngredientInput, NewRecipe, PagedCollection, Recipe, RecipeGateway, RecipePatch,
    SearchQuery, SearchSource, Session, DEFAULT_PAGE_SIZE,
};

#[derive(Parser)]
#[command(name = "skillet")]
#[command(about = "Skillet CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered users
    Users {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
    },
    /// Show a user's recipes and liked recipes
    Profile {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// User id to browse as
        #[arg(long)]
        user: String,
        /// Number of pages to load per list
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Search recipes by category, ingredients or description
    Search {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// Exact category to match
        #[arg(long, conflicts_with_all = ["ingredients", "description"])]
        category: Option<String>,
        /// Comma-separated ingredient names
        #[arg(long, conflicts_with = "description")]
        ingredients: Option<String>,
        /// Text to match against descriptions
        #[arg(long)]
        description: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Show recommendations for a user
    Recommend {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// User id to recommend for
        #[arg(long)]
        user: String,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Show one recipe with its like state
    Show {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// User id to view as
        #[arg(long)]
        user: String,
        /// Recipe id
        recipe: String,
    },
    /// Like a recipe
    Like {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// User id liking the recipe
        #[arg(long)]
        user: String,
        /// Recipe id
        recipe: String,
    },
    /// Remove a like from a recipe
    Unlike {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// User id removing the like
        #[arg(long)]
        user: String,
        /// Recipe id
        recipe: String,
    },
    /// List known categories
    Categories {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
    },
    /// Create a recipe
    Create {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// User id creating the recipe
        #[arg(long)]
        user: String,
        /// Recipe title
        #[arg(long)]
        title: String,
        /// Recipe description
        #[arg(long)]
        description: Option<String>,
        /// Recipe category
        #[arg(long)]
        category: Option<String>,
        /// Ingredient as name[:amount[:unit]]; repeatable
        #[arg(long = "ingredient")]
        ingredients: Vec<String>,
    },
    /// Update a recipe
    Update {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// User id that owns the recipe
        #[arg(long)]
        user: String,
        /// Recipe id
        recipe: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Delete the description
        #[arg(long)]
        clear_description: bool,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// Replacement ingredient as name[:amount[:unit]]; repeatable
        #[arg(long = "ingredient")]
        ingredients: Vec<String>,
    },
    /// Delete a recipe
    Delete {
        /// Server URL (default: http://localhost:8000)
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// User id that owns the recipe
        #[arg(long)]
        user: String,
        /// Recipe id
        recipe: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Users { server } => {
            let gateway = gateway(&server)?;
            for user in gateway.list_users(0, 50).await? {
                println!("{}  {}", user.id, user.username);
            }
        }
        Commands::Profile {
            server,
            user,
            pages,
        } => {
            let session = session(&server, &user)?;
            let who = session.get_user(&user).await?;
            println!("Profile: {} ({})", who.username, who.id);
            let collections = session.collections();

            load_pages(&collections.recipes, pages).await?;
            println!(
                "\nRecipes ({} of {}):",
                collections.recipes.items().len(),
                collections.recipes.total()
            );
            print_recipes(&collections.recipes.items());

            collections.likes.reset().await?;
            for _ in 1..pages {
                if !collections.likes.load_more().await? {
                    break;
                }
            }
            println!(
                "\nLiked ({} of {}):",
                collections.likes.items().len(),
                collections.likes.total()
            );
            print_recipes(&collections.likes.items());
        }
        Commands::Search {
            server,
            category,
            ingredients,
            description,
            pages,
        } => {
            let query = match (category, ingredients, description) {
                (Some(category), _, _) => SearchQuery::Category(category),
                (_, Some(ingredients), _) => SearchQuery::ingredients_from_text(&ingredients),
                (_, _, Some(description)) => SearchQuery::Description(description),
                _ => bail!("one of --category, --ingredients or --description is required"),
            };
            let gateway = gateway(&server)?;
            let results = PagedCollection::new(
                Arc::new(SearchSource::new(gateway, query)),
                DEFAULT_PAGE_SIZE,
            );
            load_pages(&results, pages).await?;
            println!("Results ({} of {}):", results.items().len(), results.total());
            print_recipes(&results.items());
        }
        Commands::Recommend {
            server,
            user,
            pages,
        } => {
            let session = session(&server, &user)?;
            let recommendations = session.collections().recommendations.clone();
            load_pages(&recommendations, pages).await?;
            println!(
                "Recommendations ({} of {}):",
                recommendations.items().len(),
                recommendations.total()
            );
            print_recipes(&recommendations.items());
        }
        Commands::Show {
            server,
            user,
            recipe,
        } => {
            let session = session(&server, &user)?;
            let detail = session.open_recipe(&recipe).await?;
            let r = &detail.recipe;
            println!("{}  [{}]", r.title, r.category);
            if let Some(author) = &r.created_by {
                println!("by {}", author.username);
            }
            if let Some(description) = &r.description {
                println!("\n{description}");
            }
            if !r.ingredients.is_empty() {
                println!("\nIngredients:");
                for i in &r.ingredients {
                    match (i.amount, i.unit.as_deref()) {
                        (Some(amount), Some(unit)) => println!("  {} {} {}", amount, unit, i.name),
                        (Some(amount), None) => println!("  {} {}", amount, i.name),
                        _ => println!("  {}", i.name),
                    }
                }
            }
            println!(
                "\nLikes: {}{}",
                detail.toggle.count(),
                if detail.toggle.liked() {
                    "  (liked by you)"
                } else {
                    ""
                }
            );
        }
        Commands::Like {
            server,
            user,
            recipe,
        } => {
            let session = session(&server, &user)?;
            let detail = session.open_recipe(&recipe).await?;
            detail.toggle.like().await?;
            println!("Liked. {} likes now.", detail.toggle.count());
        }
        Commands::Unlike {
            server,
            user,
            recipe,
        } => {
            let session = session(&server, &user)?;
            let detail = session.open_recipe(&recipe).await?;
            detail.toggle.unlike().await?;
            println!("Unliked. {} likes now.", detail.toggle.count());
        }
        Commands::Categories { server } => {
            let gateway = gateway(&server)?;
            for category in gateway.list_categories().await? {
                println!("{category}");
            }
        }
        Commands::Create {
            server,
            user,
            title,
            description,
            category,
            ingredients,
        } => {
            let mut draft = NewRecipe::new(&title).context("title must not be blank")?;
            if let Some(description) = description {
                draft = draft.description(&description);
            }
            if let Some(category) = category {
                draft = draft.category(&category);
            }
            for spec in &ingredients {
                draft = draft.ingredient(parse_ingredient_arg(spec)?);
            }
            let session = session(&server, &user)?;
            let created = session.create_recipe(&draft).await?;
            println!("Created {}  ({})", created.title, created.id);
        }
        Commands::Update {
            server,
            user,
            recipe,
            title,
            description,
            clear_description,
            category,
            ingredients,
        } => {
            let mut patch = RecipePatch::new();
            if let Some(title) = title {
                patch = patch.title(&title);
            }
            if clear_description {
                patch = patch.clear_description();
            } else if let Some(description) = description {
                patch = patch.set_description(&description);
            }
            if let Some(category) = category {
                patch = patch.category(&category);
            }
            if !ingredients.is_empty() {
                let parsed = ingredients
                    .iter()
                    .map(|spec| parse_ingredient_arg(spec))
                    .collect::<Result<Vec<_>>>()?;
                patch = patch.ingredients(parsed);
            }
            if patch.is_empty() {
                bail!("nothing to update");
            }
            let session = session(&server, &user)?;
            let updated = session.update_recipe(&recipe, &patch).await?;
            println!("Updated {}  ({})", updated.title, updated.id);
        }
        Commands::Delete {
            server,
            user,
            recipe,
        } => {
            let session = session(&server, &user)?;
            session.delete_recipe(&recipe).await?;
            println!("Deleted {recipe}");
        }
    }

    Ok(())
}

fn gateway(server: &str) -> Result<Arc<HttpGateway>> {
    Ok(Arc::new(HttpGateway::new(server)?))
}

fn session(server: &str, user: &str) -> Result<Session> {
    Ok(Session::new(gateway(server)?, user, DEFAULT_PAGE_SIZE))
}

async fn load_pages(collection: &PagedCollection<Recipe>, pages: usize) -> Result<()> {
    collection.reset().await?;
    for _ in 1..pages {
        if !collection.load_more().await? {
            break;
        }
    }
    Ok(())
}

fn print_recipes(recipes: &[Recipe]) {
    for recipe in recipes {
        let author = recipe
            .created_by
            .as_ref()
            .map(|a| format!("  by {}", a.username))
            .unwrap_or_default();
        println!("  {}  {}  [{}]{}", recipe.id, recipe.title, recipe.category, author);
    }
}

/// Parse `name[:amount[:unit]]`, e.g. `flour:300:g` or `salt`.
fn parse_ingredient_arg(spec: &str) -> Result<IngredientInput> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().unwrap_or_default();
    let amount = parts
        .next()
        .map(|a| {
            a.parse::<f64>()
                .with_context(|| format!("invalid amount in ingredient '{spec}'"))
        })
        .transpose()?;
    let unit = parts.next();
    IngredientInput::new(name, amount, unit)
        .with_context(|| format!("invalid ingredient '{spec}': name must not be blank"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_ingredient_spec() {
        let ing = parse_ingredient_arg("flour:300:g").unwrap();
        assert_eq!(ing.name(), "flour");
        assert_eq!(ing.amount(), Some(300.0));
        assert_eq!(ing.unit(), Some("g"));
    }

    #[test]
    fn parses_name_only() {
        let ing = parse_ingredient_arg("salt").unwrap();
        assert_eq!(ing.name(), "salt");
        assert_eq!(ing.amount(), None);
        assert_eq!(ing.unit(), None);
    }

    #[test]
    fn rejects_bad_amount() {
        assert!(parse_ingredient_arg("flour:lots:g").is_err());
    }

    #[test]
    fn rejects_blank_name() {
        assert!(parse_ingredient_arg(":300:g").is_err());
    }
}
