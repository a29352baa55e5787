//! Incremental "load more" pagination for the list views.
//!
//! All list views share one accumulator shape: a growing ordered sequence
//! of items, a request-based `skip` cursor and a server-reported `total`.
//! The liked-recipes view adds the id-then-hydrate protocol on top.

mod likes;
mod paged;
mod sources;

pub use likes::LikesCollection;
pub use paged::{PageSnapshot, PageSource, PagedCollection};
pub use sources::{RecommendationsSource, SearchSource, UserRecipesSource};
