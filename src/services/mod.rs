// Service exports
pub mod appwrite;
pub mod cache;
pub mod identity;
pub mod matches;
pub mod media;
pub mod postgres;
pub mod profiles;
pub mod store;
pub mod swipes;

pub use appwrite::{AppwriteClient, AppwriteError};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use identity::{IdentityError, IdentityProvider, JwtIdentity, StaticIdentity};
pub use matches::MatchStore;
pub use media::{delete_best_effort, DeleteOutcome, InMemoryMediaStore, MediaError, MediaStore, StoredMedia};
pub use postgres::{PostgresError, PostgresSwipeStore};
pub use profiles::{AgeBounds, ProfileError, ProfileRepository};
pub use store::{pair_document_id, Document, DocumentStore, InMemoryDocumentStore, RangeQuery, StoreError};
pub use swipes::{DocumentSwipeStore, SwipeStore};
