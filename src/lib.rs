//! Lume Swipe - swipe, match and candidate feed service for the Lume dating app
//!
//! Profiles, swipes and matches live in a remote document database with no
//! transactions. Every write is a single-field patch, so concurrent swipes
//! and match writes never clobber one another.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{AccountService, CandidateBatch, CandidateFeed, MatchEngine};
pub use models::{MatchEntry, MatchOutcome, Photo, Profile, ProfileUpdate, SwipeMap};
pub use services::{DocumentStore, IdentityProvider, MediaStore, ProfileRepository, SwipeStore};
