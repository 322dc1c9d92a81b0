use std::sync::Arc;
use thiserror::Error;

use crate::models::{MatchEntry, MatchOutcome, Profile, ReconcileReport};
use crate::services::matches::MatchStore;
use crate::services::profiles::{ProfileError, ProfileRepository};
use crate::services::store::StoreError;
use crate::services::swipes::SwipeStore;

/// Errors that abort swipe processing or reconciliation
#[derive(Debug, Error)]
pub enum EngineError {
    /// The swipe was not persisted; no reciprocity check ran
    #[error("Failed to record swipe: {0}")]
    Swipe(#[source] StoreError),

    /// The swipe was persisted but the other side could not be read
    #[error("Failed to check reciprocity: {0}")]
    Reciprocity(#[source] StoreError),

    #[error("A profile cannot swipe on itself")]
    SelfSwipe,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Swipe recording and match detection
///
/// # Pipeline
/// 1. Persist the swipe (single-record create-or-update)
/// 2. Dislikes stop here
/// 3. Read the candidate's decision about the actor
/// 4. On a reciprocal like, write one match entry under each party whose
///    counterpart has a photo
///
/// Steps run strictly in sequence: the reciprocity read is only issued once
/// the swipe write has completed. The two entry writes are independent and
/// not rolled back if only one of them succeeds.
pub struct MatchEngine {
    swipes: Arc<dyn SwipeStore>,
    matches: Arc<MatchStore>,
    profiles: Arc<ProfileRepository>,
}

impl MatchEngine {
    pub fn new(
        swipes: Arc<dyn SwipeStore>,
        matches: Arc<MatchStore>,
        profiles: Arc<ProfileRepository>,
    ) -> Self {
        Self {
            swipes,
            matches,
            profiles,
        }
    }

    /// Record `actor`'s decision about `candidate` and detect a match
    pub async fn process_swipe(
        &self,
        actor: &Profile,
        candidate: &Profile,
        liked: bool,
    ) -> Result<MatchOutcome, EngineError> {
        if actor.uid == candidate.uid {
            return Err(EngineError::SelfSwipe);
        }

        self.swipes
            .record_swipe(&actor.uid, &candidate.uid, liked)
            .await
            .map_err(EngineError::Swipe)?;

        if !liked {
            tracing::debug!("{} disliked {}", actor.uid, candidate.uid);
            return Ok(MatchOutcome::NoMatch);
        }

        let reciprocal = self
            .swipes
            .decision(&candidate.uid, &actor.uid)
            .await
            .map_err(EngineError::Reciprocity)?;

        if reciprocal != Some(true) {
            tracing::debug!("{} liked {}, not reciprocated", actor.uid, candidate.uid);
            return Ok(MatchOutcome::NoMatch);
        }

        tracing::info!("Match between {} and {}", actor.uid, candidate.uid);
        Ok(self.write_pair(actor, candidate).await)
    }

    /// Whether `a` and `b` have both liked each other, per the swipe store
    pub async fn is_matched(&self, a: &str, b: &str) -> Result<bool, EngineError> {
        if self.swipes.decision(a, b).await? != Some(true) {
            return Ok(false);
        }
        Ok(self.swipes.decision(b, a).await? == Some(true))
    }

    /// Match list of `owner_id`
    pub async fn matches_for(&self, owner_id: &str) -> Result<Vec<MatchEntry>, EngineError> {
        Ok(self.matches.list(owner_id).await?)
    }

    /// Write the match entries of a confirmed match.
    ///
    /// An entry shows the other party's photo, so a side whose counterpart
    /// has no photo is left missing while the other side is still written.
    async fn write_pair(&self, actor: &Profile, candidate: &Profile) -> MatchOutcome {
        let for_actor = MatchEntry::from_profile(candidate);
        let for_candidate = MatchEntry::from_profile(actor);

        let (actor_write, candidate_write) = tokio::join!(
            self.put_entry(&actor.uid, for_actor.as_ref()),
            self.put_entry(&candidate.uid, for_candidate.as_ref()),
        );

        let mut written = Vec::new();
        let mut missing = Vec::new();
        for (owner, result) in [(&actor.uid, actor_write), (&candidate.uid, candidate_write)] {
            match result {
                Some(Ok(())) => written.push(owner.clone()),
                Some(Err(e)) => {
                    tracing::error!("Failed to store match entry for {}: {}", owner, e);
                    missing.push(owner.clone());
                }
                None => missing.push(owner.clone()),
            }
        }

        let without_photo: Vec<String> = [actor, candidate]
            .iter()
            .filter(|p| p.photos.is_empty())
            .map(|p| p.uid.clone())
            .collect();
        if !without_photo.is_empty() {
            tracing::warn!(
                "Match {} <-> {} stored for {:?} only, no photo for {:?}",
                actor.uid,
                candidate.uid,
                written,
                without_photo
            );
            return MatchOutcome::MatchedWithoutAvatar {
                without_photo,
                written,
                missing,
            };
        }

        match for_actor {
            Some(entry) if missing.is_empty() => MatchOutcome::Matched { entry },
            _ => MatchOutcome::PartiallyMatched { written, missing },
        }
    }

    /// Store `entry` under `owner_id`; `None` when there is no entry to store
    async fn put_entry(
        &self,
        owner_id: &str,
        entry: Option<&MatchEntry>,
    ) -> Option<Result<(), StoreError>> {
        match entry {
            Some(entry) => Some(self.matches.put(owner_id, entry).await),
            None => None,
        }
    }

    /// Re-derive `actor_id`'s matches from the swipe store and write any
    /// match entry that is missing on either side.
    pub async fn reconcile(&self, actor_id: &str) -> Result<ReconcileReport, EngineError> {
        let swipes = self.swipes.swipe_map(actor_id).await?;

        let mut liked: Vec<String> = swipes
            .into_iter()
            .filter_map(|(candidate_id, liked)| liked.then_some(candidate_id))
            .collect();
        liked.sort();

        let mut report = ReconcileReport::default();
        let mut actor: Option<Profile> = None;

        for candidate_id in liked {
            report.checked += 1;

            if self.swipes.decision(&candidate_id, actor_id).await? != Some(true) {
                continue;
            }

            let actor_has = self.matches.contains(actor_id, &candidate_id).await?;
            let candidate_has = self.matches.contains(&candidate_id, actor_id).await?;
            if actor_has && candidate_has {
                continue;
            }

            if actor.is_none() {
                actor = Some(self.profiles.get(actor_id).await?);
            }
            let Some(actor_profile) = actor.as_ref() else {
                continue;
            };

            let candidate = match self.profiles.get(&candidate_id).await {
                Ok(profile) => profile,
                Err(ProfileError::NotFound(_)) => {
                    tracing::warn!("Matched profile {} no longer exists", candidate_id);
                    if !actor_has {
                        report.unresolved.push((actor_id.to_string(), candidate_id.clone()));
                    }
                    if !candidate_has {
                        report.unresolved.push((candidate_id.clone(), actor_id.to_string()));
                    }
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if !actor_has {
                self.repair(actor_profile, &candidate, &mut report).await;
            }
            if !candidate_has {
                self.repair(&candidate, actor_profile, &mut report).await;
            }
        }

        tracing::info!(
            "Reconciled {}: checked {}, repaired {}, unresolved {}",
            actor_id,
            report.checked,
            report.repaired.len(),
            report.unresolved.len()
        );

        Ok(report)
    }

    /// Write `other`'s entry into `owner`'s match list
    async fn repair(&self, owner: &Profile, other: &Profile, report: &mut ReconcileReport) {
        let pair = (owner.uid.clone(), other.uid.clone());

        let Some(entry) = MatchEntry::from_profile(other) else {
            tracing::debug!("Cannot repair {} -> {}, no photo", owner.uid, other.uid);
            report.unresolved.push(pair);
            return;
        };

        match self.matches.put(&owner.uid, &entry).await {
            Ok(()) => report.repaired.push(pair),
            Err(e) => {
                tracing::warn!("Repair of {} -> {} failed: {}", owner.uid, other.uid, e);
                report.unresolved.push(pair);
            }
        }
    }
}
