use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::entity::profile::{self, DEFAULT_REPUTATION};

/// Source of a profile's reputation score. Must be deterministic for a given profile.
pub trait ReputationSignal: Send + Sync {
    fn score(&self, profile: &profile::Model) -> i32;
}

/// Every report filed against a user costs 20 points, floored at zero.
pub struct ReportCountSignal;

impl ReputationSignal for ReportCountSignal {
    fn score(&self, profile: &profile::Model) -> i32 {
        DEFAULT_REPUTATION
            .saturating_sub(profile.report_count.saturating_mul(20))
            .max(0)
    }
}

pub struct ReputationJob {
    db: DatabaseConnection,
    signal: Arc<dyn ReputationSignal>,
    running: Mutex<()>,
}

impl ReputationJob {
    pub fn new(db: DatabaseConnection, signal: Arc<dyn ReputationSignal>) -> Self {
        Self {
            db,
            signal,
            running: Mutex::new(()),
        }
    }

    /// Recomputes every profile and returns how many scores changed,
    /// or `None` if another run was still in progress.
    #[tracing::instrument(name = "reputation_job", skip(self))]
    pub async fn run_once(&self) -> Result<Option<usize>, DbErr> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!("previous reputation run still in progress; skipping");
            return Ok(None);
        };

        let profiles = profile::Entity::find()
            .order_by_asc(profile::Column::Id)
            .all(&self.db)
            .await?;

        let mut updated = 0;
        for model in profiles {
            let score = self.signal.score(&model);
            if score == model.reputation {
                continue;
            }

            let mut active: profile::ActiveModel = model.into();
            active.reputation = Set(score);
            active.update(&self.db).await?;
            updated += 1;
        }

        tracing::info!(updated, "reputation scores recomputed");
        Ok(Some(updated))
    }

    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if let Err(err) = self.run_once().await {
                    tracing::error!(error = %err, "reputation run failed");
                }
            }
        })
    }
}
