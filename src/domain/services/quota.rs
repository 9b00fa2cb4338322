use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::domain::models::enrollment::Enrollment;
use crate::domain::models::quota::{month_key, monthly_allowance};
use crate::domain::ports::QuotaRepository;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuotaUsage {
    pub allowed: i32,
    pub used: i32,
    pub over_quota: bool,
}

/// Monthly adjustment quota per (actor, enrollment). Over-quota is reported,
/// not blocked: the policy decision stays with the caller. When the counter
/// store is unreachable the counter degrades to "never over quota" so the
/// primary workflow keeps running.
pub struct QuotaService {
    repo: Arc<dyn QuotaRepository>,
}

impl QuotaService {
    pub fn new(repo: Arc<dyn QuotaRepository>) -> Self {
        Self { repo }
    }

    pub async fn consume_on_apply(
        &self,
        actor_type: &str,
        actor_id: &str,
        enrollment: &Enrollment,
        date: NaiveDate,
    ) -> QuotaUsage {
        let allowed = monthly_allowance(enrollment.total_sessions);
        match self
            .try_consume(actor_type, actor_id, &enrollment.id, date, allowed)
            .await
        {
            Ok(usage) => usage,
            Err(e) => {
                warn!(
                    actor_id,
                    enrollment_id = %enrollment.id,
                    "quota counter unavailable, degrading to not-over-quota: {:?}",
                    e
                );
                QuotaUsage {
                    allowed,
                    used: 0,
                    over_quota: false,
                }
            }
        }
    }

    async fn try_consume(
        &self,
        actor_type: &str,
        actor_id: &str,
        enrollment_id: &str,
        date: NaiveDate,
        allowed: i32,
    ) -> Result<QuotaUsage, AppError> {
        let key = month_key(date);
        let counter = self
            .repo
            .find_or_create(actor_type, actor_id, enrollment_id, &key, allowed)
            .await?;
        let used = self.repo.increment(&counter.id).await?;
        Ok(QuotaUsage {
            // The row's allowance is authoritative: it was frozen at first use
            // for the month and may differ from a freshly derived value.
            allowed: counter.allowed,
            used,
            over_quota: used > counter.allowed,
        })
    }

    /// Undoes a consumed unit when the adjustment request is rejected or
    /// cancelled. The counter row is looked up by the month the request was
    /// applied in, not the current month.
    pub async fn rollback(
        &self,
        actor_type: &str,
        actor_id: &str,
        enrollment: &Enrollment,
        applied_on: NaiveDate,
    ) {
        let allowed = monthly_allowance(enrollment.total_sessions);
        let key = month_key(applied_on);
        let result = async {
            let counter = self
                .repo
                .find_or_create(actor_type, actor_id, &enrollment.id, &key, allowed)
                .await?;
            self.repo.decrement(&counter.id).await
        }
        .await;
        if let Err(e) = result {
            warn!(
                actor_id,
                enrollment_id = %enrollment.id,
                "quota rollback failed, leaving counter as-is: {:?}",
                e
            );
        }
    }
}
