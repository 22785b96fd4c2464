use chrono::{Local, NaiveDateTime, NaiveTime};
use teloxide::types::UserId;
use tracing::instrument;

use crate::context::QuizContext;
use crate::database::connection::RetrieveUser;
use crate::state::QuizState;

/// Access is valid strictly before midnight at the start of the expiry day.
pub async fn entitled_at<R: RetrieveUser + ?Sized>(
    registry: &R,
    admin: UserId,
    user: UserId,
    now: NaiveDateTime,
) -> bool {
    if user == admin {
        return true;
    }

    match registry.retrieve_user(user).await {
        Ok(Some(entry)) => match entry.expiry_date() {
            Ok(expiry) => {
                tracing::info!(user = user.0, exp = entry.exp_date(), "Access check: user found");
                now < expiry.and_time(NaiveTime::MIN)
            }
            Err(e) => {
                tracing::error!(user = user.0, exp = entry.exp_date(), error = %e, "Access check: corrupt expiry date");
                false
            }
        },
        Ok(None) => false,
        Err(e) => {
            tracing::error!(user = user.0, error = %e, "Access check failed");
            false
        }
    }
}

pub async fn is_entitled<R: RetrieveUser + ?Sized>(registry: &R, admin: UserId, user: UserId) -> bool {
    entitled_at(registry, admin, user, Local::now().naive_local()).await
}

/// Verdict on whether a request may move the dialogue forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Open,
    Denied,
    Busy,
}

/// Checked before any state change or background task.
#[instrument(level = "debug", skip(registry, ctx))]
pub async fn gate_request<R: RetrieveUser + ?Sized>(
    registry: &R,
    ctx: &QuizContext,
    user: UserId,
    state: &QuizState,
) -> Gate {
    if !is_entitled(registry, ctx.admin, user).await {
        return Gate::Denied;
    }
    if state.is_busy() {
        return Gate::Busy;
    }
    Gate::Open
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::error::Error;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::database::user::RegistryEntry;

    #[derive(Default)]
    pub(crate) struct FakeRegistry {
        pub(crate) entries: HashMap<UserId, String>,
        pub(crate) broken: bool,
    }

    impl FakeRegistry {
        pub(crate) fn with(entries: &[(u64, &str)]) -> Self {
            Self {
                entries: entries
                    .iter()
                    .map(|(id, exp)| (UserId(*id), exp.to_string()))
                    .collect(),
                broken: false,
            }
        }
    }

    #[async_trait]
    impl RetrieveUser for FakeRegistry {
        async fn retrieve_user(
            &self,
            id: UserId,
        ) -> Result<Option<RegistryEntry>, Box<dyn Error + Send + Sync>> {
            if self.broken {
                return Err("database is locked".into());
            }
            Ok(self.entries.get(&id).map(|exp| RegistryEntry::new(id, exp.clone())))
        }

        async fn retrieve_all_users(&self) -> Result<Vec<RegistryEntry>, Box<dyn Error + Send + Sync>> {
            Ok(self
                .entries
                .iter()
                .map(|(id, exp)| RegistryEntry::new(*id, exp.clone()))
                .collect())
        }
    }

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    const ADMIN: UserId = UserId(1);

    #[tokio::test]
    async fn admin_is_always_entitled() {
        let registry = FakeRegistry {
            broken: true,
            ..Default::default()
        };

        assert!(entitled_at(&registry, ADMIN, ADMIN, noon(2026, 1, 1)).await);
    }

    #[tokio::test]
    async fn expiry_is_compared_with_now() {
        let registry = FakeRegistry::with(&[(2, "2026-03-10")]);

        assert!(entitled_at(&registry, ADMIN, UserId(2), noon(2026, 3, 9)).await);
        assert!(!entitled_at(&registry, ADMIN, UserId(2), noon(2026, 3, 10)).await);
        assert!(!entitled_at(&registry, ADMIN, UserId(2), noon(2027, 1, 1)).await);
    }

    #[tokio::test]
    async fn unknown_corrupt_or_unreadable_means_not_entitled() {
        let registry = FakeRegistry::with(&[(3, "tomorrow")]);
        assert!(!entitled_at(&registry, ADMIN, UserId(3), noon(2026, 1, 1)).await);
        assert!(!entitled_at(&registry, ADMIN, UserId(4), noon(2026, 1, 1)).await);

        let broken = FakeRegistry {
            broken: true,
            ..FakeRegistry::with(&[(2, "2099-01-01")])
        };
        assert!(!entitled_at(&broken, ADMIN, UserId(2), noon(2026, 1, 1)).await);
    }

    #[tokio::test]
    async fn gate_verdicts_for_denied_open_and_busy() {
        let registry = FakeRegistry::default();
        let ctx = QuizContext::new(ADMIN, None, Duration::from_secs(5));

        assert_eq!(
            gate_request(&registry, &ctx, UserId(77), &QuizState::Idle).await,
            Gate::Denied
        );
        assert_eq!(
            gate_request(&registry, &ctx, ADMIN, &QuizState::Idle).await,
            Gate::Open
        );
        assert_eq!(
            gate_request(
                &registry,
                &ctx,
                ADMIN,
                &QuizState::Generating {
                    topic: "Python".into()
                }
            )
            .await,
            Gate::Busy
        );
    }
}
