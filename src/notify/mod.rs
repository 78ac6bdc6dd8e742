//! External role notifications.
//!
//! Slot changes are mirrored to community roles (Discord guild roles) on a
//! detached task. Adapters never fail past their own boundary: every
//! transport error becomes `false` and a log line.

mod discord;

pub use discord::DiscordNotifier;

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

/// Grants and revokes external roles for users.
pub trait RoleNotifier: Send + Sync {
    fn grant<'a>(&'a self, user_id: &'a str, role_ref: &'a str) -> BoxFuture<'a, bool>;

    fn revoke<'a>(&'a self, user_id: &'a str, role_ref: &'a str) -> BoxFuture<'a, bool>;

    /// Operational visibility only; never consulted before a slot change.
    fn health_check(&self) -> BoxFuture<'_, bool>;
}

/// Used when no external platform is configured.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl RoleNotifier for NoopNotifier {
    fn grant<'a>(&'a self, user_id: &'a str, role_ref: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            tracing::debug!(user_id, role_ref, "Role notifications disabled, skipping grant");
            true
        })
    }

    fn revoke<'a>(&'a self, user_id: &'a str, role_ref: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            tracing::debug!(user_id, role_ref, "Role notifications disabled, skipping revoke");
            true
        })
    }

    fn health_check(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }
}

/// One external role change derived from a slot transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    Grant { user_id: String, role_ref: String },
    Revoke { user_id: String, role_ref: String },
}

impl RoleChange {
    fn describe(&self) -> (&'static str, &str, &str) {
        match self {
            RoleChange::Grant { user_id, role_ref } => ("grant", user_id, role_ref),
            RoleChange::Revoke { user_id, role_ref } => ("revoke", user_id, role_ref),
        }
    }
}

/// Run `changes` in order on a detached task, each bounded by `timeout`.
///
/// The caller may drop the handle; it is returned so tests can wait for it.
pub fn dispatch(
    notifier: Arc<dyn RoleNotifier>,
    changes: Vec<RoleChange>,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        for change in changes {
            let call = match &change {
                RoleChange::Grant { user_id, role_ref } => notifier.grant(user_id, role_ref),
                RoleChange::Revoke { user_id, role_ref } => notifier.revoke(user_id, role_ref),
            };
            let (action, user_id, role_ref) = change.describe();
            match tokio::time::timeout(timeout, call).await {
                Ok(true) => tracing::info!(action, user_id, role_ref, "Role notification sent"),
                Ok(false) => tracing::warn!(action, user_id, role_ref, "Role notification failed"),
                Err(_) => tracing::warn!(
                    action,
                    user_id,
                    role_ref,
                    timeout_ms = timeout.as_millis() as u64,
                    "Role notification timed out"
                ),
            }
        }
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every call; optionally fails or stalls.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub calls: Mutex<Vec<RoleChange>>,
        pub fail: bool,
        pub stall: Option<Duration>,
    }

    impl RecordingNotifier {
        pub fn calls(&self) -> Vec<RoleChange> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, change: RoleChange) -> BoxFuture<'_, bool> {
            Box::pin(async move {
                if let Some(stall) = self.stall {
                    tokio::time::sleep(stall).await;
                }
                self.calls.lock().unwrap().push(change);
                !self.fail
            })
        }
    }

    impl RoleNotifier for RecordingNotifier {
        fn grant<'a>(&'a self, user_id: &'a str, role_ref: &'a str) -> BoxFuture<'a, bool> {
            self.record(RoleChange::Grant {
                user_id: user_id.to_string(),
                role_ref: role_ref.to_string(),
            })
        }

        fn revoke<'a>(&'a self, user_id: &'a str, role_ref: &'a str) -> BoxFuture<'a, bool> {
            self.record(RoleChange::Revoke {
                user_id: user_id.to_string(),
                role_ref: role_ref.to_string(),
            })
        }

        fn health_check(&self) -> BoxFuture<'_, bool> {
            let healthy = !self.fail;
            Box::pin(async move { healthy })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;

    fn grant(user: &str, role_ref: &str) -> RoleChange {
        RoleChange::Grant {
            user_id: user.to_string(),
            role_ref: role_ref.to_string(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_runs_changes_in_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let changes = vec![
            RoleChange::Revoke {
                user_id: "u1".to_string(),
                role_ref: "old".to_string(),
            },
            grant("u1", "new"),
        ];

        dispatch(notifier.clone(), changes.clone(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(notifier.calls(), changes);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });

        let handle = dispatch(
            notifier.clone(),
            vec![grant("u1", "a"), grant("u2", "b")],
            Duration::from_secs(1),
        );

        assert!(handle.await.is_ok());
        assert_eq!(notifier.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_times_out_stalled_adapter() {
        let notifier = Arc::new(RecordingNotifier {
            stall: Some(Duration::from_secs(30)),
            ..Default::default()
        });

        let started = std::time::Instant::now();
        dispatch(
            notifier.clone(),
            vec![grant("u1", "a")],
            Duration::from_millis(20),
        )
        .await
        .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(notifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_noop_notifier_always_succeeds() {
        let notifier = NoopNotifier;
        assert!(notifier.grant("u1", "role").await);
        assert!(notifier.revoke("u1", "role").await);
        assert!(notifier.health_check().await);
    }
}
