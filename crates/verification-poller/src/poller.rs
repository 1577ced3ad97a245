//! Interval and focus driven refetching of company verification state.
//!
//! A company is polled until the backend reports it `ACCEPTED`. After that the
//! company is latched: no further request is ever issued for it by this poller,
//! whether from the interval, a focus event or a direct `refetch`.

use shared_types::CompanyVerification;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::source::{PollError, VerificationSource};

/// Configuration for the verification poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// How often to refetch while the company is unresolved (default: 10 seconds)
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// What a single `refetch` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefetchOutcome {
    Fetched(CompanyVerification),
    /// Another request for the same company was already in flight.
    InFlight,
    /// The company was already accepted; nothing was requested. Carries the
    /// accepted state as first observed.
    Resolved(CompanyVerification),
}

#[derive(Debug, Default)]
struct Tracking {
    in_flight: HashSet<String>,
    accepted: HashMap<String, CompanyVerification>,
}

/// Clears the in-flight mark even when the fetch future is dropped midway.
struct InFlightGuard<'a> {
    tracking: &'a Mutex<Tracking>,
    company_id: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.tracking).in_flight.remove(self.company_id);
    }
}

fn lock(tracking: &Mutex<Tracking>) -> MutexGuard<'_, Tracking> {
    // Each update is a single insert or remove; a panic cannot leave it half done.
    tracking.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
pub struct VerificationPoller {
    source: Arc<dyn VerificationSource>,
    config: PollerConfig,
    tracking: Arc<Mutex<Tracking>>,
}

impl VerificationPoller {
    pub fn new(source: Arc<dyn VerificationSource>, config: PollerConfig) -> Self {
        Self {
            source,
            config,
            tracking: Arc::new(Mutex::new(Tracking::default())),
        }
    }

    pub fn is_resolved(&self, company_id: &str) -> bool {
        lock(&self.tracking).accepted.contains_key(company_id)
    }

    /// Fetch the current state once, unless a fetch for this company is already
    /// running or the company has been accepted.
    pub async fn refetch(&self, company_id: &str) -> Result<RefetchOutcome, PollError> {
        {
            let mut tracking = lock(&self.tracking);
            if let Some(accepted) = tracking.accepted.get(company_id) {
                return Ok(RefetchOutcome::Resolved(accepted.clone()));
            }
            if !tracking.in_flight.insert(company_id.to_string()) {
                return Ok(RefetchOutcome::InFlight);
            }
        }

        let _guard = InFlightGuard {
            tracking: &self.tracking,
            company_id,
        };

        let verification = self.source.fetch(company_id).await?;
        if verification.verification_status.is_resolved() {
            lock(&self.tracking)
                .accepted
                .insert(company_id.to_string(), verification.clone());
        }
        Ok(RefetchOutcome::Fetched(verification))
    }

    /// Start polling `company_id` in the background.
    ///
    /// Every message on `focus` triggers an immediate refetch. The task ends once
    /// the company is accepted, or when the returned handle is dropped.
    pub fn spawn(&self, company_id: impl Into<String>, focus: mpsc::Receiver<()>) -> PollerHandle {
        let company_id = company_id.into();
        let (status_tx, status_rx) = watch::channel(None);
        let poller = self.clone();

        tracing::info!(
            company_id = %company_id,
            "Starting verification polling (interval: {:?})",
            self.config.interval
        );

        let task = tokio::spawn(async move { poller.run(company_id, focus, status_tx).await });

        PollerHandle {
            status: status_rx,
            task,
        }
    }

    async fn run(
        self,
        company_id: String,
        mut focus: mpsc::Receiver<()>,
        status: watch::Sender<Option<CompanyVerification>>,
    ) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut focus_open = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                event = focus.recv(), if focus_open => {
                    if event.is_none() {
                        focus_open = false;
                        continue;
                    }
                    tracing::debug!(company_id = %company_id, "Focus refetch");
                }
            }

            match self.refetch(&company_id).await {
                Ok(RefetchOutcome::Fetched(verification)) => {
                    let resolved = verification.verification_status.is_resolved();
                    tracing::debug!(
                        company_id = %company_id,
                        status = verification.verification_status.as_str(),
                        "Verification status fetched"
                    );
                    status.send_replace(Some(verification));
                    if resolved {
                        tracing::info!(company_id = %company_id, "Company accepted, polling stopped");
                        break;
                    }
                }
                Ok(RefetchOutcome::InFlight) => {
                    tracing::debug!(company_id = %company_id, "Fetch already in flight, skipped");
                }
                Ok(RefetchOutcome::Resolved(verification)) => {
                    // Accepted through another caller; this task has not published it yet.
                    status.send_replace(Some(verification));
                    tracing::info!(company_id = %company_id, "Company accepted, polling stopped");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        company_id = %company_id,
                        "Verification fetch failed, keeping previous state: {}",
                        e
                    );
                }
            }
        }
    }
}

/// Owns a polling task. Dropping the handle stops the task.
pub struct PollerHandle {
    status: watch::Receiver<Option<CompanyVerification>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Latest observed state, `None` until the first successful fetch.
    pub fn current(&self) -> Option<CompanyVerification> {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CompanyVerification>> {
        self.status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the company to be accepted. Returns `None` if the task ended first.
    pub async fn wait_until_resolved(&mut self) -> Option<CompanyVerification> {
        self.status
            .wait_for(|state| {
                state
                    .as_ref()
                    .is_some_and(|v| v.verification_status.is_resolved())
            })
            .await
            .ok()
            .and_then(|state| (*state).clone())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared_types::VerificationStatus;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a script of answers, repeating the last one once it runs out.
    struct ScriptedSource {
        script: Mutex<VecDeque<Option<VerificationStatus>>>,
        last: Mutex<Option<VerificationStatus>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<VerificationStatus>>) -> Arc<Self> {
            Self::with_delay(script, Duration::ZERO)
        }

        fn with_delay(script: Vec<Option<VerificationStatus>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(Some(VerificationStatus::Pending)),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VerificationSource for ScriptedSource {
        async fn fetch(&self, company_id: &str) -> Result<CompanyVerification, PollError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let next = self.script.lock().unwrap().pop_front();
            let answer = match next {
                Some(answer) => {
                    *self.last.lock().unwrap() = answer;
                    answer
                }
                None => *self.last.lock().unwrap(),
            };

            match answer {
                Some(status) => Ok(CompanyVerification {
                    id: company_id.to_string(),
                    verification_status: status,
                    rejection_reason: None,
                    updated_at: None,
                }),
                None => Err(PollError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    fn poller(source: Arc<ScriptedSource>) -> VerificationPoller {
        VerificationPoller::new(
            source,
            PollerConfig {
                interval: Duration::from_secs(10),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_once_accepted() {
        use VerificationStatus::*;
        let source = ScriptedSource::new(vec![Some(Pending), Some(Rejected), Some(Accepted)]);
        let poller = poller(source.clone());
        let (focus_tx, focus_rx) = mpsc::channel(4);

        let mut handle = poller.spawn("abc-123", focus_rx);
        let resolved = handle.wait_until_resolved().await.unwrap();
        assert_eq!(resolved.verification_status, Accepted);
        assert_eq!(source.calls(), 3);

        tokio::time::sleep(Duration::from_secs(120)).await;
        let _ = focus_tx.send(()).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(source.calls(), 3);
        assert!(handle.is_finished());
        assert!(poller.is_resolved("abc-123"));
        assert!(matches!(
            poller.refetch("abc-123").await.unwrap(),
            RefetchOutcome::Resolved(v) if v.verification_status == Accepted
        ));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_triggers_refetch() {
        let source = ScriptedSource::new(vec![]);
        let poller = VerificationPoller::new(
            source.clone(),
            PollerConfig {
                interval: Duration::from_secs(3600),
            },
        );
        let (focus_tx, focus_rx) = mpsc::channel(4);
        let handle = poller.spawn("abc-123", focus_rx);
        let mut status = handle.subscribe();

        status.changed().await.unwrap();
        assert_eq!(source.calls(), 1);

        focus_tx.send(()).await.unwrap();
        status.changed().await.unwrap();
        assert_eq!(source.calls(), 2);
        assert_eq!(
            handle.current().map(|v| v.verification_status),
            Some(VerificationStatus::Pending)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refetch_is_deduplicated() {
        let source = ScriptedSource::with_delay(vec![], Duration::from_secs(5));
        let poller = poller(source.clone());

        let (first, second, other) = tokio::join!(
            poller.refetch("abc-123"),
            poller.refetch("abc-123"),
            poller.refetch("def-456"),
        );

        assert!(matches!(first.unwrap(), RefetchOutcome::Fetched(_)));
        assert_eq!(second.unwrap(), RefetchOutcome::InFlight);
        assert!(matches!(other.unwrap(), RefetchOutcome::Fetched(_)));
        assert_eq!(source.calls(), 2);

        // The mark is released once the request completes.
        assert!(matches!(
            poller.refetch("abc-123").await.unwrap(),
            RefetchOutcome::Fetched(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_state() {
        use VerificationStatus::*;
        let source = ScriptedSource::new(vec![Some(Rejected), None, Some(Accepted)]);
        let poller = poller(source.clone());
        let (_focus_tx, focus_rx) = mpsc::channel(4);
        let mut handle = poller.spawn("abc-123", focus_rx);
        let mut status = handle.subscribe();

        status.changed().await.unwrap();
        assert_eq!(
            handle.current().map(|v| v.verification_status),
            Some(Rejected)
        );

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(
            handle.current().map(|v| v.verification_status),
            Some(Rejected)
        );

        let resolved = handle.wait_until_resolved().await.unwrap();
        assert_eq!(resolved.verification_status, Accepted);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acceptance_seen_by_direct_refetch_is_published() {
        use VerificationStatus::*;
        let source = ScriptedSource::new(vec![Some(Pending), Some(Accepted)]);
        let poller = poller(source.clone());
        let (_focus_tx, focus_rx) = mpsc::channel(4);
        let mut handle = poller.spawn("abc-123", focus_rx);
        let mut status = handle.subscribe();

        status.changed().await.unwrap();
        assert_eq!(source.calls(), 1);

        // A caller outside the task sees the acceptance first.
        let outcome = poller.refetch("abc-123").await.unwrap();
        assert!(matches!(
            outcome,
            RefetchOutcome::Fetched(ref v) if v.verification_status == Accepted
        ));

        let resolved = handle.wait_until_resolved().await;
        assert_eq!(resolved.map(|v| v.verification_status), Some(Accepted));
        assert_eq!(source.calls(), 2);
        assert_eq!(
            handle.current().map(|v| v.verification_status),
            Some(Accepted)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let source = ScriptedSource::new(vec![]);
        let poller = poller(source.clone());
        let (_focus_tx, focus_rx) = mpsc::channel(4);

        let handle = poller.spawn("abc-123", focus_rx);
        let mut status = handle.subscribe();
        status.changed().await.unwrap();
        drop(handle);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 1);
    }
}
