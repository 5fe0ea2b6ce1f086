//! The time-bounded payment session state machine for direct transfers.
//!
//! One session reconciles a human-paced, out-of-band payment (the buyer pays
//! from a separate app) with a bounded wait:
//!
//! ```text
//! Initializing ──► Active ──► Confirmed
//!      │             │
//!      ▼             ▼
//!    Failed        Expired ──► ManualPending ──► Confirmed | Failed
//! ```
//!
//! The machine runs as a single spawned task. While `Active`, a 1-second
//! countdown and a fixed-interval status poll race inside one `select!` loop;
//! whichever fires first wins, and leaving the loop drops both timers
//! together — a dangling timer can never fire a transition after the session
//! has moved on. User actions (manual confirmation, regenerate, abort) arrive
//! as commands on an mpsc channel; the UI observes the session through a
//! watch channel of [`SessionSnapshot`]s.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::backend::{DirectTransferBackend, OrderRepository};
use crate::config::DirectTransferConfig;
use crate::events::{Event, EventSender};
use crate::models::{DirectTransferSession, PaymentStatus, USER_CONFIRMED_REF};
use crate::payments::PaymentOutcome;

/// Timing knobs for one session.
#[derive(Clone, Copy, Debug)]
pub struct SessionTiming {
    /// Payment window before the session expires.
    pub duration: Duration,
    /// Interval between automatic order-status polls.
    pub poll_interval: Duration,
}

impl SessionTiming {
    pub fn from_config(config: &DirectTransferConfig) -> Self {
        Self {
            duration: Duration::from_secs(config.session_duration_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(300),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Session lifecycle state. `Confirmed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Initializing,
    Active,
    Expired,
    /// A post-expiry manual confirmation is being verified.
    ManualPending,
    Confirmed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Confirmed | SessionState::Failed)
    }
}

/// User actions fed into the running session.
#[derive(Clone, Debug)]
pub enum SessionCommand {
    /// "I've already paid" — allowed at any time before a terminal state;
    /// expiry only stops the *automatic* poll.
    ManualConfirm { transaction_ref: Option<String> },
    /// Start over with a fresh session and deadline.
    Regenerate,
    /// Tear the session down (navigation away, component unmount).
    Abort,
}

/// What the UI renders: current state, remaining seconds, the payment
/// artifacts, and the latest retryable error, if any.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub seconds_remaining: u64,
    pub session: Option<DirectTransferSession>,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    fn initializing(seconds: u64) -> Self {
        Self {
            state: SessionState::Initializing,
            seconds_remaining: seconds,
            session: None,
            last_error: None,
        }
    }
}

/// Cloneable handle for driving and observing a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub async fn manual_confirm(&self, transaction_ref: Option<String>) {
        let _ = self
            .commands
            .send(SessionCommand::ManualConfirm { transaction_ref })
            .await;
    }

    pub async fn regenerate(&self) {
        let _ = self.commands.send(SessionCommand::Regenerate).await;
    }

    pub async fn abort(&self) {
        let _ = self.commands.send(SessionCommand::Abort).await;
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver the UI can await state changes on.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

enum Verification {
    Verified,
    Rejected,
    Unavailable(String),
}

/// One direct-transfer payment attempt for an order.
pub struct PaymentSession {
    order_id: Uuid,
    amount: Decimal,
    backend: Arc<dyn DirectTransferBackend>,
    orders: Arc<dyn OrderRepository>,
    timing: SessionTiming,
    events: EventSender,
}

impl PaymentSession {
    pub fn new(
        order_id: Uuid,
        amount: Decimal,
        backend: Arc<dyn DirectTransferBackend>,
        orders: Arc<dyn OrderRepository>,
        timing: SessionTiming,
        events: EventSender,
    ) -> Self {
        Self {
            order_id,
            amount,
            backend,
            orders,
            timing,
            events,
        }
    }

    /// Spawns the session task. The handle drives/observes it; the join
    /// handle resolves with the terminal outcome exactly once.
    pub fn spawn(self) -> (SessionHandle, tokio::task::JoinHandle<PaymentOutcome>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (snap_tx, snap_rx) = watch::channel(SessionSnapshot::initializing(
            self.timing.duration.as_secs(),
        ));
        let handle = SessionHandle {
            commands: cmd_tx,
            snapshots: snap_rx,
        };
        let join = tokio::spawn(self.run(cmd_rx, snap_tx));
        (handle, join)
    }

    #[instrument(skip_all, fields(order_id = %self.order_id))]
    async fn run(
        self,
        mut commands: mpsc::Receiver<SessionCommand>,
        snapshots: watch::Sender<SessionSnapshot>,
    ) -> PaymentOutcome {
        let mut state = SessionState::Initializing;

        'session: loop {
            // ---- Initializing ----
            // No retry loop inside the state itself; a failure is terminal
            // and the caller restarts checkout (or the buyer regenerates
            // before that, re-entering here).
            self.enter(
                &mut state,
                SessionState::Initializing,
                &snapshots,
                self.timing.duration.as_secs(),
                None,
                None,
            );

            let session = match self
                .backend
                .create_session(self.order_id, self.amount)
                .await
            {
                Ok(session) => session,
                Err(e) => {
                    warn!("Payment session initialization failed: {}", e);
                    return self
                        .fail(
                            &mut state,
                            &snapshots,
                            format!("Could not start the payment session: {}", e.buyer_message()),
                        )
                        .await;
                }
            };

            self.events
                .send_or_log(Event::PaymentSessionStarted {
                    order_id: self.order_id,
                })
                .await;

            // ---- Active ----
            let deadline = Instant::now() + self.timing.duration;
            let mut countdown = time::interval(Duration::from_secs(1));
            countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut poll = time::interval_at(
                Instant::now() + self.timing.poll_interval,
                self.timing.poll_interval,
            );
            poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

            self.enter(
                &mut state,
                SessionState::Active,
                &snapshots,
                self.timing.duration.as_secs(),
                Some(&session),
                None,
            );

            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());

                tokio::select! {
                    _ = countdown.tick() => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            // Countdown won the race; the poll interval is
                            // dropped with this loop and can fire no more.
                            break;
                        }
                        self.enter(
                            &mut state,
                            SessionState::Active,
                            &snapshots,
                            remaining.as_secs(),
                            Some(&session),
                            None,
                        );
                    }

                    _ = poll.tick() => {
                        match self.orders.payment_status(self.order_id).await {
                            Ok(PaymentStatus::Completed) => {
                                // Paid out-of-band; the pending countdown is
                                // cancelled by leaving the loop.
                                return self.confirm(&mut state, &snapshots, &session).await;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                // Transient poll failures are tolerated; the
                                // next tick tries again.
                                warn!("Order status poll failed: {}", e);
                            }
                        }
                    }

                    cmd = commands.recv() => match cmd {
                        Some(SessionCommand::ManualConfirm { transaction_ref }) => {
                            match self.verify(transaction_ref).await {
                                Verification::Verified => {
                                    return self.confirm(&mut state, &snapshots, &session).await;
                                }
                                Verification::Rejected => {
                                    return self
                                        .fail(
                                            &mut state,
                                            &snapshots,
                                            "The payment could not be verified.".to_string(),
                                        )
                                        .await;
                                }
                                Verification::Unavailable(msg) => {
                                    warn!("Manual verification unavailable: {}", msg);
                                    self.enter(
                                        &mut state,
                                        SessionState::Active,
                                        &snapshots,
                                        remaining.as_secs(),
                                        Some(&session),
                                        Some("Could not verify the payment right now. Please try again.".to_string()),
                                    );
                                }
                            }
                        }
                        Some(SessionCommand::Regenerate) => continue 'session,
                        Some(SessionCommand::Abort) | None => {
                            info!("Payment session aborted while active");
                            return PaymentOutcome::Cancelled;
                        }
                    }
                }
            }

            // ---- Expired ----
            // Automatic polling has stopped; manual confirmation and
            // regeneration remain available.
            self.enter(
                &mut state,
                SessionState::Expired,
                &snapshots,
                0,
                Some(&session),
                None,
            );
            self.events
                .send_or_log(Event::PaymentSessionExpired {
                    order_id: self.order_id,
                })
                .await;

            loop {
                match commands.recv().await {
                    Some(SessionCommand::ManualConfirm { transaction_ref }) => {
                        self.enter(
                            &mut state,
                            SessionState::ManualPending,
                            &snapshots,
                            0,
                            Some(&session),
                            None,
                        );
                        match self.verify(transaction_ref).await {
                            Verification::Verified => {
                                return self.confirm(&mut state, &snapshots, &session).await;
                            }
                            Verification::Rejected => {
                                return self
                                    .fail(
                                        &mut state,
                                        &snapshots,
                                        "The payment could not be verified.".to_string(),
                                    )
                                    .await;
                            }
                            Verification::Unavailable(msg) => {
                                warn!("Manual verification unavailable: {}", msg);
                                self.enter(
                                    &mut state,
                                    SessionState::Expired,
                                    &snapshots,
                                    0,
                                    Some(&session),
                                    Some(
                                        "Could not verify the payment right now. Please try again."
                                            .to_string(),
                                    ),
                                );
                            }
                        }
                    }
                    Some(SessionCommand::Regenerate) => continue 'session,
                    Some(SessionCommand::Abort) | None => {
                        info!("Payment session abandoned after expiry");
                        return PaymentOutcome::Cancelled;
                    }
                }
            }
        }
    }

    /// Verifies a manual payment claim with the backend. A missing or blank
    /// reference is sent as the `USER_CONFIRMED` sentinel.
    async fn verify(&self, transaction_ref: Option<String>) -> Verification {
        let reference = transaction_ref
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(USER_CONFIRMED_REF);

        match self.backend.verify_payment(self.order_id, reference).await {
            Ok(true) => Verification::Verified,
            Ok(false) => Verification::Rejected,
            Err(e) => Verification::Unavailable(e.to_string()),
        }
    }

    /// Publishes a state change. Transitions out of a terminal state are
    /// refused — a stale effect arriving after the session has finished is
    /// discarded here.
    fn enter(
        &self,
        state: &mut SessionState,
        next: SessionState,
        snapshots: &watch::Sender<SessionSnapshot>,
        seconds_remaining: u64,
        session: Option<&DirectTransferSession>,
        last_error: Option<String>,
    ) -> bool {
        if state.is_terminal() && next != *state {
            warn!(
                "Discarding stale transition {:?} -> {:?}",
                state, next
            );
            return false;
        }
        *state = next;
        let _ = snapshots.send(SessionSnapshot {
            state: next,
            seconds_remaining,
            session: session.cloned(),
            last_error,
        });
        true
    }

    /// Terminal success. The success side effects fire exactly once: the
    /// machine returns immediately after, so no later poll tick or duplicate
    /// manual confirmation can re-invoke them.
    async fn confirm(
        &self,
        state: &mut SessionState,
        snapshots: &watch::Sender<SessionSnapshot>,
        session: &DirectTransferSession,
    ) -> PaymentOutcome {
        if !self.enter(
            state,
            SessionState::Confirmed,
            snapshots,
            0,
            Some(session),
            None,
        ) {
            return PaymentOutcome::Success;
        }
        info!("Payment confirmed for order {}", self.order_id);
        self.events
            .send_or_log(Event::PaymentConfirmed {
                order_id: self.order_id,
            })
            .await;
        PaymentOutcome::Success
    }

    /// Terminal failure; fires the failure side effects exactly once.
    async fn fail(
        &self,
        state: &mut SessionState,
        snapshots: &watch::Sender<SessionSnapshot>,
        reason: String,
    ) -> PaymentOutcome {
        if !self.enter(
            state,
            SessionState::Failed,
            snapshots,
            0,
            None,
            Some(reason.clone()),
        ) {
            return PaymentOutcome::Failed { reason };
        }
        self.events
            .send_or_log(Event::PaymentFailed {
                order_id: self.order_id,
                reason: reason.clone(),
            })
            .await;
        PaymentOutcome::Failed { reason }
    }
}
