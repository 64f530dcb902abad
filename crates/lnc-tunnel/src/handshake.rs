//! Handshake callback signals.
//!
//! The relay reports two events from its own execution context: the
//! counterparty's static key, and the authentication payload. Each is a
//! single-assignment slot backed by a oneshot channel; the negotiation
//! awaits both with a ceiling and proceeds with whatever arrived.

use lnc_core::{LncError, LncResult, RequestContext};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

type Slot = Arc<Mutex<Option<oneshot::Sender<Vec<u8>>>>>;

/// Writer half, handed to the relay library.
#[derive(Clone)]
pub struct HandshakeCallbacks {
    remote_key: Slot,
    auth_data: Slot,
}

/// Reader half, kept by the negotiation.
pub struct HandshakeWaiter {
    remote_key: oneshot::Receiver<Vec<u8>>,
    auth_data: oneshot::Receiver<Vec<u8>>,
}

pub fn handshake_signals() -> (HandshakeCallbacks, HandshakeWaiter) {
    let (key_tx, key_rx) = oneshot::channel();
    let (auth_tx, auth_rx) = oneshot::channel();
    (
        HandshakeCallbacks {
            remote_key: Arc::new(Mutex::new(Some(key_tx))),
            auth_data: Arc::new(Mutex::new(Some(auth_tx))),
        },
        HandshakeWaiter {
            remote_key: key_rx,
            auth_data: auth_rx,
        },
    )
}

fn fire(slot: &Slot, value: Vec<u8>) -> bool {
    let sender = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    match sender {
        Some(tx) => tx.send(value).is_ok(),
        None => false,
    }
}

impl HandshakeCallbacks {
    /// Record the counterparty's static public key. Only the first call
    /// has any effect; returns whether this call delivered.
    pub fn on_remote_key(&self, key: Vec<u8>) -> bool {
        fire(&self.remote_key, key)
    }

    /// Record the authentication payload. Only the first call has any
    /// effect; returns whether this call delivered.
    pub fn on_auth_data(&self, data: Vec<u8>) -> bool {
        fire(&self.auth_data, data)
    }
}

/// What the negotiation saw of the handshake before moving on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeObservation {
    pub remote_key: Option<Vec<u8>>,
    pub auth_received: bool,
    /// Either signal is missing, whether the ceiling elapsed or the relay
    /// dropped its writer.
    pub incomplete: bool,
}

impl HandshakeObservation {
    pub fn remote_key_received(&self) -> bool {
        self.remote_key.is_some()
    }

    pub fn remote_key_hex(&self) -> Option<String> {
        self.remote_key.as_ref().map(hex::encode)
    }
}

async fn recv(rx: &mut Option<oneshot::Receiver<Vec<u8>>>) -> Option<Vec<u8>> {
    match rx.as_mut() {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    }
}

impl HandshakeWaiter {
    /// Wait up to `ceiling` for both signals.
    ///
    /// Returns early once both arrived (or their writers were dropped).
    /// A missing signal is not an error: the observation is returned with
    /// `incomplete` set. Only cancellation of `ctx` fails.
    pub async fn wait(
        self,
        ceiling: Duration,
        ctx: &RequestContext,
    ) -> LncResult<HandshakeObservation> {
        let mut key_rx = Some(self.remote_key);
        let mut auth_rx = Some(self.auth_data);
        let mut observation = HandshakeObservation::default();

        ctx.check()?;
        let expired = tokio::time::sleep(ceiling);
        tokio::pin!(expired);
        let cancelled = ctx.cancelled();
        tokio::pin!(cancelled);

        while key_rx.is_some() || auth_rx.is_some() {
            tokio::select! {
                biased;
                reason = &mut cancelled => return Err(LncError::Cancelled(reason)),
                key = recv(&mut key_rx), if key_rx.is_some() => {
                    key_rx = None;
                    observation.remote_key = key;
                }
                auth = recv(&mut auth_rx), if auth_rx.is_some() => {
                    auth_rx = None;
                    observation.auth_received = auth.is_some();
                }
                _ = &mut expired => break,
            }
        }

        observation.incomplete = observation.remote_key.is_none() || !observation.auth_received;
        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lnc_core::CancelReason;

    #[tokio::test(start_paused = true)]
    async fn test_both_signals_return_early() {
        let (callbacks, waiter) = handshake_signals();
        let ctx = RequestContext::new("test");
        let started = tokio::time::Instant::now();

        let cb = callbacks.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cb.on_remote_key(vec![0x02; 33]);
            cb.on_auth_data(b"auth".to_vec());
        });

        let obs = waiter.wait(Duration::from_secs(5), &ctx).await.unwrap();
        assert!(obs.remote_key_received());
        assert!(obs.auth_received);
        assert!(!obs.incomplete);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_proceeds_with_partial() {
        let (callbacks, waiter) = handshake_signals();
        let ctx = RequestContext::new("test");
        callbacks.on_remote_key(vec![0x03; 33]);

        let obs = waiter.wait(Duration::from_secs(5), &ctx).await.unwrap();
        assert_eq!(obs.remote_key_hex(), Some("03".repeat(33)));
        assert!(!obs.auth_received);
        assert!(obs.incomplete);
        drop(callbacks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_write_is_ignored() {
        let (callbacks, waiter) = handshake_signals();
        assert!(callbacks.on_remote_key(vec![1]));
        assert!(!callbacks.on_remote_key(vec![2]));
        assert!(callbacks.on_auth_data(vec![9]));
        assert!(!callbacks.on_auth_data(vec![9]));

        let obs = waiter
            .wait(Duration::from_secs(5), &RequestContext::new("test"))
            .await
            .unwrap();
        assert_eq!(obs.remote_key, Some(vec![1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_writers_end_wait() {
        let (callbacks, waiter) = handshake_signals();
        drop(callbacks);
        let obs = waiter
            .wait(Duration::from_secs(5), &RequestContext::new("test"))
            .await
            .unwrap();
        assert!(!obs.remote_key_received());
        assert!(!obs.auth_received);
        assert!(obs.incomplete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_dropped_writer_is_incomplete() {
        let (callbacks, waiter) = handshake_signals();
        let started = tokio::time::Instant::now();
        callbacks.on_remote_key(vec![0x02; 33]);
        drop(callbacks);
        let obs = waiter
            .wait(Duration::from_secs(5), &RequestContext::new("test"))
            .await
            .unwrap();
        assert!(obs.remote_key_received());
        assert!(!obs.auth_received);
        assert!(obs.incomplete);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let (_callbacks, waiter) = handshake_signals();
        let ctx = RequestContext::new("test").with_timeout(Duration::from_secs(1));
        let err = waiter.wait(Duration::from_secs(5), &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            LncError::Cancelled(CancelReason::DeadlineExceeded)
        ));
    }
}
