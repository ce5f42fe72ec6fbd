//! Transaction tokens (duplicate-submission guard)
//!
//! A token is issued when a page with a state-changing form is rendered and
//! consumed the first time a state-changing request carries it. The second
//! arrival of the same token is a duplicate submission (double click, back
//! button resubmit).
//!
//! ## Invariants
//!
//! - A token present in the set has never been consumed
//! - Once a session has a token set, it keeps one (possibly empty) until the
//!   session ends, so consumed tokens stay rejected
//! - A session without any token set requires no check at all; this is how
//!   pages that never embed a token (forwarded read-only views) pass through

use crate::session::Session;
use formgate_core::{FormgateError, FormgateResult};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Session key of the token set
pub const TOKENS_KEY: &str = "formgate.transactionTokens";

/// Default token length in alphanumeric characters (~190 bits)
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// Minimum accepted token length (~166 bits)
pub const MIN_TOKEN_LENGTH: usize = 28;

/// Default number of outstanding tokens kept per session
pub const DEFAULT_MAX_TOKENS_PER_SESSION: usize = 64;

/// Outcome of a successful [`TransactionTokenStore::consume`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    /// The token was present and has now been removed
    Consumed,
    /// The session never had a token set; nothing to check
    NotRequired,
}

/// Outstanding tokens, oldest first
#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenSet {
    tokens: VecDeque<String>,
}

/// Issues and consumes single-use transaction tokens
#[derive(Debug, Clone)]
pub struct TransactionTokenStore {
    length: usize,
    max_per_session: usize,
}

impl Default for TransactionTokenStore {
    fn default() -> Self {
        Self {
            length: DEFAULT_TOKEN_LENGTH,
            max_per_session: DEFAULT_MAX_TOKENS_PER_SESSION,
        }
    }
}

impl TransactionTokenStore {
    /// Create a store issuing `length`-character tokens, keeping at most
    /// `max_per_session` outstanding
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `length` is below
    /// [`MIN_TOKEN_LENGTH`] or `max_per_session` is zero.
    pub fn new(length: usize, max_per_session: usize) -> FormgateResult<Self> {
        if length < MIN_TOKEN_LENGTH {
            return Err(FormgateError::config(format!(
                "transaction token length {} is below the minimum of {}",
                length, MIN_TOKEN_LENGTH
            )));
        }
        if max_per_session == 0 {
            return Err(FormgateError::config(
                "tokens.max_per_session must be at least 1",
            ));
        }
        Ok(Self {
            length,
            max_per_session,
        })
    }

    /// Token length in characters
    pub fn token_length(&self) -> usize {
        self.length
    }

    /// Issue a fresh token and add it to the session's set
    ///
    /// When the set is full the oldest outstanding token is evicted; a later
    /// submission carrying it is treated as a duplicate.
    pub fn issue(&self, session: &Session) -> FormgateResult<String> {
        let guard = session.lock();
        let mut set: TokenSet = guard.load(TOKENS_KEY)?.unwrap_or_default();

        let token = loop {
            let candidate = self.generate();
            if !set.tokens.contains(&candidate) {
                break candidate;
            }
        };
        set.tokens.push_back(token.clone());
        let mut evicted = 0;
        while set.tokens.len() > self.max_per_session {
            set.tokens.pop_front();
            evicted += 1;
        }
        guard.save(TOKENS_KEY, &set)?;

        debug!(
            target: "formgate::token",
            session_id = %guard.id(),
            outstanding = set.tokens.len(),
            evicted,
            "Transaction token issued"
        );
        Ok(token)
    }

    /// Consume `token` from the session's set
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSubmission` when the session has a token set that
    /// does not contain `token` (including when no token was sent).
    pub fn consume(&self, session: &Session, token: Option<&str>) -> FormgateResult<TokenCheck> {
        let guard = session.lock();
        let Some(mut set) = guard.load::<TokenSet>(TOKENS_KEY)? else {
            debug!(target: "formgate::token", session_id = %guard.id(), "No token set; check not required");
            return Ok(TokenCheck::NotRequired);
        };

        let presented = token.unwrap_or_default();
        match set.tokens.iter().position(|t| t == presented) {
            Some(index) => {
                set.tokens.remove(index);
                guard.save(TOKENS_KEY, &set)?;
                debug!(
                    target: "formgate::token",
                    session_id = %guard.id(),
                    outstanding = set.tokens.len(),
                    "Transaction token consumed"
                );
                Ok(TokenCheck::Consumed)
            }
            None => {
                warn!(
                    target: "formgate::token",
                    session_id = %guard.id(),
                    token_sent = token.is_some(),
                    "Duplicate submission rejected"
                );
                Err(FormgateError::duplicate_submission(presented))
            }
        }
    }

    /// Number of outstanding tokens, or `None` if the session has no set
    pub fn outstanding(&self, session: &Session) -> FormgateResult<Option<usize>> {
        let guard = session.lock();
        Ok(guard.load::<TokenSet>(TOKENS_KEY)?.map(|s| s.tokens.len()))
    }

    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}
