//! Guess orchestration
//!
//! For each identifier, in order:
//! 1. fetch recent posts (unavailable account, or one with no posts →
//!    `unavailable` verdict)
//! 2. send them to the scoring service on the batch's channel
//! 3. average the per-post scores: `bot` at or above [`BOT_THRESHOLD`],
//!    `human` below
//!
//! Any transport or protocol failure aborts the whole batch; verdicts
//! already computed are dropped with it. A broken channel cannot be trusted
//! for the remaining identifiers, and a half-answered batch would be
//! misleading.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::content::{ContentError, ContentSource};
use crate::error::{BridgeError, BridgeResult};
use crate::identifiers::Identifier;
use crate::scoring::{ScoringChannel, ScoringConnector, ScoringReply, ScoringRequest};

/// Mean score at or above which an account is reported as a bot
pub const BOT_THRESHOLD: f64 = 0.5;

/// Verdict `type` field; only user accounts are classified
pub const USER_TYPE: &str = "user";

/// Classification of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Bot,
    Human,
    Unavailable,
}

/// One entry of the batch result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl Verdict {
    pub fn new(id: &Identifier, status: VerdictStatus) -> Self {
        Self {
            status,
            kind: USER_TYPE.to_string(),
            id: id.to_string(),
        }
    }
}

/// Runs one batch of guesses
pub struct GuessOrchestrator {
    content: Arc<dyn ContentSource>,
    connector: Arc<dyn ScoringConnector>,
    post_limit: usize,
    scoring_timeout: Duration,
}

impl GuessOrchestrator {
    pub fn new(
        content: Arc<dyn ContentSource>,
        connector: Arc<dyn ScoringConnector>,
        post_limit: usize,
        scoring_timeout: Duration,
    ) -> Self {
        Self {
            content,
            connector,
            post_limit,
            scoring_timeout,
        }
    }

    /// Guess every identifier; verdicts come back in input order
    ///
    /// The batch owns one scoring channel, dropped (socket closed) on every
    /// return path.
    pub async fn guess_all(&self, ids: &[Identifier]) -> BridgeResult<Vec<Verdict>> {
        let mut channel = ScoringChannel::new(self.connector.clone());
        let mut verdicts = Vec::with_capacity(ids.len());

        for id in ids {
            match self.guess_one(&mut channel, id).await {
                Ok(verdict) => verdicts.push(verdict),
                Err(e) => {
                    error!(
                        "Aborting batch of {} at {} after {} verdicts: {}",
                        ids.len(),
                        id,
                        verdicts.len(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        debug!(
            "Batch of {} finished using {} scoring socket(s)",
            ids.len(),
            channel.sockets_opened()
        );
        Ok(verdicts)
    }

    /// Guess one identifier on the batch's channel
    pub async fn guess_one(
        &self,
        channel: &mut ScoringChannel,
        id: &Identifier,
    ) -> BridgeResult<Verdict> {
        info!("Requesting up to {} posts from {}", self.post_limit, id);

        let posts = match self.content.recent_posts(id, self.post_limit).await {
            Ok(posts) => posts,
            Err(ContentError::Unavailable(reason)) => {
                info!("{} is unavailable: {}", id, reason);
                return Ok(Verdict::new(id, VerdictStatus::Unavailable));
            }
            Err(e) => return Err(e.into()),
        };
        info!("Got {} posts from {}", posts.len(), id);

        if posts.is_empty() {
            info!("{} has no posts to score", id);
            return Ok(Verdict::new(id, VerdictStatus::Unavailable));
        }

        let request = ScoringRequest::guess(posts);
        info!("Sending request {} to scoring service", request.id);
        let reply = channel.exchange(&request, self.scoring_timeout).await?;
        info!("Got response {} from scoring service", reply.id);

        let status = classify(reply)?;
        Ok(Verdict::new(id, status))
    }
}

/// Turn a guess reply into `bot` or `human`
///
/// The result must be a non-empty array of numbers in `[0, 1]`; anything
/// else, including an error object, is a protocol violation.
pub fn classify(reply: ScoringReply) -> BridgeResult<VerdictStatus> {
    let result = reply.outcome.map_err(|error| {
        BridgeError::ProtocolViolation(format!(
            "scoring service returned error {}: {}",
            error.code, error.message
        ))
    })?;

    let scores = scores_from(&result)?;
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;

    Ok(if mean >= BOT_THRESHOLD {
        VerdictStatus::Bot
    } else {
        VerdictStatus::Human
    })
}

fn scores_from(result: &Value) -> BridgeResult<Vec<f64>> {
    let items = result.as_array().ok_or_else(|| {
        BridgeError::ProtocolViolation(format!("expected an array of scores, got {}", result))
    })?;

    if items.is_empty() {
        return Err(BridgeError::ProtocolViolation(
            "scoring service returned no scores".to_string(),
        ));
    }

    items
        .iter()
        .map(|item| match item.as_f64() {
            Some(score) if (0.0..=1.0).contains(&score) => Ok(score),
            _ => Err(BridgeError::ProtocolViolation(format!(
                "score {} is not a number in [0, 1]",
                item
            ))),
        })
        .collect()
}
