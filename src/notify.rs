use aws_sdk_sns::Client as SnsClient;
use rocket::serde::json::serde_json;
use rocket::tokio::{self, sync::mpsc, sync::Mutex};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Orbit, Rocket,
};
use serde::{Deserialize, Serialize};

use crate::model::candidate::CandidateId;
use crate::Config;

/// A live tally update: one candidate's new vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyUpdate {
    pub candidate_id: CandidateId,
    pub voted_count: u64,
}

/// Outbound side of the tally broadcast queue.
///
/// Votes push updates here after their transaction commits; a background task
/// owns the receiving end and does the actual publishing. Queueing after
/// commit means a broadcast failure is structurally incapable of affecting
/// the vote outcome.
pub struct TallyBroadcaster {
    tx: mpsc::UnboundedSender<TallyUpdate>,
}

impl TallyBroadcaster {
    /// Enqueue an update, best-effort. A closed queue is logged and ignored.
    pub fn broadcast(&self, update: TallyUpdate) {
        if let Err(err) = self.tx.send(update) {
            warn!("Dropping tally broadcast: {err}");
        }
    }
}

/// Create the broadcast queue: a sender for managed state and a fairing that
/// spawns the publishing task on liftoff.
pub fn broadcast_channel() -> (TallyBroadcaster, BroadcastFairing) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        TallyBroadcaster { tx },
        BroadcastFairing {
            rx: Mutex::new(Some(rx)),
        },
    )
}

/// A fairing that drains the tally queue into the configured SNS topic.
pub struct BroadcastFairing {
    rx: Mutex<Option<mpsc::UnboundedReceiver<TallyUpdate>>>,
}

#[rocket::async_trait]
impl Fairing for BroadcastFairing {
    fn info(&self) -> Info {
        Info {
            name: "Tally broadcast",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let Some(mut rx) = self.rx.lock().await.take() else {
            warn!("Tally broadcast task already started");
            return;
        };
        // Both are placed in managed state by earlier fairings.
        let sns = rocket
            .state::<SnsClient>()
            .expect("SNS client not managed")
            .clone();
        let topic = rocket
            .state::<Config>()
            .expect("Config not managed")
            .tally_topic_arn()
            .to_string();

        tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                publish_update(&sns, &topic, update).await;
            }
        });
        info!("Tally broadcast task started");
    }
}

/// Publish a single update. Failures are logged and swallowed; there is no
/// retry and no ordering guarantee.
async fn publish_update(sns: &SnsClient, topic: &str, update: TallyUpdate) {
    let payload = match serde_json::to_string(&update) {
        Ok(payload) => payload,
        Err(err) => {
            error!("Failed to serialise tally update: {err}");
            return;
        }
    };
    let result = sns
        .publish()
        .topic_arn(topic)
        .message(payload)
        .send()
        .await;
    if let Err(err) = result {
        error!(
            "Failed to broadcast tally for candidate {}: {err}",
            update.candidate_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn broadcast_reaches_the_queue() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let broadcaster = TallyBroadcaster { tx };

        broadcaster.broadcast(TallyUpdate {
            candidate_id: 1,
            voted_count: 5,
        });

        let update = rx.recv().await.unwrap();
        assert_eq!(update.candidate_id, 1);
        assert_eq!(update.voted_count, 5);
    }

    #[test]
    fn broadcast_failure_is_swallowed() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let broadcaster = TallyBroadcaster { tx };

        // Must not panic or propagate even though the queue is gone.
        broadcaster.broadcast(TallyUpdate {
            candidate_id: 2,
            voted_count: 9,
        });
    }

    #[test]
    fn updates_serialise_camel_case() {
        let update = TallyUpdate {
            candidate_id: 7,
            voted_count: 12,
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"candidateId":7,"votedCount":12}"#);
    }
}
