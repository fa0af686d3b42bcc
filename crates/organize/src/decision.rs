//! Operator decisions for the interactive modes.
//!
//! In [`Mode::Suggested`](crate::Mode::Suggested) and
//! [`Mode::Manual`](crate::Mode::Manual) the organizer sends a
//! [`DecisionRequest`] for every file and waits for the answer. The caller
//! decides how and where to ask; the organizer only needs the request to be
//! [answered](DecisionRequest::respond) eventually.

use crate::engine::Mode;
use crate::texture::TextureInfo;
use texsort_learning::Suggestion;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Take the primary suggestion (or the fallback category if there is
    /// none).
    Accept,
    /// Leave the file where it is.
    Reject,
    /// Use this folder instead.
    Override(String),
}

#[derive(Debug)]
pub struct DecisionRequest {
    pub mode: Mode,
    pub texture: TextureInfo,
    /// Best first; may be empty.
    pub suggestions: Vec<Suggestion>,
    /// Where [`Decision::Accept`] would put the file.
    pub fallback: String,
    responder: oneshot::Sender<Decision>,
}

impl DecisionRequest {
    pub fn primary(&self) -> Option<&Suggestion> {
        self.suggestions.first()
    }

    /// The folder accepting would choose.
    pub fn accepted_destination(&self) -> &str {
        self.primary().map_or(self.fallback.as_str(), |s| s.destination.as_str())
    }

    /// Answers the request. An organizer that has already stopped is not an
    /// error.
    pub fn respond(self, decision: Decision) {
        _ = self.responder.send(decision);
    }
}

/// Sending half handed to the organizer.
pub(crate) type DecisionSender = mpsc::Sender<DecisionRequest>;

/// Creates the channel decision requests travel over. Give the sender to
/// [`Organizer::decisions`](crate::Organizer::decisions) and answer requests
/// from the receiver.
pub fn channel() -> (mpsc::Sender<DecisionRequest>, mpsc::Receiver<DecisionRequest>) {
    // The organizer waits for each answer before asking again.
    mpsc::channel(1)
}

/// Sends a request and waits for its answer. `None` means nobody is
/// listening any more.
pub(crate) async fn ask(
    sender: &DecisionSender,
    mode: Mode,
    texture: TextureInfo,
    suggestions: Vec<Suggestion>,
    fallback: String,
) -> Option<Decision> {
    let (responder, answer) = oneshot::channel();
    let request = DecisionRequest { mode, texture, suggestions, fallback, responder };
    sender.send(request).await.ok()?;
    answer.await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let (sender, mut receiver) = channel();
        let answering = tokio::spawn(async move {
            let request = receiver.recv().await.unwrap();
            assert_eq!(request.accepted_destination(), "uncategorized");
            assert!(request.primary().is_none());
            request.respond(Decision::Override("character/kratos".to_string()));
        });
        let decision =
            ask(&sender, Mode::Suggested, TextureInfo::new("a.png"), vec![], "uncategorized".to_string()).await;
        assert_eq!(decision, Some(Decision::Override("character/kratos".to_string())));
        answering.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_request_reads_as_closed() {
        let (sender, mut receiver) = channel();
        let answering = tokio::spawn(async move {
            drop(receiver.recv().await);
        });
        let decision = ask(&sender, Mode::Manual, TextureInfo::new("a.png"), vec![], "x".to_string()).await;
        assert_eq!(decision, None);
        answering.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_receiver() {
        let (sender, receiver) = channel();
        drop(receiver);
        let decision = ask(&sender, Mode::Manual, TextureInfo::new("a.png"), vec![], "x".to_string()).await;
        assert_eq!(decision, None);
    }

    #[test]
    fn test_accepted_destination_prefers_primary() {
        let (responder, _answer) = oneshot::channel();
        let request = DecisionRequest {
            mode: Mode::Suggested,
            texture: TextureInfo::new("a.png"),
            suggestions: vec![Suggestion { destination: "ui".to_string(), score: 0.9, last_learned: None }],
            fallback: "uncategorized".to_string(),
            responder,
        };
        assert_eq!(request.accepted_destination(), "ui");
    }
}
