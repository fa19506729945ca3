use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::models::flashcard::{Flashcard, GeneratedEntry, GenerationError};
use crate::utils::error::{BridgeError, PublishError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied(String),
}

/// `{ "result": ..., "error": ... }` as returned by every AnkiConnect action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnkiConnectResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub deck_name: String,
    pub model_name: String,
    pub fields: NoteFields,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoteFields {
    pub front: String,
    pub back: String,
}

impl Note {
    pub fn basic(deck_name: &str, model_name: &str, card: Flashcard) -> Self {
        Self {
            deck_name: deck_name.to_string(),
            model_name: model_name.to_string(),
            fields: NoteFields {
                front: card.front,
                back: card.back,
            },
            tags: Vec::new(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlashcardBridge: Send + Sync {
    async fn request_permission(&self) -> Result<Permission, BridgeError>;
    async fn add_note(&self, note: Note) -> Result<AnkiConnectResponse, BridgeError>;
}

#[derive(Serialize)]
struct Envelope<'a, P: Serialize> {
    action: &'a str,
    version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<P>,
}

#[derive(Serialize)]
struct AddNoteParams {
    note: Note,
}

/// JSON-RPC style client for the AnkiConnect add-on.
pub struct AnkiConnectClient {
    client: Client,
    url: String,
    version: u8,
}

impl AnkiConnectClient {
    pub fn new(client: Client, url: impl Into<String>, version: u8) -> Self {
        Self {
            client,
            url: url.into(),
            version,
        }
    }

    async fn invoke<P: Serialize + Send>(
        &self,
        action: &str,
        params: Option<P>,
    ) -> Result<AnkiConnectResponse, BridgeError> {
        let envelope = Envelope {
            action,
            version: self.version,
            params,
        };

        let response = self.client.post(&self.url).json(&envelope).send().await?;

        if !response.status().is_success() {
            return Err(BridgeError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl FlashcardBridge for AnkiConnectClient {
    async fn request_permission(&self) -> Result<Permission, BridgeError> {
        let response = self.invoke::<()>("requestPermission", None).await?;

        let permission = response
            .result
            .get("permission")
            .and_then(Value::as_str)
            .unwrap_or("missing");

        if permission == "granted" {
            Ok(Permission::Granted)
        } else {
            Ok(Permission::Denied(
                response
                    .error
                    .unwrap_or_else(|| format!("permission {}", permission)),
            ))
        }
    }

    async fn add_note(&self, note: Note) -> Result<AnkiConnectResponse, BridgeError> {
        debug!("AnkiConnect addNote payload: {:?}", note);

        let response = self.invoke("addNote", Some(AddNoteParams { note })).await?;

        info!("AnkiConnect response: {:?}", response);
        Ok(response)
    }
}

/// One element of the pipeline's result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PublishOutcome {
    Submitted(AnkiConnectResponse),
    GenerationFailed(GenerationError),
}

/// Pushes generated cards into a deck through a [`FlashcardBridge`].
pub struct DeckPublisher {
    bridge: Arc<dyn FlashcardBridge>,
    note_type: String,
}

impl DeckPublisher {
    pub fn new(bridge: Arc<dyn FlashcardBridge>, note_type: impl Into<String>) -> Self {
        Self {
            bridge,
            note_type: note_type.into(),
        }
    }

    /// Cards without `front`/`back` are skipped. Generation errors are carried
    /// through in place. The first rejected card aborts the rest; cards already
    /// added stay in the deck.
    pub async fn publish(
        &self,
        deck_name: &str,
        entries: &[GeneratedEntry],
    ) -> Result<Vec<PublishOutcome>, PublishError> {
        let has_cards = entries.iter().any(|e| e.as_flashcard().is_some());
        if has_cards {
            self.authorize().await?;
        }

        let mut outcomes = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            if let GeneratedEntry::Failed(failure) = entry {
                outcomes.push(PublishOutcome::GenerationFailed(*failure));
                continue;
            }

            let Some(card) = entry.as_flashcard() else {
                debug!("Skipping entry {} without front/back", index);
                continue;
            };

            let note = Note::basic(deck_name, &self.note_type, card);
            let response = self
                .bridge
                .add_note(note)
                .await
                .map_err(|e| PublishError::SubmissionFailure {
                    index,
                    reason: e.to_string(),
                })?;

            if let Some(reason) = response.error {
                error!("AnkiConnect rejected card {}: {}", index, reason);
                return Err(PublishError::SubmissionFailure { index, reason });
            }

            outcomes.push(PublishOutcome::Submitted(response));
        }

        Ok(outcomes)
    }

    async fn authorize(&self) -> Result<(), PublishError> {
        match self.bridge.request_permission().await {
            Ok(Permission::Granted) => Ok(()),
            Ok(Permission::Denied(reason)) => Err(PublishError::AuthorizationDenied(reason)),
            Err(e) => {
                error!("Error requesting permission: {}", e);
                Err(PublishError::AuthorizationDenied(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::flashcard::GenerationFailure;
    use serde_json::json;
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn card(front: &str, back: &str) -> GeneratedEntry {
        GeneratedEntry::Card(json!({"front": front, "back": back}))
    }

    fn added(id: i64) -> AnkiConnectResponse {
        AnkiConnectResponse {
            result: json!(id),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_client_permission_granted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"action": "requestPermission", "version": 6})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"permission": "granted", "requireApikey": false, "version": 6},
                "error": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AnkiConnectClient::new(Client::new(), server.uri(), 6);
        assert_eq!(client.request_permission().await.unwrap(), Permission::Granted);
    }

    #[tokio::test]
    async fn test_client_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"permission": "denied"},
                "error": null
            })))
            .mount(&server)
            .await;

        let client = AnkiConnectClient::new(Client::new(), server.uri(), 6);
        assert_eq!(
            client.request_permission().await.unwrap(),
            Permission::Denied("permission denied".to_string())
        );
    }

    #[tokio::test]
    async fn test_client_add_note_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({
                "action": "addNote",
                "version": 6,
                "params": {
                    "note": {
                        "deckName": "Biology",
                        "modelName": "Basic",
                        "fields": {"Front": "What is ATP?", "Back": "Energy currency."},
                        "tags": []
                    }
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": 1496198395707_i64, "error": null})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = AnkiConnectClient::new(Client::new(), server.uri(), 6);
        let note = Note::basic(
            "Biology",
            "Basic",
            Flashcard {
                front: "What is ATP?".to_string(),
                back: "Energy currency.".to_string(),
            },
        );

        let response = client.add_note(note).await.unwrap();
        assert_eq!(response, added(1496198395707));
    }

    #[tokio::test]
    async fn test_denied_permission_submits_nothing() {
        let mut bridge = MockFlashcardBridge::new();
        bridge
            .expect_request_permission()
            .times(1)
            .returning(|| Ok(Permission::Denied("permission denied".to_string())));
        bridge.expect_add_note().times(0);

        let publisher = DeckPublisher::new(Arc::new(bridge), "Basic");
        let err = publisher
            .publish("Biology", &[card("Q1", "A1"), card("Q2", "A2")])
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::AuthorizationDenied(_)));
    }

    #[tokio::test]
    async fn test_unreachable_bridge_counts_as_denied() {
        let mut bridge = MockFlashcardBridge::new();
        bridge
            .expect_request_permission()
            .times(1)
            .returning(|| Err(BridgeError::Status(502)));
        bridge.expect_add_note().times(0);

        let publisher = DeckPublisher::new(Arc::new(bridge), "Basic");
        let err = publisher.publish("Biology", &[card("Q", "A")]).await.unwrap_err();

        assert!(matches!(err, PublishError::AuthorizationDenied(_)));
    }

    #[tokio::test]
    async fn test_skips_incomplete_cards_and_keeps_generation_errors() {
        let mut bridge = MockFlashcardBridge::new();
        bridge
            .expect_request_permission()
            .times(1)
            .returning(|| Ok(Permission::Granted));
        bridge
            .expect_add_note()
            .withf(|note: &Note| note.deck_name == "Biology" && note.model_name == "Basic")
            .times(2)
            .returning(|note| Ok(added(note.fields.front.len() as i64)));

        let entries = vec![
            card("Q1", "A1"),
            GeneratedEntry::Card(json!({"front": "orphan"})),
            GeneratedEntry::Failed(GenerationError::new(GenerationFailure::ParseFailure)),
            card("Q22", "A22"),
        ];

        let publisher = DeckPublisher::new(Arc::new(bridge), "Basic");
        let outcomes = publisher.publish("Biology", &entries).await.unwrap();

        assert_eq!(
            outcomes,
            vec![
                PublishOutcome::Submitted(added(2)),
                PublishOutcome::GenerationFailed(GenerationError::new(
                    GenerationFailure::ParseFailure
                )),
                PublishOutcome::Submitted(added(3)),
            ]
        );
        assert_eq!(
            serde_json::to_value(&outcomes).unwrap(),
            json!([
                {"result": 2, "error": null},
                {"error": "parse failure"},
                {"result": 3, "error": null}
            ])
        );
    }

    #[tokio::test]
    async fn test_first_rejected_card_aborts_remaining() {
        let mut bridge = MockFlashcardBridge::new();
        bridge
            .expect_request_permission()
            .times(1)
            .returning(|| Ok(Permission::Granted));
        bridge.expect_add_note().times(2).returning(|note| {
            if note.fields.front == "Q2" {
                Ok(AnkiConnectResponse {
                    result: Value::Null,
                    error: Some("cannot create note because it is a duplicate".to_string()),
                })
            } else {
                Ok(added(1))
            }
        });

        let publisher = DeckPublisher::new(Arc::new(bridge), "Basic");
        let err = publisher
            .publish("Biology", &[card("Q1", "A1"), card("Q2", "A2"), card("Q3", "A3")])
            .await
            .unwrap_err();

        match err {
            PublishError::SubmissionFailure { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("duplicate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_only_failures_needs_no_permission() {
        let mut bridge = MockFlashcardBridge::new();
        bridge.expect_request_permission().times(0);
        bridge.expect_add_note().times(0);

        let publisher = DeckPublisher::new(Arc::new(bridge), "Basic");
        let outcomes = publisher
            .publish(
                "Biology",
                &[GeneratedEntry::Failed(GenerationError::new(
                    GenerationFailure::IncompleteResponse,
                ))],
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
    }
}
