use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wanderai_gateway::{
    ActivityCategory, ChatRequest, ConversationTurn, Credential, CredentialPool, FormRequest,
    GatewayError, GenerationGateway, GenerationRequest, ModelCall, ModelRole, SurpriseRequest,
    TextModel,
};

const LISBON_ITINERARY: &str = r#"{
  "destination": "Lisbon, Portugal",
  "originCity": "Boston",
  "totalDays": 3,
  "totalEstimatedCost": 590,
  "days": [
    {
      "dayNumber": 1,
      "title": "Arrival",
      "activities": [
        {"timeSlot": "8:00 AM", "activityName": "Flight from Boston", "description": "Overnight flight", "estimatedCost": 450, "location": "BOS", "category": "transport"},
        {"timeSlot": "7:00 PM", "activityName": "Dinner in Alfama", "description": "Fado and grilled sardines", "estimatedCost": 40, "location": "Alfama", "category": "meal"}
      ]
    },
    {
      "dayNumber": 2,
      "title": "Belem",
      "activities": [
        {"timeSlot": "10:00 AM", "activityName": "Jeronimos Monastery", "description": "", "estimatedCost": 20, "location": "Belem", "category": "attraction"}
      ]
    },
    {
      "dayNumber": 3,
      "title": "Home",
      "activities": [
        {"timeSlot": "4:00 PM", "activityName": "Flight to Boston", "description": "", "estimatedCost": 80, "location": "LIS", "category": "transport"}
      ]
    }
  ]
}"#;

#[derive(Debug)]
enum Reply {
    Text(String),
    Quota,
    Upstream,
}

/// Replays canned replies and records every call it receives.
#[derive(Debug, Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, ModelCall)>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, ModelCall)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        credential: &Credential,
        call: &ModelCall,
    ) -> wanderai_gateway::Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((credential.expose().to_string(), call.clone()));

        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Quota) => Err(GatewayError::Quota {
                credential_index: 0,
                message: "429 RESOURCE_EXHAUSTED".to_string(),
            }),
            Some(Reply::Upstream) | None => {
                Err(GatewayError::Upstream("HTTP 400: API key not valid".to_string()))
            }
        }
    }
}

fn gateway(model: Arc<ScriptedModel>, keys: &[&str]) -> GenerationGateway {
    let pool = Arc::new(CredentialPool::new(keys.iter().copied()).unwrap());
    GenerationGateway::new(model, pool)
}

#[tokio::test]
async fn test_form_request_returns_validated_itinerary() {
    let model = ScriptedModel::new(vec![Reply::Text(format!(
        "Here is your trip:\n```json\n{}\n```",
        LISBON_ITINERARY
    ))]);
    let gateway = gateway(model.clone(), &["key-a"]);

    let request = FormRequest::new("Lisbon", 3)
        .with_budget(600.0)
        .with_origin_city("Boston");
    let itinerary = gateway.form(request).await.unwrap();

    assert_eq!(itinerary.destination, "Lisbon, Portugal");
    assert_eq!(itinerary.total_days, 3);
    assert_eq!(itinerary.days.len(), 3);
    assert_eq!(itinerary.days[0].activities[0].category, ActivityCategory::Transport);
    assert!(itinerary.total_estimated_cost <= 600.0);

    let calls = model.calls();
    assert_eq!(calls.len(), 1);
    let prompt = &calls[0].1.prompt;
    assert!(prompt.contains("Lisbon"));
    assert!(prompt.contains("$600"));
    assert!(prompt.contains("Boston"));
    assert!(calls[0].1.history.is_empty());
}

#[tokio::test]
async fn test_quota_rotates_to_next_credential() {
    let model = ScriptedModel::new(vec![
        Reply::Quota,
        Reply::Text(LISBON_ITINERARY.to_string()),
    ]);
    let gateway = gateway(model.clone(), &["key-a", "key-b", "key-c"]);

    let itinerary = gateway
        .surprise(SurpriseRequest::new(800u32).with_origin_city("Boston"))
        .await
        .unwrap();

    assert_eq!(itinerary.days.len(), 3);
    let keys: Vec<String> = model.calls().into_iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["key-a", "key-b"]);
}

#[tokio::test]
async fn test_every_credential_rate_limited_is_quota_exhausted() {
    let model = ScriptedModel::new(vec![Reply::Quota, Reply::Quota, Reply::Quota]);
    let gateway = gateway(model.clone(), &["key-a", "key-b", "key-c"]);

    let err = gateway
        .form(FormRequest::new("Rome", 2))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::QuotaExhausted { attempts: 3, .. }));
    assert_eq!(model.calls().len(), 3);
}

#[tokio::test]
async fn test_non_quota_error_is_not_retried() {
    let model = ScriptedModel::new(vec![
        Reply::Upstream,
        Reply::Text(LISBON_ITINERARY.to_string()),
    ]);
    let gateway = gateway(model.clone(), &["key-a", "key-b"]);

    let err = gateway
        .form(FormRequest::new("Rome", 2))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Upstream(_)));
    assert_eq!(model.calls().len(), 1);
}

#[tokio::test]
async fn test_invalid_requests_never_reach_the_model() {
    let model = ScriptedModel::new(Vec::new());
    let gateway = gateway(model.clone(), &["key-a"]);

    let requests = vec![
        GenerationRequest::Form(FormRequest::new("", 3)),
        GenerationRequest::Form(FormRequest::new("Rome", 0)),
        GenerationRequest::Surprise(SurpriseRequest::new("")),
        GenerationRequest::Chat(ChatRequest::default()),
    ];

    for request in requests {
        let err = gateway.generate(request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_chat_drops_leading_assistant_turns_and_caps_output() {
    let model = ScriptedModel::new(vec![Reply::Text(
        "Tokyo in spring is lovely. How many days?".to_string(),
    )]);
    let gateway = gateway(model.clone(), &["key-a"]).with_chat_max_output_tokens(Some(1024));

    let reply = gateway
        .chat(ChatRequest {
            message: "Yes, 5 days please".to_string(),
            history: vec![
                ConversationTurn::assistant("Hi! Where would you like to go?"),
                ConversationTurn::user("Tokyo"),
                ConversationTurn::assistant("Great choice. When?"),
            ],
        })
        .await
        .unwrap();

    assert_eq!(reply, "Tokyo in spring is lovely. How many days?");

    let call = &model.calls()[0].1;
    assert_eq!(call.history.len(), 2);
    assert_eq!(call.history[0].role, ModelRole::User);
    assert_eq!(call.history[0].content, "Tokyo");
    assert_eq!(call.history[1].role, ModelRole::Model);
    assert_eq!(call.max_output_tokens, Some(1024));
    assert!(call.prompt.ends_with("User: Yes, 5 days please"));
}

#[tokio::test]
async fn test_chat_without_usable_history_sends_prompt_alone() {
    let model = ScriptedModel::new(vec![Reply::Text("{\"not\": \"parsed\"}".to_string())]);
    let gateway = gateway(model.clone(), &["key-a"]);

    let reply = gateway
        .chat(ChatRequest {
            message: "Surprise me".to_string(),
            history: vec![ConversationTurn::assistant("Welcome!")],
        })
        .await
        .unwrap();

    // Chat replies pass through verbatim, even when they look like JSON.
    assert_eq!(reply, "{\"not\": \"parsed\"}");
    let call = &model.calls()[0].1;
    assert!(call.history.is_empty());
    assert_eq!(call.max_output_tokens, None);
}

#[tokio::test]
async fn test_unparseable_itinerary_is_parse_error_with_snippet() {
    let prose = "I'm sorry, I can't plan that trip right now. ".repeat(10);
    let model = ScriptedModel::new(vec![Reply::Text(prose.clone())]);
    let gateway = gateway(model, &["key-a", "key-b"]);

    let err = gateway
        .form(FormRequest::new("Atlantis", 2))
        .await
        .unwrap_err();

    match err {
        GatewayError::Parse { snippet, .. } => {
            assert_eq!(snippet.chars().count(), 200);
            assert!(prose.starts_with(&snippet));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_itinerary_missing_required_fields_is_parse_error() {
    let model = ScriptedModel::new(vec![Reply::Text(
        r#"{"destination": "Rome", "days": []}"#.to_string(),
    )]);
    let gateway = gateway(model, &["key-a"]);

    let err = gateway
        .form(FormRequest::new("Rome", 2))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Parse { .. }));
}
