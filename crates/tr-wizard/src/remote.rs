use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tr_core::core::{
    AnnotationKey, AnnotationRemote, AnnotationState, ConversationId, ConversationSource,
    CriteriaCatalog, Message, PortFuture, ProjectId, StoreError,
};

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ConversationEnvelope {
    id: ConversationId,
    conversation: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct AnnotationEnvelope {
    state: AnnotationState,
}

// ---------------------------------------------------------------------------
// ReviewApi: HTTP client for the annotation server
// ---------------------------------------------------------------------------

/// Talks to the server's `/api` routes; serves as both the conversation
/// source and the remote annotation store.
#[derive(Clone)]
pub struct ReviewApi {
    client: reqwest::Client,
    base: String,
}

impl ReviewApi {
    pub fn new(api_base: &str) -> Self {
        Self::with_client(reqwest::Client::new(), api_base)
    }

    pub fn with_client(client: reqwest::Client, api_base: &str) -> Self {
        Self {
            client,
            base: api_base.trim_end_matches('/').to_owned(),
        }
    }

    pub async fn criteria(&self) -> Result<CriteriaCatalog, StoreError> {
        let url = self.endpoint(&["api", "criteria"])?;
        let resp = self.send(self.client.get(url)).await?;
        decode(resp, "criteria").await
    }

    /// A random conversation of the project with its id.
    pub async fn next_conversation(
        &self,
        project_id: &ProjectId,
    ) -> Result<(ConversationId, Vec<Message>), StoreError> {
        let url = self.endpoint(&[
            "api",
            "projects",
            project_id.as_str(),
            "conversations",
            "next",
        ])?;
        let resp = self.send(self.client.get(url)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(format!(
                "no conversations in project {project_id}"
            )));
        }
        let envelope: ConversationEnvelope = decode(resp, "conversation").await?;
        Ok((envelope.id, envelope.conversation))
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base).map_err(|err| {
            StoreError::Unavailable(format!("invalid api base {}: {err}", self.base))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::Unavailable(format!("api base {} cannot take a path", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn annotation_url(&self, key: &AnnotationKey) -> Result<Url, StoreError> {
        self.endpoint(&[
            "api",
            "projects",
            key.project_id.as_str(),
            "conversations",
            key.conversation_id.as_str(),
            "annotations",
            key.user_id.as_str(),
        ])
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        req.send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

impl ConversationSource for ReviewApi {
    fn messages<'a>(&'a self, conversation_id: &'a ConversationId) -> PortFuture<'a, Vec<Message>> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "conversations", conversation_id.as_str()])?;
            let resp = self.send(self.client.get(url)).await?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Err(StoreError::NotFound(format!(
                    "conversation {conversation_id}"
                )));
            }
            let envelope: ConversationEnvelope = decode(resp, "conversation").await?;
            Ok(envelope.conversation)
        })
    }
}

impl AnnotationRemote for ReviewApi {
    fn fetch<'a>(&'a self, key: &'a AnnotationKey) -> PortFuture<'a, Option<AnnotationState>> {
        Box::pin(async move {
            let resp = self.send(self.client.get(self.annotation_url(key)?)).await?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let envelope: AnnotationEnvelope = decode(resp, "annotation").await?;
            Ok(Some(envelope.state))
        })
    }

    fn upsert<'a>(
        &'a self,
        key: &'a AnnotationKey,
        state: &'a AnnotationState,
    ) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let req = self.client.put(self.annotation_url(key)?).json(state);
            let resp = self.send(req).await?;
            if resp.status().is_success() {
                return Ok(());
            }
            Err(status_error(resp).await)
        })
    }
}

async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
    what: &str,
) -> Result<T, StoreError> {
    if !resp.status().is_success() {
        return Err(status_error(resp).await);
    }
    resp.json::<T>()
        .await
        .map_err(|err| StoreError::Malformed(format!("{what}: {err}")))
}

async fn status_error(resp: reqwest::Response) -> StoreError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|v| v.error.message)
        .unwrap_or(body);

    if status == StatusCode::NOT_FOUND {
        StoreError::NotFound(message)
    } else {
        StoreError::Unavailable(format!("{status}: {message}"))
    }
}
