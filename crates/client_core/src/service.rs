//! Backend collaborator seam and its reqwest implementation.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::{EnumKind, PlanId},
    error::{ApiError, ApiException},
    protocol::{EnumOption, ListItem, Mutation, PlanDetail},
};
use tracing::debug;
use url::Url;

use crate::{config::Settings, filter::FilterCriteria, normalize};

#[async_trait]
pub trait AssetService: Send + Sync {
    async fn fetch_list(&self, criteria: &FilterCriteria) -> Result<Vec<ListItem>>;
    async fn fetch_enum(&self, kind: EnumKind) -> Result<Vec<EnumOption>>;
    async fn fetch_detail(&self, id: PlanId) -> Result<PlanDetail>;
    async fn mutate(&self, mutation: Mutation) -> Result<()>;
}

#[derive(Serialize)]
struct ListQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    keyword: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
}

pub struct HttpAssetService {
    http: Client,
    base_url: Url,
}

impl HttpAssetService {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: parse_base_url(&settings.api_base_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }
}

#[async_trait]
impl AssetService for HttpAssetService {
    async fn fetch_list(&self, criteria: &FilterCriteria) -> Result<Vec<ListItem>> {
        let query = ListQuery {
            keyword: criteria.keyword(),
            status: criteria.status.as_deref().filter(|s| !s.trim().is_empty()),
        };
        let response = self
            .http
            .get(self.endpoint("decomposition/plans")?)
            .query(&query)
            .query(&criteria.filters)
            .send()
            .await?;
        let items = normalize::list(read_json(response).await?)?;
        debug!(count = items.len(), "fetched plan list");
        Ok(items)
    }

    async fn fetch_enum(&self, kind: EnumKind) -> Result<Vec<EnumOption>> {
        let response = self
            .http
            .get(self.endpoint(&format!("enums/{}", kind.as_path()))?)
            .send()
            .await?;
        normalize::enum_options(read_json(response).await?)
    }

    async fn fetch_detail(&self, id: PlanId) -> Result<PlanDetail> {
        let response = self
            .http
            .get(self.endpoint(&format!("decomposition/plans/{}", id.0))?)
            .send()
            .await?;
        normalize::object(read_json(response).await?)
    }

    async fn mutate(&self, mutation: Mutation) -> Result<()> {
        let request = match &mutation {
            Mutation::Create(draft) => self
                .http
                .post(self.endpoint("decomposition/plans")?)
                .json(draft),
            Mutation::Update(id, draft) => self
                .http
                .put(self.endpoint(&format!("decomposition/plans/{}", id.0))?)
                .json(draft),
            Mutation::Delete(id) => self
                .http
                .delete(self.endpoint(&format!("decomposition/plans/{}", id.0))?),
        };
        ensure_success(request.send().await?).await?;
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).with_context(|| format!("invalid api base url '{raw}'"))
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let status_error = response.error_for_status_ref().err();
    let body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
        return Err(ApiException::from_body(status.as_u16(), api_error).into());
    }
    match status_error {
        Some(err) => Err(err.into()),
        None => Err(anyhow!("request failed with status {status}")),
    }
}

async fn read_json(response: Response) -> Result<Value> {
    let response = ensure_success(response).await?;
    response.json().await.context("response body is not valid JSON")
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
