use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::core::{
    activity::{ActivityRequest, ActivityRunCreated, RunIdentifiers},
    error::DataLoadError,
    run_status::ActivityRunStatus,
};

const JSON: &str = "application/json";

/// The three calls the console makes against the refinery backend.
#[async_trait::async_trait]
pub trait RefineryApi: Send + Sync {
    async fn create_and_run_activity(
        &self,
        request: &ActivityRequest,
    ) -> Result<ActivityRunCreated, DataLoadError>;

    async fn get_run_status(&self, ids: &RunIdentifiers) -> Result<ActivityRunStatus, DataLoadError>;

    async fn get_run_logs(&self, ids: &RunIdentifiers) -> Result<Value, DataLoadError>;
}

#[derive(Clone)]
pub struct Client {
    pub client: reqwest::Client,
    pub base_url: Url,
}

impl Client {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, DataLoadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, DataLoadError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DataLoadError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["refinery", "activities"])
            .extend(segments);
        Ok(url)
    }

    fn run_url(&self, ids: &RunIdentifiers, tail: &[&str]) -> Result<Url, DataLoadError> {
        let mut segments = vec![ids.activity_id.as_str(), "activityRuns", ids.run_id.as_str()];
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    fn json_get(&self, url: Url) -> RequestBuilder {
        self.client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static(JSON))
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DataLoadError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(DataLoadError::Server { status, body });
    }
    serde_json::from_str::<T>(&body).map_err(|source| DataLoadError::Decode { source, body })
}

#[async_trait::async_trait]
impl RefineryApi for Client {
    async fn create_and_run_activity(
        &self,
        request: &ActivityRequest,
    ) -> Result<ActivityRunCreated, DataLoadError> {
        let response = self
            .client
            .post(self.url(&[])?)
            .header(ACCEPT, HeaderValue::from_static(JSON))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn get_run_status(&self, ids: &RunIdentifiers) -> Result<ActivityRunStatus, DataLoadError> {
        let response = self.json_get(self.run_url(ids, &[])?).send().await?;
        decode(response).await
    }

    async fn get_run_logs(&self, ids: &RunIdentifiers) -> Result<Value, DataLoadError> {
        let response = self.json_get(self.run_url(ids, &["logs"])?).send().await?;
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::new(Url::parse(base).unwrap())
    }

    #[test]
    fn builds_urls_under_the_base_path() {
        let ids = RunIdentifiers::new("A1", "R1");

        let root = client("http://localhost:8080/");
        assert_eq!(
            root.url(&[]).unwrap().as_str(),
            "http://localhost:8080/refinery/activities"
        );
        assert_eq!(
            root.run_url(&ids, &["logs"]).unwrap().as_str(),
            "http://localhost:8080/refinery/activities/A1/activityRuns/R1/logs"
        );

        let nested = client("http://host/DataLoadApp");
        assert_eq!(
            nested.run_url(&ids, &[]).unwrap().as_str(),
            "http://host/DataLoadApp/refinery/activities/A1/activityRuns/R1"
        );
    }

    #[test]
    fn identifiers_are_escaped() {
        let ids = RunIdentifiers::new("a/b", "r 1");
        assert_eq!(
            client("http://host/").run_url(&ids, &[]).unwrap().as_str(),
            "http://host/refinery/activities/a%2Fb/activityRuns/r%201"
        );
    }

    #[test]
    fn opaque_base_url_is_rejected() {
        let err = client("mailto:ops@example.com").url(&[]).unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidBaseUrl(_)));
    }
}
