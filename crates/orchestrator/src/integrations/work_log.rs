//! Issue-tracker work-log submission.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{IntegrationError, IntegrationResult};
use crate::domain::{Answer, WorkLogIntegration};

/// Submits a participant's answers as work logs and returns the tracker's
/// status message for the participant.
#[async_trait]
pub trait WorkLogClient: Send + Sync + fmt::Debug {
    async fn submit_work_log(
        &self,
        integration: &WorkLogIntegration,
        timezone: Tz,
        answers: &[Answer],
    ) -> IntegrationResult<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkLogRequest<'a> {
    project_id: &'a str,
    api_token: &'a str,
    timezone: &'a str,
    logs: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WorkLogReply {
    message: String,
}

/// Work-log client that POSTs JSON to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpWorkLogClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpWorkLogClient {
    /// Build a client for `endpoint` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `Http` if the underlying client cannot be constructed.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> IntegrationResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl WorkLogClient for HttpWorkLogClient {
    async fn submit_work_log(
        &self,
        integration: &WorkLogIntegration,
        timezone: Tz,
        answers: &[Answer],
    ) -> IntegrationResult<String> {
        let request = WorkLogRequest {
            project_id: &integration.project_id,
            api_token: &integration.api_token,
            timezone: timezone.name(),
            logs: answers.iter().map(|a| a.answer.as_str()).collect(),
        };

        debug!(endpoint = %self.endpoint, entries = request.logs.len(), "submitting work log");

        let reply: WorkLogReply = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        Ok(reply.message)
    }
}

/// Stand-in used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledWorkLogClient;

#[async_trait]
impl WorkLogClient for DisabledWorkLogClient {
    async fn submit_work_log(
        &self,
        _integration: &WorkLogIntegration,
        _timezone: Tz,
        _answers: &[Answer],
    ) -> IntegrationResult<String> {
        Err(IntegrationError::not_configured("work_log.endpoint"))
    }
}
