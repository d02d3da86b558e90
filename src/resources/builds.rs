use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    asc::{AppStoreConnectClient, require_id},
    envelope::{RequestBody, RequestData, ResourceType, Response, SingleResponse},
    error::Result,
    poll::{PollStatus, poll_until},
    query::{ListOptions, ListQuery},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildAttributes {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uploaded_date: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub expired: Option<bool>,
    #[serde(default)]
    pub min_os_version: Option<String>,
    #[serde(default)]
    pub processing_state: Option<String>,
    #[serde(default)]
    pub uses_non_exempt_encryption: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    Processing,
    Failed,
    Invalid,
    Valid,
}

impl ProcessingState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PROCESSING" => Some(ProcessingState::Processing),
            "FAILED" => Some(ProcessingState::Failed),
            "INVALID" => Some(ProcessingState::Invalid),
            "VALID" => Some(ProcessingState::Valid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Processing => "PROCESSING",
            ProcessingState::Failed => "FAILED",
            ProcessingState::Invalid => "INVALID",
            ProcessingState::Valid => "VALID",
        }
    }
}

impl BuildAttributes {
    pub fn state(&self) -> Option<ProcessingState> {
        self.processing_state.as_deref().and_then(ProcessingState::parse)
    }
}

fn processing_status(build: &SingleResponse<BuildAttributes>) -> PollStatus {
    let attrs = build.data.attributes.as_ref();
    match attrs.and_then(BuildAttributes::state) {
        Some(ProcessingState::Valid) => PollStatus::Done,
        Some(state @ (ProcessingState::Failed | ProcessingState::Invalid)) => {
            PollStatus::Failed(state.as_str().to_string())
        }
        _ => PollStatus::Pending,
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildsQuery {
    query: ListQuery,
}

impl BuildsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app(self, app_id: &str) -> Self {
        self.map_query(|q| q.filter("app", [app_id]))
    }

    pub fn versions<I, S>(self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.filter("version", versions))
    }

    pub fn processing_states<I, S>(self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.filter_enum("processingState", states))
    }

    pub fn platforms<I, S>(self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.filter_enum("preReleaseVersion.platform", platforms))
    }

    pub fn expired(self, expired: bool) -> Self {
        self.map_query(|q| q.filter("expired", [expired.to_string()]))
    }

    /// `uploadedDate`, `version` or `preReleaseVersion`, `-` prefixed for
    /// descending.
    pub fn sort<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.sort(fields))
    }
}

impl ListOptions for BuildsQuery {
    fn list_query(&mut self) -> &mut ListQuery {
        &mut self.query
    }

    fn into_list_query(self) -> ListQuery {
        self.query
    }
}

#[derive(Debug, Serialize)]
struct ExpireAttributes {
    expired: bool,
}

impl AppStoreConnectClient {
    pub async fn list_builds(&self, query: BuildsQuery) -> Result<Response<BuildAttributes>> {
        let target = query.into_list_query().target("v1/builds");
        self.get_list(&target).await
    }

    pub async fn get_build(&self, build_id: &str) -> Result<SingleResponse<BuildAttributes>> {
        let build_id = require_id("build id", build_id)?;
        self.get_single(&format!("v1/builds/{}", build_id)).await
    }

    pub async fn expire_build(&self, build_id: &str) -> Result<SingleResponse<BuildAttributes>> {
        let build_id = require_id("build id", build_id)?;
        let body = RequestBody::new(
            RequestData::new(ResourceType::Builds)
                .id(build_id)
                .attributes(ExpireAttributes { expired: true }),
        );
        self.patch_json(&format!("v1/builds/{}", build_id), &body)
            .await
    }

    /// Polls the build every `interval` until processing finishes.
    ///
    /// `VALID` returns the build, `FAILED` and `INVALID` return
    /// [`Error::StateFailed`](crate::Error::StateFailed). Bound the wait with
    /// [`AppStoreConnectClient::with_timeout`].
    pub async fn wait_for_build_processing(
        &self,
        build_id: &str,
        interval: Duration,
    ) -> Result<SingleResponse<BuildAttributes>> {
        let build_id = require_id("build id", build_id)?;
        let build = poll_until(
            self.scope(),
            interval,
            move || self.get_build(build_id),
            processing_status,
        )
        .await?;
        info!(build_id, "build finished processing");
        Ok(build)
    }
}
