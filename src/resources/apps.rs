use serde::{Deserialize, Serialize};

use crate::{
    asc::{AppStoreConnectClient, require_id},
    envelope::{Response, SingleResponse},
    error::Result,
    query::{ListOptions, ListQuery},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub primary_locale: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppsQuery {
    query: ListQuery,
}

impl AppsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bundle_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.filter("bundleId", ids))
    }

    pub fn names<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.filter("name", names))
    }

    pub fn skus<I, S>(self, skus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.filter("sku", skus))
    }

    /// `name`, `bundleId` or `sku`, `-` prefixed for descending.
    pub fn sort<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.sort(fields))
    }
}

impl ListOptions for AppsQuery {
    fn list_query(&mut self) -> &mut ListQuery {
        &mut self.query
    }

    fn into_list_query(self) -> ListQuery {
        self.query
    }
}

impl AppStoreConnectClient {
    pub async fn list_apps(&self, query: AppsQuery) -> Result<Response<AppAttributes>> {
        let target = query.into_list_query().target("v1/apps");
        self.get_list(&target).await
    }

    pub async fn get_app(&self, app_id: &str) -> Result<SingleResponse<AppAttributes>> {
        let app_id = require_id("app id", app_id)?;
        self.get_single(&format!("v1/apps/{}", app_id)).await
    }
}
