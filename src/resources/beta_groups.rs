use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::{
    asc::{AppStoreConnectClient, require_id},
    envelope::{
        LinkageBody, Relationship, RequestBody, RequestData, ResourceReference, ResourceType,
        Response, SingleResponse,
    },
    error::{Error, Result},
    query::{ListOptions, ListQuery},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaGroupAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub is_internal_group: Option<bool>,
    #[serde(default)]
    pub public_link_enabled: Option<bool>,
    #[serde(default)]
    pub public_link: Option<String>,
    #[serde(default)]
    pub feedback_enabled: Option<bool>,
}

/// Attributes accepted when creating a beta group.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBetaGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_internal_group: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_link_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_enabled: Option<bool>,
}

impl CreateBetaGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BetaGroupsQuery {
    query: ListQuery,
}

impl BetaGroupsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apps<I, S>(self, app_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.filter("app", app_ids))
    }

    pub fn names<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.filter("name", names))
    }

    pub fn internal(self, internal: bool) -> Self {
        self.map_query(|q| q.filter("isInternalGroup", [internal.to_string()]))
    }

    pub fn sort<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.sort(fields))
    }
}

impl ListOptions for BetaGroupsQuery {
    fn list_query(&mut self) -> &mut ListQuery {
        &mut self.query
    }

    fn into_list_query(self) -> ListQuery {
        self.query
    }
}

impl AppStoreConnectClient {
    pub async fn list_beta_groups(
        &self,
        query: BetaGroupsQuery,
    ) -> Result<Response<BetaGroupAttributes>> {
        let target = query.into_list_query().target("v1/betaGroups");
        self.get_list(&target).await
    }

    pub async fn create_beta_group(
        &self,
        app_id: &str,
        attributes: CreateBetaGroup,
    ) -> Result<SingleResponse<BetaGroupAttributes>> {
        let app_id = require_id("app id", app_id)?;
        if attributes.name.trim().is_empty() {
            return Err(Error::validation("beta group name is required"));
        }
        let body = RequestBody::new(
            RequestData::new(ResourceType::BetaGroups)
                .attributes(attributes)
                .relationship(
                    "app",
                    Relationship::one(ResourceReference::new(ResourceType::Apps, app_id)),
                ),
        );
        self.post_json("v1/betaGroups", &body).await
    }

    pub async fn add_beta_testers(&self, group_id: &str, tester_ids: &[String]) -> Result<()> {
        let group_id = require_id("beta group id", group_id)?;
        let mut data = Vec::with_capacity(tester_ids.len());
        for id in tester_ids {
            data.push(ResourceReference::new(
                ResourceType::BetaTesters,
                require_id("beta tester id", id)?,
            ));
        }
        if data.is_empty() {
            return Err(Error::validation("at least one beta tester id is required"));
        }
        self.send_no_content(
            Method::POST,
            &format!("v1/betaGroups/{}/relationships/betaTesters", group_id),
            Some(&LinkageBody { data }),
        )
        .await
    }

    pub async fn delete_beta_group(&self, group_id: &str) -> Result<()> {
        let group_id = require_id("beta group id", group_id)?;
        self.delete(&format!("v1/betaGroups/{}", group_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_ids_fail_before_any_request() {
        // Unroutable base: a network attempt would surface as Transport.
        let client = AppStoreConnectClient::with_static_token(
            "t",
            crate::ClientOptions::default()
                .with_base_url(url::Url::parse("http://127.0.0.1:9/").unwrap()),
        )
        .unwrap();

        let err = client.delete_beta_group(" ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = client
            .create_beta_group("app", CreateBetaGroup::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = client.add_beta_testers("g1", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn create_body_shape() {
        let attrs = CreateBetaGroup {
            public_link_enabled: Some(true),
            ..CreateBetaGroup::new("External")
        };
        let body = RequestBody::new(
            RequestData::new(ResourceType::BetaGroups)
                .attributes(attrs)
                .relationship(
                    "app",
                    Relationship::one(ResourceReference::new(ResourceType::Apps, "a1")),
                ),
        );
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "data": {
                    "type": "betaGroups",
                    "attributes": {"name": "External", "publicLinkEnabled": true},
                    "relationships": {"app": {"data": {"type": "apps", "id": "a1"}}}
                }
            })
        );
    }
}
