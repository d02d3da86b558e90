//! JSON:API envelopes shared by every resource family.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{Error, Result};

/// Type tag of a JSON:API resource object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    Apps,
    AppInfos,
    AppStoreVersions,
    AppStoreVersionLocalizations,
    BetaAppReviewSubmissions,
    BetaBuildLocalizations,
    BetaGroups,
    BetaTesters,
    BuildBetaDetails,
    Builds,
    BundleIds,
    Certificates,
    CiBuildRuns,
    CiProducts,
    CiWorkflows,
    CustomerReviews,
    Devices,
    GameCenterAchievements,
    GameCenterDetails,
    GameCenterLeaderboards,
    InAppPurchasePricePoints,
    InAppPurchasePriceSchedules,
    InAppPurchasePrices,
    InAppPurchases,
    PreReleaseVersions,
    Profiles,
    ScmGitReferences,
    SubscriptionGroups,
    Subscriptions,
    Territories,
    Users,
    Webhooks,
    /// A tag this crate does not know about, kept verbatim.
    Unknown(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Apps => "apps",
            ResourceType::AppInfos => "appInfos",
            ResourceType::AppStoreVersions => "appStoreVersions",
            ResourceType::AppStoreVersionLocalizations => "appStoreVersionLocalizations",
            ResourceType::BetaAppReviewSubmissions => "betaAppReviewSubmissions",
            ResourceType::BetaBuildLocalizations => "betaBuildLocalizations",
            ResourceType::BetaGroups => "betaGroups",
            ResourceType::BetaTesters => "betaTesters",
            ResourceType::BuildBetaDetails => "buildBetaDetails",
            ResourceType::Builds => "builds",
            ResourceType::BundleIds => "bundleIds",
            ResourceType::Certificates => "certificates",
            ResourceType::CiBuildRuns => "ciBuildRuns",
            ResourceType::CiProducts => "ciProducts",
            ResourceType::CiWorkflows => "ciWorkflows",
            ResourceType::CustomerReviews => "customerReviews",
            ResourceType::Devices => "devices",
            ResourceType::GameCenterAchievements => "gameCenterAchievements",
            ResourceType::GameCenterDetails => "gameCenterDetails",
            ResourceType::GameCenterLeaderboards => "gameCenterLeaderboards",
            ResourceType::InAppPurchasePricePoints => "inAppPurchasePricePoints",
            ResourceType::InAppPurchasePriceSchedules => "inAppPurchasePriceSchedules",
            ResourceType::InAppPurchasePrices => "inAppPurchasePrices",
            ResourceType::InAppPurchases => "inAppPurchases",
            ResourceType::PreReleaseVersions => "preReleaseVersions",
            ResourceType::Profiles => "profiles",
            ResourceType::ScmGitReferences => "scmGitReferences",
            ResourceType::SubscriptionGroups => "subscriptionGroups",
            ResourceType::Subscriptions => "subscriptions",
            ResourceType::Territories => "territories",
            ResourceType::Users => "users",
            ResourceType::Webhooks => "webhooks",
            ResourceType::Unknown(tag) => tag,
        }
    }
}

impl From<String> for ResourceType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "apps" => ResourceType::Apps,
            "appInfos" => ResourceType::AppInfos,
            "appStoreVersions" => ResourceType::AppStoreVersions,
            "appStoreVersionLocalizations" => ResourceType::AppStoreVersionLocalizations,
            "betaAppReviewSubmissions" => ResourceType::BetaAppReviewSubmissions,
            "betaBuildLocalizations" => ResourceType::BetaBuildLocalizations,
            "betaGroups" => ResourceType::BetaGroups,
            "betaTesters" => ResourceType::BetaTesters,
            "buildBetaDetails" => ResourceType::BuildBetaDetails,
            "builds" => ResourceType::Builds,
            "bundleIds" => ResourceType::BundleIds,
            "certificates" => ResourceType::Certificates,
            "ciBuildRuns" => ResourceType::CiBuildRuns,
            "ciProducts" => ResourceType::CiProducts,
            "ciWorkflows" => ResourceType::CiWorkflows,
            "customerReviews" => ResourceType::CustomerReviews,
            "devices" => ResourceType::Devices,
            "gameCenterAchievements" => ResourceType::GameCenterAchievements,
            "gameCenterDetails" => ResourceType::GameCenterDetails,
            "gameCenterLeaderboards" => ResourceType::GameCenterLeaderboards,
            "inAppPurchasePricePoints" => ResourceType::InAppPurchasePricePoints,
            "inAppPurchasePriceSchedules" => ResourceType::InAppPurchasePriceSchedules,
            "inAppPurchasePrices" => ResourceType::InAppPurchasePrices,
            "inAppPurchases" => ResourceType::InAppPurchases,
            "preReleaseVersions" => ResourceType::PreReleaseVersions,
            "profiles" => ResourceType::Profiles,
            "scmGitReferences" => ResourceType::ScmGitReferences,
            "subscriptionGroups" => ResourceType::SubscriptionGroups,
            "subscriptions" => ResourceType::Subscriptions,
            "territories" => ResourceType::Territories,
            "users" => ResourceType::Users,
            "webhooks" => ResourceType::Webhooks,
            _ => ResourceType::Unknown(tag),
        }
    }
}

impl From<ResourceType> for String {
    fn from(kind: ResourceType) -> Self {
        match kind {
            ResourceType::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{type, id}` pair used in relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub id: String,
}

impl ResourceReference {
    pub fn new(kind: ResourceType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Reference to a resource created inline in the same request's
    /// `included` array, e.g. `${local-price-1}`.
    pub fn local(kind: ResourceType, name: &str) -> Self {
        Self::new(kind, format!("${{{name}}}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

/// Relationship linkage: one reference, many, or explicitly none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<ResourceReference>),
    One(ResourceReference),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Linkage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl Relationship {
    pub fn one(reference: ResourceReference) -> Self {
        Self {
            data: Some(Linkage::One(reference)),
            links: None,
        }
    }

    pub fn many(references: impl IntoIterator<Item = ResourceReference>) -> Self {
        Self {
            data: Some(Linkage::Many(references.into_iter().collect())),
            links: None,
        }
    }

    /// ID of a to-one relationship stub.
    pub fn id(&self) -> Option<&str> {
        match &self.data {
            Some(Linkage::One(r)) => Some(&r.id),
            _ => None,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        match &self.data {
            Some(Linkage::One(r)) => vec![r.id.as_str()],
            Some(Linkage::Many(rs)) => rs.iter().map(|r| r.id.as_str()).collect(),
            None => Vec::new(),
        }
    }
}

pub type Relationships = BTreeMap<String, Relationship>;

/// A resource object whose attributes decode as `A`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<A> {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<A>,
    #[serde(default, skip_serializing_if = "Relationships::is_empty")]
    pub relationships: Relationships,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl<A> Resource<A> {
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    pub fn reference(&self) -> ResourceReference {
        ResourceReference::new(self.kind.clone(), self.id.clone())
    }
}

/// An entry of `included`; attributes stay raw until asked for.
pub type IncludedResource = Resource<Value>;

impl IncludedResource {
    pub fn attributes_as<A: DeserializeOwned>(&self) -> Result<Option<A>> {
        self.attributes
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(Error::Decode)
    }
}

/// Envelope whose `data` is exactly one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleResponse<A> {
    pub data: Resource<A>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<IncludedResource>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingInformation {
    #[serde(default)]
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
}

/// Envelope whose `data` is a page of resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<A> {
    pub data: Vec<Resource<A>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<IncludedResource>,
    #[serde(default)]
    pub links: Links,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PagingInformation>,
}

impl<A> Response<A> {
    pub fn next_url(&self) -> Option<&str> {
        self.links.next.as_deref().filter(|s| !s.is_empty())
    }
}

/// Looks up an included resource by type and id.
pub fn find_included<'a>(
    included: &'a [IncludedResource],
    kind: ResourceType,
    id: &str,
) -> Option<&'a IncludedResource> {
    included.iter().find(|r| r.kind == kind && r.id == id)
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(Error::Decode)
}

pub fn decode_single<A: DeserializeOwned>(body: &[u8]) -> Result<SingleResponse<A>> {
    decode(body)
}

pub fn decode_list<A: DeserializeOwned>(body: &[u8]) -> Result<Response<A>> {
    decode(body)
}

/// Body of a create or update request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody<A> {
    pub data: RequestData<A>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<RequestData<Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestData<A> {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<A>,
    #[serde(skip_serializing_if = "Relationships::is_empty")]
    pub relationships: Relationships,
}

impl<A> RequestData<A> {
    pub fn new(kind: ResourceType) -> Self {
        Self {
            kind,
            id: None,
            attributes: None,
            relationships: Relationships::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn attributes(mut self, attributes: A) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn relationship(mut self, name: &str, relationship: Relationship) -> Self {
        self.relationships.insert(name.to_string(), relationship);
        self
    }
}

impl<A> RequestBody<A> {
    pub fn new(data: RequestData<A>) -> Self {
        Self {
            data,
            included: Vec::new(),
        }
    }

    pub fn include(mut self, resource: RequestData<Value>) -> Self {
        self.included.push(resource);
        self
    }
}

/// Body of a relationship endpoint (`/relationships/<name>`).
#[derive(Debug, Clone, Serialize)]
pub struct LinkageBody {
    pub data: Vec<ResourceReference>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct AppAttrs {
        name: String,
        bundle_id: String,
    }

    #[test]
    fn list_envelope_decodes_links_and_relationships() {
        let body = json!({
            "data": [{
                "type": "apps",
                "id": "1",
                "attributes": {"name": "Demo", "bundleId": "com.example.demo"},
                "relationships": {"builds": {"links": {"related": "https://x/v1/apps/1/builds"}}}
            }],
            "links": {"self": "https://x/v1/apps", "next": "https://x/v1/apps?cursor=2"},
            "meta": {"paging": {"total": 3, "limit": 1}}
        });
        let resp: Response<AppAttrs> = decode_list(body.to_string().as_bytes()).unwrap();
        assert_eq!(resp.data.len(), 1);
        assert_eq!(resp.data[0].kind, ResourceType::Apps);
        assert_eq!(resp.data[0].attributes.as_ref().unwrap().bundle_id, "com.example.demo");
        assert_eq!(resp.next_url(), Some("https://x/v1/apps?cursor=2"));
        assert_eq!(resp.meta.unwrap().paging.total, 3);
        assert!(resp.data[0].relationship("builds").unwrap().data.is_none());
    }

    #[test]
    fn single_envelope_rejects_list_data() {
        let body = br#"{"data":[{"type":"apps","id":"1"}]}"#;
        assert!(matches!(decode_single::<Value>(body), Err(Error::Decode(_))));
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = decode_list::<Value>(br#"{"data":[}"#).unwrap_err();
        assert!(err.to_string().contains("failed to parse response"));
    }

    #[test]
    fn unknown_type_tags_fall_back() {
        let body = br#"{"data":{"type":"somethingNew","id":"9"},"included":[{"type":"builds","id":"b1","attributes":{"version":"42"}}]}"#;
        let resp: SingleResponse<Value> = decode_single(body).unwrap();
        assert_eq!(resp.data.kind, ResourceType::Unknown("somethingNew".into()));
        assert_eq!(resp.data.reference().kind.as_str(), "somethingNew");
        let echoed = serde_json::to_value(&resp.data).unwrap();
        assert_eq!(echoed["type"], "somethingNew");
        let build = find_included(&resp.included, ResourceType::Builds, "b1").unwrap();
        let attrs: Value = build.attributes_as().unwrap().unwrap();
        assert_eq!(attrs["version"], "42");
    }

    #[test]
    fn known_tags_round_trip() {
        let kind: ResourceType = serde_json::from_value(json!("betaGroups")).unwrap();
        assert_eq!(kind, ResourceType::BetaGroups);
        assert_eq!(serde_json::to_value(&kind).unwrap(), json!("betaGroups"));
        assert_eq!(ResourceType::from("apps".to_string()), ResourceType::Apps);
    }

    #[test]
    fn to_one_and_to_many_relationships() {
        let body = json!({
            "type": "builds",
            "id": "b1",
            "relationships": {
                "app": {"data": {"type": "apps", "id": "a1"}},
                "betaGroups": {"data": [{"type": "betaGroups", "id": "g1"}, {"type": "betaGroups", "id": "g2"}]}
            }
        });
        let res: Resource<Value> = serde_json::from_value(body).unwrap();
        assert_eq!(res.relationship("app").unwrap().id(), Some("a1"));
        assert_eq!(res.relationship("betaGroups").unwrap().ids(), vec!["g1", "g2"]);
    }

    #[test]
    fn request_body_with_local_placeholder() {
        let price = RequestData::new(ResourceType::InAppPurchasePrices)
            .id("${local-price-1}")
            .attributes(json!({"startDate": null}));
        let body = RequestBody::new(
            RequestData::<Value>::new(ResourceType::InAppPurchasePriceSchedules).relationship(
                "manualPrices",
                Relationship::many([ResourceReference::local(
                    ResourceType::InAppPurchasePrices,
                    "local-price-1",
                )]),
            ),
        )
        .include(price);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["data"]["type"], "inAppPurchasePriceSchedules");
        assert!(v["data"].get("id").is_none());
        assert!(v["data"].get("attributes").is_none());
        assert_eq!(
            v["data"]["relationships"]["manualPrices"]["data"][0]["id"],
            "${local-price-1}"
        );
        assert_eq!(v["included"][0]["id"], "${local-price-1}");
    }
}
