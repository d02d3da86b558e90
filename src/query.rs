//! Query strings for list endpoints.
//!
//! A [`ListQuery`] collects limit, filters, sorts, sparse fieldsets and
//! includes, then serializes them into a canonical query string. A
//! server-provided `next` cursor URL overrides everything else.

use std::collections::BTreeMap;

use url::{Url, form_urlencoded};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    limit: i64,
    next_url: Option<String>,
    filters: BTreeMap<String, Vec<String>>,
    sorts: Vec<String>,
    fields: BTreeMap<String, Vec<String>>,
    include: Vec<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size. Values `<= 0` leave the server default in place.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Fetch the page at `url` verbatim; every other option is ignored.
    pub fn next_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.next_url = if url.trim().is_empty() {
            None
        } else {
            Some(url.trim().to_string())
        };
        self
    }

    pub fn filter<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_values(self.filters.entry(name.to_string()).or_default(), values, false);
        self
    }

    /// Like [`ListQuery::filter`] for enumerated values, which the API
    /// expects upper-cased (`ios` becomes `IOS`).
    pub fn filter_enum<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_values(self.filters.entry(name.to_string()).or_default(), values, true);
        self
    }

    /// Sort keys in priority order; prefix with `-` for descending.
    pub fn sort<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_values(&mut self.sorts, fields, false);
        self
    }

    pub fn fields<I, S>(mut self, resource_type: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_values(
            self.fields.entry(resource_type.to_string()).or_default(),
            fields,
            false,
        );
        self
    }

    pub fn include<I, S>(mut self, relationships: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_values(&mut self.include, relationships, false);
        self
    }

    pub fn get_next_url(&self) -> Option<&str> {
        self.next_url.as_deref()
    }

    pub fn get_limit(&self) -> i64 {
        self.limit
    }

    /// Canonical query string without the leading `?`. Empty when no
    /// option applies. A set `next_url` is not part of the query string.
    pub fn encode(&self) -> String {
        let mut pairs: BTreeMap<String, String> = BTreeMap::new();
        for (ty, values) in &self.fields {
            if !values.is_empty() {
                pairs.insert(format!("fields[{ty}]"), values.join(","));
            }
        }
        for (name, values) in &self.filters {
            if !values.is_empty() {
                pairs.insert(format!("filter[{name}]"), values.join(","));
            }
        }
        if !self.include.is_empty() {
            pairs.insert("include".into(), self.include.join(","));
        }
        if self.limit > 0 {
            pairs.insert("limit".into(), self.limit.to_string());
        }
        if !self.sorts.is_empty() {
            pairs.insert("sort".into(), self.sorts.join(","));
        }
        if pairs.is_empty() {
            return String::new();
        }
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish()
    }

    /// Request target for `path`: the next cursor URL when set, otherwise
    /// `path` with the encoded query appended.
    pub fn target(&self, path: &str) -> String {
        if let Some(next) = &self.next_url {
            return next.clone();
        }
        let query = self.encode();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }
}

/// Options shared by every endpoint-specific query type. Implementors
/// embed a [`ListQuery`] and add their own typed filters.
pub trait ListOptions: Sized {
    fn list_query(&mut self) -> &mut ListQuery;

    fn into_list_query(self) -> ListQuery;

    fn map_query(mut self, f: impl FnOnce(ListQuery) -> ListQuery) -> Self {
        let query = std::mem::take(self.list_query());
        *self.list_query() = f(query);
        self
    }

    fn limit(self, limit: i64) -> Self {
        self.map_query(|q| q.limit(limit))
    }

    fn next_url(self, url: impl Into<String>) -> Self {
        self.map_query(|q| q.next_url(url))
    }

    fn fields<I, S>(self, resource_type: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.fields(resource_type, fields))
    }

    fn include<I, S>(self, relationships: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map_query(|q| q.include(relationships))
    }
}

fn push_values<I, S>(dest: &mut Vec<String>, values: I, upper: bool)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for value in values {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = if upper {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        };
        if !dest.contains(&value) {
            dest.push(value);
        }
    }
}

/// Splits a comma-separated CLI argument into values.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn same_origin(base: &Url, url: &Url) -> bool {
    url.scheme() == base.scheme()
        && url.host_str() == base.host_str()
        && url.port_or_known_default() == base.port_or_known_default()
}

/// Cursor URLs must point at the same scheme, host and port as `base`.
pub fn validate_next_url(base: &Url, next: &str) -> Result<Url> {
    let url = Url::parse(next)
        .map_err(|e| Error::validation(format!("invalid next URL {next:?}: {e}")))?;
    if !same_origin(base, &url) {
        return Err(Error::validation(format!(
            "next URL {next:?} does not belong to {}",
            base.origin().ascii_serialization()
        )));
    }
    Ok(url)
}
