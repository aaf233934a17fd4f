//! Synchronous client for one tenant/scope pair.
//!
//! Every operation is a single round trip. Writes send their attributes as
//! URL-encoded parameters, never as a JSON body.

use crate::config::{global, RssConfig};
use crate::core::params::to_pairs;
use crate::core::prepare::{
    occurrence_list, occurrence_payload, prepare_occurrence, prepare_rule, prepare_series,
    sanitize_filters,
};
use crate::core::request::{send, NotFound, Outcome, Verb};
use crate::domain::value::Attributes;
use crate::domain::{ConfigProvider, Occurrence};
use crate::utils::error::Result;
use chrono_tz::Tz;
use reqwest::blocking::Client;
use serde_json::{Map, Value};

pub struct Connector<C: ConfigProvider = RssConfig> {
    config: C,
    zone: Tz,
    client: Client,
    tenant_id: String,
    scope: String,
}

impl<C: ConfigProvider> Connector<C> {
    /// Fails when the configured time zone is unknown.
    pub fn new(config: C, tenant_id: impl Into<String>, scope: impl Into<String>) -> Result<Self> {
        Self::with_client(config, Client::new(), tenant_id, scope)
    }

    /// Use a preconfigured HTTP client (proxies, timeouts, TLS roots).
    pub fn with_client(
        config: C,
        client: Client,
        tenant_id: impl Into<String>,
        scope: impl Into<String>,
    ) -> Result<Self> {
        let zone = config.time_zone()?;
        Ok(Self {
            config,
            zone,
            client,
            tenant_id: tenant_id.into(),
            scope: scope.into(),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn base_path(&self) -> String {
        format!("/v1/{}/{}", self.tenant_id, self.scope)
    }

    // series

    /// GET `/series/{id}`; the resource is read from the `series` key.
    pub fn get_series(&self, series_id: &str) -> Result<Option<Value>> {
        let path = format!("{}/series/{}", self.base_path(), series_id);
        let outcome = self.call(Verb::Get, &path, &Map::new(), NotFound::Absent)?;
        Ok(outcome
            .into_option()
            .map(|body| take_key(body, "series"))
            .filter(|series| !series.is_null()))
    }

    pub fn create_series(&self, attributes: &Attributes) -> Result<Value> {
        let path = format!("{}/series", self.base_path());
        let params = prepare_series(attributes, self.zone())?;
        self.call_required(Verb::Post, &path, &params)
    }

    pub fn create_or_update_series(
        &self,
        series_id: &str,
        attributes: &Attributes,
    ) -> Result<Value> {
        let path = format!("{}/series/{}", self.base_path(), series_id);
        let params = prepare_series(attributes, self.zone())?;
        self.call_required(Verb::Put, &path, &params)
    }

    pub fn update_series(&self, series_id: &str, attributes: &Attributes) -> Result<Option<Value>> {
        let path = format!("{}/series/{}", self.base_path(), series_id);
        let params = prepare_series(attributes, self.zone())?;
        Ok(self
            .call(Verb::Patch, &path, &params, NotFound::Absent)?
            .into_option())
    }

    pub fn delete_series(&self, series_id: &str) -> Result<Option<Value>> {
        let path = format!("{}/series/{}", self.base_path(), series_id);
        Ok(self
            .call(Verb::Delete, &path, &Map::new(), NotFound::Absent)?
            .into_option())
    }

    // rules

    pub fn get_rule(&self, rule_id: &str) -> Result<Option<Value>> {
        let path = format!("{}/rules/{}", self.base_path(), rule_id);
        Ok(self
            .call(Verb::Get, &path, &Map::new(), NotFound::Absent)?
            .into_option())
    }

    /// GET `/rules`; the list is read from the `rules` key and is empty when missing.
    pub fn get_rules(&self, filters: &Attributes) -> Result<Option<Vec<Value>>> {
        let path = format!("{}/rules", self.base_path());
        let outcome = self.call(Verb::Get, &path, &sanitize_filters(filters), NotFound::Absent)?;
        Ok(outcome
            .into_option()
            .map(|body| match take_key(body, "rules") {
                Value::Array(items) => items,
                _ => Vec::new(),
            }))
    }

    pub fn create_rule(&self, attributes: &Attributes) -> Result<Value> {
        let path = format!("{}/rules", self.base_path());
        let params = prepare_rule(attributes, None, self.zone())?;
        self.call_required(Verb::Post, &path, &params)
    }

    pub fn create_or_update_rule(&self, rule_id: &str, attributes: &Attributes) -> Result<Value> {
        let path = format!("{}/rules/{}", self.base_path(), rule_id);
        let params = prepare_rule(attributes, None, self.zone())?;
        self.call_required(Verb::Put, &path, &params)
    }

    pub fn update_rule(&self, rule_id: &str, attributes: &Attributes) -> Result<Option<Value>> {
        let path = format!("{}/rules/{}", self.base_path(), rule_id);
        let params = prepare_rule(attributes, None, self.zone())?;
        Ok(self
            .call(Verb::Patch, &path, &params, NotFound::Absent)?
            .into_option())
    }

    pub fn delete_rule(&self, rule_id: &str) -> Result<Option<Value>> {
        let path = format!("{}/rules/{}", self.base_path(), rule_id);
        Ok(self
            .call(Verb::Delete, &path, &Map::new(), NotFound::Absent)?
            .into_option())
    }

    // occurrences

    /// GET `/occurrences`. Unlike the other reads, a 404 here is an error.
    pub fn get_occurrences(&self, filters: &Attributes) -> Result<Vec<Occurrence>> {
        let path = format!("{}/occurrences", self.base_path());
        let body = self.call_required(Verb::Get, &path, &sanitize_filters(filters))?;
        occurrence_list(take_key(body, "occurrences"), self.zone())
    }

    pub fn get_occurrence(&self, occurrence_id: &str) -> Result<Option<Occurrence>> {
        let path = format!("{}/occurrences/{}", self.base_path(), occurrence_id);
        match self.call(Verb::Get, &path, &Map::new(), NotFound::Absent)? {
            Outcome::Payload(body) => occurrence_payload(take_key(body, "occurrence"), self.zone()),
            Outcome::Absent => Ok(None),
        }
    }

    pub fn update_occurrence(
        &self,
        occurrence_id: &str,
        attributes: &Attributes,
    ) -> Result<Option<Occurrence>> {
        let path = format!("{}/occurrences/{}", self.base_path(), occurrence_id);
        let params = prepare_occurrence(attributes);
        match self.call(Verb::Patch, &path, &params, NotFound::Absent)? {
            Outcome::Payload(body) => occurrence_payload(take_key(body, "occurrence"), self.zone()),
            Outcome::Absent => Ok(None),
        }
    }

    pub fn delete_occurrence(&self, occurrence_id: &str) -> Result<Option<Value>> {
        let path = format!("{}/occurrences/{}", self.base_path(), occurrence_id);
        Ok(self
            .call(Verb::Delete, &path, &Map::new(), NotFound::Absent)?
            .into_option())
    }

    fn zone(&self) -> Tz {
        self.zone
    }

    fn call(
        &self,
        verb: Verb,
        path: &str,
        params: &Map<String, Value>,
        not_found: NotFound,
    ) -> Result<Outcome> {
        send(
            &self.client,
            &self.config,
            verb,
            path,
            &to_pairs(params),
            not_found,
        )
    }

    /// For operations with no not-found outcome.
    fn call_required(&self, verb: Verb, path: &str, params: &Map<String, Value>) -> Result<Value> {
        match self.call(verb, path, params, NotFound::Fail)? {
            Outcome::Payload(body) => Ok(body),
            Outcome::Absent => Ok(Value::Null),
        }
    }
}

impl Connector<RssConfig> {
    /// Build from the process-wide configuration; fails if no base address is set.
    pub fn from_global(tenant_id: impl Into<String>, scope: impl Into<String>) -> Result<Self> {
        Self::new(global::load()?, tenant_id, scope)
    }
}

/// Value under `key` of an object payload; `null` when missing.
fn take_key(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
