//! The pull request resource itself: a narrow capability trait plus a typed
//! accessor over the raw JSON fields.

use crate::github::{Commit, Error, Repo, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use serde_json::Value;
use tracing::instrument;
use url::Url;

/// One remote pull request, reduced to the operations the rest of the crate
/// needs. All mutable state lives server-side; implementors only carry the
/// identity of the resource and whatever client they talk through.
#[async_trait]
pub trait Pull: Send + Sync {
    /// Repository the pull request belongs to.
    fn repo(&self) -> &Repo;

    /// Pull request number.
    fn number(&self) -> u64;

    /// Fetches the full JSON document describing the pull request. Every
    /// call is a fresh GET.
    async fn snapshot(&self) -> Result<Value>;

    /// Sends a partial JSON document for the server to merge into the
    /// resource. The document is forwarded as-is, one round-trip per call.
    async fn patch(&self, doc: Value) -> Result;

    /// Merges the pull request with the given commit message. Any
    /// non-success response, merge conflicts included, surfaces as a
    /// transport error.
    async fn merge(&self, message: &str) -> Result;

    /// Commits of the pull request. The stream is lazy and finite, and
    /// every call starts pagination over from the first page.
    fn commits(&self) -> BoxStream<'_, Result<Commit>>;

    /// Changed files of the pull request, as raw JSON objects.
    fn files(&self) -> BoxStream<'_, Result<Value>>;
}

/// Typed view over the JSON fields of one pull request.
///
/// Readers fetch a fresh snapshot per call and treat an absent or
/// non-string field as a fatal contract violation: GitHub guarantees these
/// fields for a well-formed pull request, so their absence means something
/// upstream broke. Writers patch exactly the one field they name and never
/// read back; callers re-read to observe the effect.
#[derive(Debug)]
pub struct PullFields<P> {
    pull: P,
}

impl<P: Pull> PullFields<P> {
    pub fn new(pull: P) -> PullFields<P> {
        PullFields { pull }
    }

    /// True iff the pull request state is the literal `"open"`.
    pub async fn is_open(&self) -> Result<bool> {
        Ok(self.state().await? == "open")
    }

    pub async fn state(&self) -> Result<String> {
        self.string_field("state").await
    }

    pub async fn set_state(&self, state: &str) -> Result {
        self.write_field("state", state).await
    }

    pub async fn title(&self) -> Result<String> {
        self.string_field("title").await
    }

    pub async fn set_title(&self, text: &str) -> Result {
        self.write_field("title", text).await
    }

    pub async fn body(&self) -> Result<String> {
        self.string_field("body").await
    }

    pub async fn set_body(&self, text: &str) -> Result {
        self.write_field("body", text).await
    }

    /// API URL of the pull request.
    pub async fn url(&self) -> Result<Url> {
        self.url_field("url").await
    }

    /// Browser-facing URL of the pull request.
    pub async fn html_url(&self) -> Result<Url> {
        self.url_field("html_url").await
    }

    pub async fn created_at(&self) -> Result<DateTime<Utc>> {
        self.time_field("created_at").await
    }

    pub async fn updated_at(&self) -> Result<DateTime<Utc>> {
        self.time_field("updated_at").await
    }

    /// When the pull request was closed. Open pull requests carry a null
    /// here, which reads as a missing field.
    pub async fn closed_at(&self) -> Result<DateTime<Utc>> {
        self.time_field("closed_at").await
    }

    /// When the pull request was merged. Same null caveat as [`closed_at`].
    ///
    /// [`closed_at`]: PullFields::closed_at
    pub async fn merged_at(&self) -> Result<DateTime<Utc>> {
        self.time_field("merged_at").await
    }

    async fn string_field(&self, field: &'static str) -> Result<String> {
        self.read_field(field, |text| Ok(text.to_owned())).await
    }

    async fn url_field(&self, field: &'static str) -> Result<Url> {
        let number = self.pull.number();
        self.read_field(field, |text| {
            Url::parse(text).map_err(|source| Error::MalformedUrl {
                field,
                number,
                source,
            })
        })
        .await
    }

    async fn time_field(&self, field: &'static str) -> Result<DateTime<Utc>> {
        let number = self.pull.number();
        self.read_field(field, |text| {
            DateTime::parse_from_rfc3339(text)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|source| Error::MalformedTimestamp {
                    field,
                    number,
                    source,
                })
        })
        .await
    }

    /// Fetches a snapshot and runs one required string field through
    /// `convert`. Every reader funnels through here so the
    /// fetch/extract/convert behaviour exists exactly once.
    #[instrument(level = "debug", skip(self, convert), fields(pr = self.pull.number()), err)]
    async fn read_field<T>(
        &self,
        field: &'static str,
        convert: impl FnOnce(&str) -> Result<T>,
    ) -> Result<T> {
        let snapshot = self.pull.snapshot().await?;
        let text = snapshot
            .get(field)
            .and_then(Value::as_str)
            .ok_or(Error::MissingField {
                field,
                number: self.pull.number(),
            })?;
        convert(text)
    }

    #[instrument(level = "debug", skip(self, value), fields(pr = self.pull.number()), err)]
    async fn write_field(&self, field: &'static str, value: &str) -> Result {
        let mut doc = serde_json::Map::new();
        doc.insert(field.to_owned(), Value::String(value.to_owned()));
        self.pull.patch(Value::Object(doc)).await
    }
}
