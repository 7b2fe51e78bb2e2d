//! Octocrab-backed access to the GitHub pull request API. Everything remote
//! sits behind the [`Pull`](crate::pr::Pull) trait so it can be replaced and
//! mocked out for use when testing other parts of the codebase.

use crate::pr::Pull;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use octocrab::Octocrab;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::VecDeque;
use tracing::instrument;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Repo {
    owner: String,
    name: String,
}

impl Repo {
    pub fn new(owner: String, name: String) -> Repo {
        Repo { owner, name }
    }

    pub fn from_path(path: &str) -> Result<Repo> {
        let segments: Vec<_> = path.split('/').collect();
        if segments.len() != 2 || segments.iter().any(|segment| segment.is_empty()) {
            return Err(Error::InvalidPath(path.into()));
        }

        Ok(Repo::new(segments[0].into(), segments[1].into()))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One entry of a pull request's commit listing. Only the fields callers
/// actually consume are modelled; the rest of the payload is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub html_url: String,
    pub commit: CommitInfo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitInfo {
    pub message: String,
    pub author: Option<CommitSignature>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitSignature {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

const PER_PAGE: u8 = 100;

#[derive(Serialize)]
struct PageQuery {
    per_page: u8,
    page: u32,
}

/// Handle on one remote pull request. The handle itself is immutable and
/// holds no cached state; every read is a fresh round-trip.
#[derive(Debug, Clone)]
pub struct GithubPull {
    octo: Octocrab,
    repo: Repo,
    number: u64,
}

impl GithubPull {
    pub fn new(octo: Octocrab, repo: Repo, number: u64) -> GithubPull {
        GithubPull { octo, repo, number }
    }

    fn path(&self) -> String {
        format!(
            "/repos/{}/{}/pulls/{}",
            self.repo.owner(),
            self.repo.name(),
            self.number
        )
    }

    /// Streams one of the paginated sub-resources. The stream is lazy: the
    /// first request only goes out once it is polled, and the page counter
    /// advances until GitHub returns an empty page.
    fn paged<T>(&self, tail: &str) -> BoxStream<'static, Result<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        struct Cursor<T> {
            page: u32,
            buffered: VecDeque<T>,
            exhausted: bool,
        }

        let octo = self.octo.clone();
        let route = format!("{}/{}", self.path(), tail);
        stream::try_unfold(
            Cursor {
                page: 1,
                buffered: VecDeque::new(),
                exhausted: false,
            },
            move |mut cursor| {
                let octo = octo.clone();
                let route = route.clone();
                async move {
                    loop {
                        if let Some(item) = cursor.buffered.pop_front() {
                            return Ok(Some((item, cursor)));
                        }
                        if cursor.exhausted {
                            return Ok(None);
                        }
                        let page: Vec<T> = octo
                            .get(
                                &route,
                                Some(&PageQuery {
                                    per_page: PER_PAGE,
                                    page: cursor.page,
                                }),
                            )
                            .await
                            .map_err(Error::from)?;
                        if page.is_empty() {
                            cursor.exhausted = true;
                        } else {
                            cursor.page += 1;
                            cursor.buffered.extend(page);
                        }
                    }
                }
            },
        )
        .boxed()
    }
}

// Pull requests sort naturally by their number; the repository is not part
// of the comparison key.
impl PartialEq for GithubPull {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for GithubPull {}

impl PartialOrd for GithubPull {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GithubPull {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

#[async_trait]
impl Pull for GithubPull {
    fn repo(&self) -> &Repo {
        &self.repo
    }

    fn number(&self) -> u64 {
        self.number
    }

    #[instrument(level = "debug", skip(self), fields(pr = self.number), err)]
    async fn snapshot(&self) -> Result<Value> {
        Ok(self.octo.get(self.path(), None::<&()>).await?)
    }

    #[instrument(level = "debug", skip(self), fields(pr = self.number), err)]
    async fn patch(&self, doc: Value) -> Result {
        let _: Value = self.octo.patch(self.path(), Some(&doc)).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self), fields(pr = self.number), err)]
    async fn merge(&self, message: &str) -> Result {
        let route = format!("{}/merge", self.path());
        let _: Value = self
            .octo
            .put(route, Some(&json!({ "commit_message": message })))
            .await?;
        Ok(())
    }

    fn commits(&self) -> BoxStream<'_, Result<Commit>> {
        self.paged("commits")
    }

    fn files(&self) -> BoxStream<'_, Result<Value>> {
        self.paged("files")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("github path {0} is an invalid github path")]
    InvalidPath(String),
    #[error("error talking to github api: {0}")]
    Transport(#[from] octocrab::Error),
    #[error("{field} is missing or not a string in pull request #{number}")]
    MissingField { field: &'static str, number: u64 },
    #[error("{field} of pull request #{number} is not a valid url: {source}")]
    MalformedUrl {
        field: &'static str,
        number: u64,
        source: url::ParseError,
    },
    #[error("{field} of pull request #{number} is not a valid timestamp: {source}")]
    MalformedTimestamp {
        field: &'static str,
        number: u64,
        source: chrono::ParseError,
    },
}

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
