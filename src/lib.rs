//! Typed access to a single GitHub pull request through its raw JSON
//! representation.
//!
//! [`pr::Pull`] is the narrow capability a pull request exposes,
//! [`github::GithubPull`] binds it to the GitHub API through octocrab, and
//! [`pr::PullFields`] layers typed field accessors on top of any
//! implementor of the trait.

pub mod github;
pub mod pr;

pub use github::{Commit, Error, GithubPull, Repo, Result};
pub use pr::{Pull, PullFields};
