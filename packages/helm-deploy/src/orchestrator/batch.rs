//! Fan-out results
//!
//! Outcomes of a group of independent per-deployment calls, kept in the
//! order the calls were issued so partial failures report deterministically.

use futures_util::future::join_all;
use std::future::Future;

use crate::error::DeployError;

/// Per-deployment outcomes of one concurrent batch
#[derive(Debug)]
pub struct BatchResult<T> {
    outcomes: Vec<(u64, Result<T, DeployError>)>,
}

impl<T> BatchResult<T> {
    /// Run `call` for every id concurrently and wait for all of them
    pub async fn run<F, Fut>(ids: &[u64], call: F) -> Self
    where
        F: Fn(u64) -> Fut,
        Fut: Future<Output = Result<T, DeployError>>,
    {
        let outcomes = join_all(ids.iter().map(|&id| {
            let fut = call(id);
            async move { (id, fut.await) }
        }))
        .await;

        Self { outcomes }
    }

    /// Ids whose call succeeded
    pub fn succeeded(&self) -> Vec<u64> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_ok())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Failed calls with their errors
    pub fn failures(&self) -> impl Iterator<Item = (u64, &DeployError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.as_ref().err().map(|e| (*id, e)))
    }

    /// The first failure in issue order, if any
    pub fn into_first_error(self) -> Option<DeployError> {
        self.outcomes
            .into_iter()
            .find_map(|(_, outcome)| outcome.err())
    }
}
