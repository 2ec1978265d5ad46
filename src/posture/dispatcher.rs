//! Posture dispatch - answers engine posture queries on the event loop.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::oneshot;

use super::types::{OsInfo, PostureQuery, PostureResponse, ProcessInfo};
use crate::error::Result;
use crate::logging::LogLevel;
use crate::runner::LoopRunner;

const LOCATION: &str = "meshloop::posture";

/// Host capability that supplies posture facts.
#[async_trait]
pub trait PostureProvider: Send + Sync {
    /// Windows domain (or equivalent) the host belongs to
    async fn domain(&self) -> Result<String>;

    async fn process(&self, path: &Path) -> Result<ProcessInfo>;

    async fn os(&self) -> Result<OsInfo>;

    async fn mac_addresses(&self) -> Result<Vec<String>>;
}

/// Answer a single query from `provider`.
pub async fn answer(provider: &dyn PostureProvider, query: PostureQuery) -> Result<PostureResponse> {
    let response = match query {
        PostureQuery::Domain { id } => PostureResponse::Domain {
            domain: provider.domain().await?,
            id,
        },
        PostureQuery::Process { id, path } => PostureResponse::Process {
            info: provider.process(&path).await?,
            id,
            path,
        },
        PostureQuery::Os { id } => PostureResponse::Os {
            info: provider.os().await?,
            id,
        },
        PostureQuery::Mac { id } => PostureResponse::Mac {
            addresses: provider.mac_addresses().await?,
            id,
        },
    };
    Ok(response)
}

/// Runs posture queries on a loop and hands the responses back.
#[derive(Clone)]
pub struct PostureDispatcher {
    provider: Arc<dyn PostureProvider>,
}

impl PostureDispatcher {
    pub fn new(provider: Arc<dyn PostureProvider>) -> Self {
        Self { provider }
    }

    /// Answer `query` on the loop and invoke `on_response` there with the result.
    pub fn submit_with<F>(&self, runner: &LoopRunner, query: PostureQuery, on_response: F) -> Result<()>
    where
        F: FnOnce(Result<PostureResponse>) + Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        let logger = runner.logger().clone();
        runner.spawn(async move {
            let id = query.id().to_string();
            let kind = query.kind();
            let result = answer(provider.as_ref(), query).await;
            match &result {
                Ok(_) => logger.log(
                    LogLevel::Debug,
                    LOCATION,
                    format_args!("answered {} posture query {}", kind, id),
                ),
                Err(e) => logger.log(
                    LogLevel::Warn,
                    LOCATION,
                    format_args!("{} posture query {} failed: {}", kind, id, e),
                ),
            }
            on_response(result);
        })?;
        Ok(())
    }

    /// Answer `query` on the loop; the result arrives on the returned receiver.
    pub fn submit(
        &self,
        runner: &LoopRunner,
        query: PostureQuery,
    ) -> Result<oneshot::Receiver<Result<PostureResponse>>> {
        let (tx, rx) = oneshot::channel();
        self.submit_with(runner, query, move |result| {
            let _ = tx.send(result);
        })?;
        Ok(rx)
    }

    /// Answer a batch of queries concurrently on the loop, preserving order.
    pub fn submit_batch(
        &self,
        runner: &LoopRunner,
        queries: Vec<PostureQuery>,
    ) -> Result<oneshot::Receiver<Vec<Result<PostureResponse>>>> {
        let (tx, rx) = oneshot::channel();
        let provider = Arc::clone(&self.provider);
        runner.spawn(async move {
            let answers = queries.into_iter().map(|query| {
                let provider = Arc::clone(&provider);
                async move { answer(provider.as_ref(), query).await }
            });
            let _ = tx.send(join_all(answers).await);
        })?;
        Ok(rx)
    }
}
