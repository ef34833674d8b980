use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, warn};
use tokio::sync::watch;

use crate::domain::errors::DomainError;
use crate::domain::invoice::Collection;

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<T>, DomainError>> + Send + Sync>;

#[derive(Debug, Clone)]
pub enum CacheState<T> {
    Empty,
    Loading,
    Ready(Collection<T>),
    Failed(DomainError),
}

impl<T> CacheState<T> {
    fn settled(&self) -> Option<Result<Collection<T>, DomainError>> {
        match self {
            CacheState::Ready(collection) => Some(Ok(Arc::clone(collection))),
            CacheState::Failed(error) => Some(Err(error.clone())),
            CacheState::Empty | CacheState::Loading => None,
        }
    }
}

/// Fetch-once cache for a server collection.
///
/// Callers asking while a fetch is in flight share that fetch. A failed fetch
/// is reported to every waiter and retried by the next `get`.
pub struct ResourceCache<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    name: &'static str,
    fetch: FetchFn<T>,
    state: watch::Sender<CacheState<T>>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> ResourceCache<T> {
    pub fn new<F, Fut>(name: &'static str, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, DomainError>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || fetch().boxed());
        let (state, _) = watch::channel(CacheState::Empty);
        Self {
            inner: Arc::new(Inner { name, fetch, state }),
        }
    }

    /// Resolve the cached collection, fetching it if nothing has been cached yet.
    pub async fn get(&self) -> Result<Collection<T>, DomainError> {
        let mut rx = self.inner.state.subscribe();

        let mut start = false;
        self.inner.state.send_if_modified(|state| match state {
            CacheState::Empty | CacheState::Failed(_) => {
                *state = CacheState::Loading;
                start = true;
                true
            }
            CacheState::Loading | CacheState::Ready(_) => false,
        });
        if start {
            self.spawn_fetch();
        } else {
            debug!("{} request served by the cache", self.inner.name);
        }

        loop {
            if let Some(result) = rx.borrow_and_update().settled() {
                return result;
            }
            rx.changed().await.map_err(|_| {
                DomainError::Internal(format!("{} cache dropped", self.inner.name))
            })?;
        }
    }

    /// Observe the cache state. The receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<CacheState<T>> {
        self.inner.state.subscribe()
    }

    /// The cached collection, if a fetch has succeeded.
    pub fn current(&self) -> Option<Collection<T>> {
        match &*self.inner.state.borrow() {
            CacheState::Ready(collection) => Some(Arc::clone(collection)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    // Runs detached so a caller that stops waiting cannot leave the cache stuck in Loading.
    fn spawn_fetch(&self) {
        let inner = Arc::clone(&self.inner);
        info!("Fetching {} collection", inner.name);
        tokio::spawn(async move {
            let next = match (inner.fetch)().await {
                Ok(items) => {
                    info!("Cached {} {} entries", items.len(), inner.name);
                    CacheState::Ready(Arc::new(items))
                }
                Err(e) => {
                    warn!("Fetching {} failed: {}", inner.name, e);
                    CacheState::Failed(e)
                }
            };
            inner.state.send_replace(next);
        });
    }
}
