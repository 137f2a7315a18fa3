//! Undo stack for operations that span the relational and vector stores.

use futures::future::BoxFuture;

use crate::error::WallpaperResult;

type Compensation = Box<dyn FnOnce() -> BoxFuture<'static, WallpaperResult<()>> + Send>;

/// Records compensations as steps succeed. `rollback` runs them newest first,
/// `commit` discards them.
#[derive(Default)]
pub struct Saga {
    steps: Vec<(&'static str, Compensation)>,
}

impl Saga {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_compensation<F>(&mut self, name: &'static str, compensation: F)
    where
        F: FnOnce() -> BoxFuture<'static, WallpaperResult<()>> + Send + 'static,
    {
        self.steps.push((name, Box::new(compensation)));
    }

    /// Runs every compensation in reverse order. Failures are logged and do not
    /// stop the remaining compensations.
    pub async fn rollback(mut self) {
        while let Some((name, compensation)) = self.steps.pop() {
            match compensation().await {
                Ok(()) => tracing::info!(step = name, "Compensation completed"),
                Err(e) => tracing::error!(step = name, error = %e, "Compensation failed"),
            }
        }
    }

    pub fn commit(mut self) {
        self.steps.clear();
    }
}

impl Drop for Saga {
    fn drop(&mut self) {
        if !self.steps.is_empty() {
            let steps: Vec<&str> = self.steps.iter().map(|(name, _)| *name).collect();
            tracing::warn!(?steps, "Saga dropped with pending compensations");
        }
    }
}
