//! Scoped ownership of resources that must be released asynchronously.
//!
//! [`ExitStack`] records every successfully opened resource and releases them
//! last-in-first-out when [`ExitStack::close`] runs. Callers capture the
//! outcome of their scope first and close the stack on every path, so a
//! failed acquisition or a failing chat loop still tears down what was
//! already opened.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// A resource with an asynchronous release routine.
#[async_trait]
pub trait Release: Send + Sync {
    async fn release(&self) -> Result<(), String>;
}

struct Entry {
    label: String,
    resource: Arc<dyn Release>,
}

#[derive(Default)]
pub struct ExitStack {
    entries: Vec<Entry>,
}

impl ExitStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Awaits `open` and registers the resource for release on success.
    /// Nothing is registered when the open fails.
    pub async fn enter<T, E, F>(&mut self, label: impl Into<String>, open: F) -> Result<Arc<T>, E>
    where
        T: Release + 'static,
        F: Future<Output = Result<T, E>>,
    {
        let label = label.into();
        let resource = Arc::new(open.await?);
        self.push(label, resource.clone());
        Ok(resource)
    }

    /// Registers an already-open resource.
    pub fn push(&mut self, label: impl Into<String>, resource: Arc<dyn Release>) {
        let label = label.into();
        debug!(label = %label, depth = self.entries.len() + 1, "Registered scoped resource");
        self.entries.push(Entry { label, resource });
    }

    /// Releases every registered resource in reverse registration order.
    ///
    /// A failing release does not stop the remaining ones; the first failure
    /// is returned once the stack is empty.
    pub async fn close(&mut self) -> Result<(), String> {
        let mut first_error = None;
        while let Some(entry) = self.entries.pop() {
            debug!(label = %entry.label, "Releasing scoped resource");
            if let Err(err) = entry.resource.release().await {
                warn!(label = %entry.label, error = %err, "Failed to release resource");
                first_error.get_or_insert_with(|| format!("{}: {}", entry.label, err));
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for ExitStack {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            let labels: Vec<&str> = self.entries.iter().map(|e| e.label.as_str()).collect();
            warn!(?labels, "Exit stack dropped without close; relying on drop-time cleanup");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Shared journal of open/release events for ordering assertions.
    #[derive(Clone, Default)]
    pub struct Journal(pub Arc<Mutex<Vec<String>>>);

    impl Journal {
        pub fn record(&self, event: impl Into<String>) {
            self.0.lock().unwrap().push(event.into());
        }

        pub fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        pub fn count(&self, event: &str) -> usize {
            self.0.lock().unwrap().iter().filter(|e| *e == event).count()
        }
    }

    pub struct Tracked {
        pub name: String,
        pub journal: Journal,
        pub fail_release: bool,
    }

    #[async_trait]
    impl Release for Tracked {
        async fn release(&self) -> Result<(), String> {
            self.journal.record(format!("release:{}", self.name));
            if self.fail_release {
                Err("release failed".to_string())
            } else {
                Ok(())
            }
        }
    }
}
