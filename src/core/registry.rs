use std::sync::Arc;

pub const DOC_CLIENT_KEY: &str = "doc_client";

/// Registry key for the `index`-th server script given on the command line.
pub fn client_key(index: usize, script: &str) -> String {
    format!("client_{index}_{script}")
}

/// Insertion-ordered map from client id to a shared client handle.
#[derive(Debug)]
pub struct ClientRegistry<C> {
    entries: Vec<(String, Arc<C>)>,
}

impl<C> Default for ClientRegistry<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> Clone for ClientRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<C> ClientRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, client: Arc<C>) -> Result<(), String> {
        let key = key.into();
        if self.contains(&key) {
            return Err(format!("Duplicate MCP client id: {key}"));
        }
        self.entries.push((key, client));
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }

    pub fn get(&self, key: &str) -> Option<&Arc<C>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, client)| client)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn clients(&self) -> impl Iterator<Item = &Arc<C>> {
        self.entries.iter().map(|(_, client)| client)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<C>)> {
        self.entries
            .iter()
            .map(|(key, client)| (key.as_str(), client))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
