use memento_types::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// Used by [`InMemoryStore`](crate::InMemoryStore) to name objects. Each
/// hasher prepends a domain tag so a blob and a tree with identical bytes
/// never share an id.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for blob objects.
    pub const BLOB: Self = Self {
        domain: "memento-blob-v1",
    };
    /// Hasher for tree objects.
    pub const TREE: Self = Self {
        domain: "memento-tree-v1",
    };
    /// Hasher for scripted commit objects.
    pub const COMMIT: Self = Self {
        domain: "memento-commit-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
