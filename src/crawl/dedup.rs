use dashmap::DashSet;

/// Run-wide set of detail URLs already handed to the fetch pool
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: DashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time `url` is offered and false afterwards.
    /// Check and insert happen under one shard lock, so concurrent callers
    /// racing on the same URL see exactly one admission.
    pub fn admit(&self, url: &str) -> bool {
        self.seen.insert(url.to_owned())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_admits_once() {
        let dedup = Deduplicator::new();
        assert!(dedup.admit("https://www.immoweb.be/en/classified/1"));
        assert!(!dedup.admit("https://www.immoweb.be/en/classified/1"));
        assert!(!dedup.admit("https://www.immoweb.be/en/classified/1"));
        assert!(dedup.admit("https://www.immoweb.be/en/classified/2"));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_concurrent_admission_is_exclusive() {
        let dedup = Deduplicator::new();
        let admitted = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    for id in 0..100 {
                        if dedup.admit(&format!("https://www.immoweb.be/en/classified/{}", id)) {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 100);
        assert_eq!(dedup.len(), 100);
    }
}
