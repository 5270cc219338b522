use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::errors::{Error, Result};

/// An opaque identity a connection lease is registered under. Tokens
/// name callers, not tasks: a task proves it may use a lease either by
/// carrying the owner's token ambiently (see [`with_owner`]) or by
/// having been allowed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerToken(u64);

impl OwnerToken {
    pub(crate) fn next() -> OwnerToken {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        OwnerToken(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

tokio::task_local! {
    static AMBIENT_OWNER: Option<OwnerToken>;
}

/// The owner token the current task runs under, if any.
pub fn current_owner() -> Option<OwnerToken> {
    AMBIENT_OWNER.try_with(|token| *token).ok().flatten()
}

/// Runs `fut` with `token` as the ambient owner. Futures awaited inside
/// inherit it; spawned tasks do not, wrap their future in `with_owner`
/// too (or allow their token) to extend the lease to them.
pub async fn with_owner<F: Future>(token: OwnerToken, fut: F) -> F::Output {
    AMBIENT_OWNER.scope(Some(token), fut).await
}

/// Maps owner identities to their checked-out resource, plus the set of
/// other identities each owner has allowed in.
pub(crate) struct OwnershipRegistry<T> {
    entries: Mutex<HashMap<OwnerToken, Entry<T>>>,
}

struct Entry<T> {
    resource: T,
    allowed: HashSet<OwnerToken>,
}

impl<T: Clone> OwnershipRegistry<T> {
    pub(crate) fn new() -> Self {
        OwnershipRegistry {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn register(&self, owner: OwnerToken, resource: T) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            owner,
            Entry {
                resource,
                allowed: HashSet::new(),
            },
        );
    }

    pub(crate) fn unregister(&self, owner: OwnerToken) -> Option<T> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(&owner).map(|entry| entry.resource)
    }

    pub(crate) fn contains(&self, owner: OwnerToken) -> bool {
        let entries = self.entries.lock().unwrap();
        entries.contains_key(&owner)
    }

    /// The resource `caller` may use: its own, or one it was allowed
    /// into.
    pub(crate) fn resolve(&self, caller: OwnerToken) -> Option<T> {
        let entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get(&caller) {
            return Some(entry.resource.clone());
        }
        entries
            .values()
            .find(|entry| entry.allowed.contains(&caller))
            .map(|entry| entry.resource.clone())
    }

    /// Grants `child` the right to resolve `owner`'s resource for as
    /// long as the lease lasts.
    pub(crate) fn allow(&self, owner: OwnerToken, child: OwnerToken) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(&owner) {
            Some(entry) => {
                entry.allowed.insert(child);
                Ok(())
            }
            None => Err(Error::NotOwned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_own_and_allowed_resources() {
        let registry = OwnershipRegistry::new();
        let owner = OwnerToken::next();
        let child = OwnerToken::next();
        let stranger = OwnerToken::next();

        registry.register(owner, "conn-a");
        assert_eq!(registry.resolve(owner), Some("conn-a"));
        assert_eq!(registry.resolve(child), None);

        registry.allow(owner, child).unwrap();
        assert_eq!(registry.resolve(child), Some("conn-a"));
        assert_eq!(registry.resolve(stranger), None);
    }

    #[test]
    fn unregister_revokes_everything() {
        let registry = OwnershipRegistry::new();
        let owner = OwnerToken::next();
        let child = OwnerToken::next();

        registry.register(owner, 7);
        registry.allow(owner, child).unwrap();
        assert_eq!(registry.unregister(owner), Some(7));

        assert!(!registry.contains(owner));
        assert_eq!(registry.resolve(child), None);
        assert!(matches!(registry.allow(owner, child), Err(Error::NotOwned)));
    }

    #[tokio::test]
    async fn ambient_owner_is_scoped() {
        assert_eq!(current_owner(), None);
        let token = OwnerToken::next();
        with_owner(token, async move {
            assert_eq!(current_owner(), Some(token));
            // nested scopes shadow
            let inner = OwnerToken::next();
            with_owner(inner, async move {
                assert_eq!(current_owner(), Some(inner));
            })
            .await;
            assert_eq!(current_owner(), Some(token));
        })
        .await;
        assert_eq!(current_owner(), None);
    }
}
