//! Ownership of temporary handles to in-memory artifacts.
//!
//! A handle is a revocable reference to a byte buffer that a display or
//! download surface can use (in a browser, an object URL). Every handle in
//! the system is created and revoked by an [`ArtifactStore`]; nothing else
//! calls the [`HandleProvider`] directly.
//!
//! # Slots
//!
//! The store maps each [`Slot`] to at most one live handle. Installing into
//! an occupied slot revokes the old handle before the new one is created, so
//! application state never sees two handles for one slot, nor a slot that
//! points at a revoked handle.
//!
//! # Request tokens
//!
//! Each slot carries a monotonically increasing counter. A pipeline request
//! captures a [`RequestToken`] when it is issued and installs its result with
//! [`ArtifactStore::install_if_current`]; if a newer request was issued for the
//! same slot in the meantime, the stale result is dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::queue::EntryId;

/// Failure to create a handle on the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to create artifact handle: {0}")]
pub struct HandleError(pub String);

/// A live reference to an installed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle(String);

impl Handle {
    pub fn new(value: impl Into<String>) -> Self {
        Handle(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named destination for "the current artifact of kind X".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Original file shown by the compress tool.
    CompressOriginal,
    /// Re-encoded preview produced by the compress tool.
    CompressPreview,
    /// Original file shown by the convert tool.
    ConvertOriginal,
    /// Output produced by the convert tool.
    ConvertOutput,
    /// Assembled PDF.
    DocumentOutput,
    /// Thumbnail source for one queued image.
    QueueEntry(EntryId),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::CompressOriginal => f.write_str("compress-original"),
            Slot::CompressPreview => f.write_str("compress-preview"),
            Slot::ConvertOriginal => f.write_str("convert-original"),
            Slot::ConvertOutput => f.write_str("convert-output"),
            Slot::DocumentOutput => f.write_str("document-output"),
            Slot::QueueEntry(id) => write!(f, "queue-entry-{}", id.get()),
        }
    }
}

/// Identifies one request against one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    slot: Slot,
    seq: u64,
}

impl RequestToken {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Host facility that creates and revokes handles.
pub trait HandleProvider {
    /// Create a handle referencing a copy of `bytes`.
    fn create(&mut self, bytes: &[u8], mime: &str) -> Result<Handle, HandleError>;

    /// Revoke a handle. Revoking an unknown handle is a no-op.
    fn revoke(&mut self, handle: &Handle);
}

#[derive(Debug, Default)]
struct MemoryInner {
    next: u64,
    live: HashMap<Handle, (String, Vec<u8>)>,
}

/// In-process handle provider.
///
/// Clones share the same table, so a test can keep a clone to observe what
/// the store did after the store itself is gone.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandles {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.inner.borrow().live.len()
    }

    pub fn is_live(&self, handle: &Handle) -> bool {
        self.inner.borrow().live.contains_key(handle)
    }

    /// Bytes and MIME type behind a live handle.
    pub fn resolve(&self, handle: &Handle) -> Option<(String, Vec<u8>)> {
        self.inner.borrow().live.get(handle).cloned()
    }
}

impl HandleProvider for MemoryHandles {
    fn create(&mut self, bytes: &[u8], mime: &str) -> Result<Handle, HandleError> {
        let mut inner = self.inner.borrow_mut();
        inner.next += 1;
        let handle = Handle(format!("mem:{}", inner.next));
        inner
            .live
            .insert(handle.clone(), (mime.to_string(), bytes.to_vec()));
        Ok(handle)
    }

    fn revoke(&mut self, handle: &Handle) {
        self.inner.borrow_mut().live.remove(handle);
    }
}

/// Slot-to-handle table with guaranteed release.
///
/// Dropping the store revokes every handle it still owns.
pub struct ArtifactStore<P: HandleProvider> {
    provider: P,
    live: HashMap<Slot, Handle>,
    tokens: HashMap<Slot, u64>,
}

impl<P: HandleProvider> ArtifactStore<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            live: HashMap::new(),
            tokens: HashMap::new(),
        }
    }

    /// Install bytes into `slot`, revoking whatever was there first.
    ///
    /// # Errors
    ///
    /// Returns `HandleError` if the host could not create the handle. The
    /// slot is left empty in that case.
    pub fn install(&mut self, slot: Slot, bytes: &[u8], mime: &str) -> Result<Handle, HandleError> {
        self.release(slot);
        let handle = self.provider.create(bytes, mime)?;
        tracing::debug!(%slot, %handle, size = bytes.len(), "installed artifact");
        self.live.insert(slot, handle.clone());
        Ok(handle)
    }

    /// Start a new request for `slot`, superseding any outstanding one.
    pub fn issue(&mut self, slot: Slot) -> RequestToken {
        let seq = self.tokens.entry(slot).or_insert(0);
        *seq += 1;
        RequestToken { slot, seq: *seq }
    }

    /// Whether `token` is still the latest request for its slot.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.tokens.get(&token.slot) == Some(&token.seq)
    }

    /// Install only if `token` has not been superseded.
    ///
    /// Returns `Ok(None)` and leaves the slot untouched for stale tokens.
    pub fn install_if_current(
        &mut self,
        token: RequestToken,
        bytes: &[u8],
        mime: &str,
    ) -> Result<Option<Handle>, HandleError> {
        if !self.is_current(token) {
            tracing::debug!(
                slot = %token.slot,
                stale = token.seq,
                current = self.tokens.get(&token.slot).copied().unwrap_or(0),
                "dropping superseded result"
            );
            return Ok(None);
        }
        self.install(token.slot, bytes, mime).map(Some)
    }

    /// Revoke and clear `slot`. Returns whether a handle was released.
    pub fn release(&mut self, slot: Slot) -> bool {
        match self.live.remove(&slot) {
            Some(handle) => {
                self.provider.revoke(&handle);
                tracing::debug!(%slot, %handle, "released artifact");
                true
            }
            None => false,
        }
    }

    /// Revoke every handle the store owns.
    pub fn release_all(&mut self) {
        for (_, handle) in self.live.drain() {
            self.provider.revoke(&handle);
        }
    }

    pub fn handle(&self, slot: Slot) -> Option<&Handle> {
        self.live.get(&slot)
    }

    /// Slots that currently hold a handle, in no particular order.
    pub fn live_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.live.keys().copied()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl<P: HandleProvider> Drop for ArtifactStore<P> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<P: HandleProvider> fmt::Debug for ArtifactStore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("live", &self.live)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (ArtifactStore<MemoryHandles>, MemoryHandles) {
        let handles = MemoryHandles::new();
        (ArtifactStore::new(handles.clone()), handles)
    }

    #[test]
    fn test_install_replaces_and_revokes() {
        let (mut store, handles) = store();

        let first = store.install(Slot::CompressPreview, b"one", "image/jpeg").unwrap();
        let second = store.install(Slot::CompressPreview, b"two", "image/jpeg").unwrap();

        assert_ne!(first, second);
        assert!(!handles.is_live(&first));
        assert!(handles.is_live(&second));
        assert_eq!(handles.live_count(), 1);
        assert_eq!(store.handle(Slot::CompressPreview), Some(&second));
        assert_eq!(
            handles.resolve(&second),
            Some(("image/jpeg".to_string(), b"two".to_vec()))
        );
    }

    #[test]
    fn test_slots_are_independent() {
        let (mut store, handles) = store();
        store.install(Slot::CompressOriginal, b"a", "image/png").unwrap();
        store.install(Slot::CompressPreview, b"b", "image/jpeg").unwrap();
        store.install(Slot::QueueEntry(EntryId::new(3)), b"c", "image/png").unwrap();

        assert_eq!(handles.live_count(), 3);
        assert!(store.release(Slot::CompressPreview));
        assert!(!store.release(Slot::CompressPreview));
        assert_eq!(handles.live_count(), 2);
        assert!(store.handle(Slot::CompressOriginal).is_some());
    }

    #[test]
    fn test_release_all_and_drop() {
        let (mut store, handles) = store();
        store.install(Slot::ConvertOriginal, b"a", "image/png").unwrap();
        store.install(Slot::ConvertOutput, b"b", "image/png").unwrap();
        store.release_all();
        assert_eq!(handles.live_count(), 0);
        assert_eq!(store.live_count(), 0);

        store.install(Slot::DocumentOutput, b"%PDF", "application/pdf").unwrap();
        assert_eq!(handles.live_count(), 1);
        drop(store);
        assert_eq!(handles.live_count(), 0);
    }

    #[test]
    fn test_tokens_increase_per_slot() {
        let (mut store, _) = store();
        let a1 = store.issue(Slot::CompressPreview);
        let a2 = store.issue(Slot::CompressPreview);
        let b1 = store.issue(Slot::ConvertOutput);

        assert!(a2.seq() > a1.seq());
        assert_eq!(b1.seq(), 1);
        assert!(!store.is_current(a1));
        assert!(store.is_current(a2));
        assert!(store.is_current(b1));
    }

    #[test]
    fn test_stale_result_is_dropped_even_if_it_finishes_last() {
        let (mut store, handles) = store();
        let first = store.issue(Slot::CompressPreview);
        let second = store.issue(Slot::CompressPreview);

        let installed = store
            .install_if_current(second, b"fresh", "image/jpeg")
            .unwrap()
            .expect("current token installs");
        let stale = store.install_if_current(first, b"stale", "image/jpeg").unwrap();

        assert!(stale.is_none());
        assert_eq!(store.handle(Slot::CompressPreview), Some(&installed));
        assert_eq!(handles.resolve(&installed).unwrap().1, b"fresh".to_vec());
        assert_eq!(handles.live_count(), 1);
    }

    #[test]
    fn test_slot_display() {
        assert_eq!(Slot::DocumentOutput.to_string(), "document-output");
        assert_eq!(Slot::QueueEntry(EntryId::new(7)).to_string(), "queue-entry-7");
    }
}
