//! Ordered, editable list of images feeding the document tool.
//!
//! Position in the queue is the page order of the assembled document. An
//! entry's index is never stored; reordering moves the entry itself.
//!
//! Every entry owns a handle in [`Slot::QueueEntry`], installed when the entry
//! is appended and released when it is removed or the queue is cleared.

use std::rc::Rc;

use futures::future::join_all;
use thiserror::Error;

use crate::artifact::{ArtifactStore, Handle, HandleProvider, Slot};
use crate::codec::Codec;
use crate::decode::{DecodeError, SourceAsset, Surface};
use crate::error::PipelineError;

/// An index outside `[0, len)` was passed to a queue operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Queue index {index} out of range for queue of length {len}")]
pub struct QueueIndexError {
    pub index: usize,
    pub len: usize,
}

/// Stable identity of a queue entry, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn new(value: u64) -> Self {
        EntryId(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// One decoded image in the queue.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: EntryId,
    pub asset: Rc<SourceAsset>,
    pub surface: Rc<Surface>,
    pub display_name: String,
    pub handle: Handle,
}

/// An asset that could not be added.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedAsset {
    pub name: String,
    pub error: PipelineError,
}

/// Outcome of an append: which entries were created and which assets were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendReport {
    pub added: Vec<EntryId>,
    pub rejected: Vec<RejectedAsset>,
    /// The queue was cleared while the batch decoded; nothing was added.
    pub superseded: bool,
}

/// A batch of assets paired with their decode results, in input order.
pub type DecodedBatch = Vec<(SourceAsset, Result<Surface, DecodeError>)>;

/// Decode every asset concurrently, keeping input order.
pub async fn decode_batch<C: Codec + ?Sized>(codec: &C, assets: Vec<SourceAsset>) -> DecodedBatch {
    let results = join_all(assets.iter().map(|asset| codec.decode(asset))).await;
    assets.into_iter().zip(results).collect()
}

/// Move the item at `from` so it ends up at `to`.
///
/// `to` is interpreted against the list *after* the item has been removed,
/// which is the same as its final index. Untouched items keep their relative
/// order.
///
/// # Errors
///
/// Returns `QueueIndexError` if either index is outside `[0, len)`; the list
/// is left unchanged.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), QueueIndexError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(QueueIndexError { index, len });
        }
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    Ok(())
}

/// The document tool's image queue.
#[derive(Debug, Default)]
pub struct ImageQueue {
    entries: Vec<QueueEntry>,
    next_id: u64,
    generation: u64,
}

impl ImageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `assets` and append the ones that decode, in input order.
    ///
    /// A failed decode drops only that asset; its siblings are still added.
    pub async fn append<C, P>(
        &mut self,
        codec: &C,
        store: &mut ArtifactStore<P>,
        assets: Vec<SourceAsset>,
    ) -> AppendReport
    where
        C: Codec + ?Sized,
        P: HandleProvider,
    {
        let decoded = decode_batch(codec, assets).await;
        self.extend(store, decoded)
    }

    /// Append an already-decoded batch. See [`ImageQueue::append`].
    pub fn extend<P: HandleProvider>(
        &mut self,
        store: &mut ArtifactStore<P>,
        batch: DecodedBatch,
    ) -> AppendReport {
        let mut report = AppendReport::default();

        for (asset, result) in batch {
            let surface = match result {
                Ok(surface) => surface,
                Err(error) => {
                    tracing::warn!(name = %asset.name, %error, "dropping image that failed to decode");
                    report.rejected.push(RejectedAsset {
                        name: asset.name,
                        error: error.into(),
                    });
                    continue;
                }
            };

            self.next_id += 1;
            let id = EntryId(self.next_id);
            let mime = asset.inferred_mime().unwrap_or_default();

            let handle = match store.install(Slot::QueueEntry(id), &asset.bytes, &mime) {
                Ok(handle) => handle,
                Err(error) => {
                    tracing::warn!(name = %asset.name, %error, "dropping image without a handle");
                    report.rejected.push(RejectedAsset {
                        name: asset.name,
                        error: error.into(),
                    });
                    continue;
                }
            };

            self.entries.push(QueueEntry {
                id,
                display_name: asset.name.clone(),
                asset: Rc::new(asset),
                surface: Rc::new(surface),
                handle,
            });
            report.added.push(id);
        }

        report
    }

    /// Remove the entry at `index` and release its handle.
    ///
    /// # Errors
    ///
    /// Returns `QueueIndexError` if `index` is out of range; the queue is unchanged.
    pub fn remove_at<P: HandleProvider>(
        &mut self,
        store: &mut ArtifactStore<P>,
        index: usize,
    ) -> Result<QueueEntry, QueueIndexError> {
        if index >= self.entries.len() {
            return Err(QueueIndexError {
                index,
                len: self.entries.len(),
            });
        }
        let entry = self.entries.remove(index);
        store.release(Slot::QueueEntry(entry.id));
        Ok(entry)
    }

    /// Move the entry at `from` to `to` (splice semantics, see [`move_item`]).
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), QueueIndexError> {
        move_item(&mut self.entries, from, to)
    }

    /// Release every entry's handle, then empty the queue.
    ///
    /// Bumps the generation, so batches decoded against the old queue can
    /// tell they are stale.
    pub fn clear<P: HandleProvider>(&mut self, store: &mut ArtifactStore<P>) {
        for entry in &self.entries {
            store.release(Slot::QueueEntry(entry.id));
        }
        self.entries.clear();
        self.generation += 1;
    }

    /// Counter bumped by every [`ImageQueue::clear`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    /// Current position of an entry.
    pub fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Entry ids in queue order.
    pub fn ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(|e| e.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::MemoryHandles;
    use crate::codec::NativeCodec;
    use futures::executor::block_on;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_asset(name: &str, width: u32, height: u32) -> SourceAsset {
        let img = RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        SourceAsset::new(name, buf.into_inner())
    }

    fn names(queue: &ImageQueue) -> Vec<&str> {
        queue.entries().iter().map(|e| e.display_name.as_str()).collect()
    }

    fn filled(names: &[&str]) -> (ImageQueue, ArtifactStore<MemoryHandles>, MemoryHandles) {
        let handles = MemoryHandles::new();
        let mut store = ArtifactStore::new(handles.clone());
        let mut queue = ImageQueue::new();
        let assets = names.iter().map(|n| png_asset(n, 4, 3)).collect();
        let report = block_on(queue.append(&NativeCodec, &mut store, assets));
        assert!(report.rejected.is_empty());
        (queue, store, handles)
    }

    #[test]
    fn test_move_item_forward() {
        let mut v = vec!['A', 'B', 'C'];
        move_item(&mut v, 0, 2).unwrap();
        assert_eq!(v, vec!['B', 'C', 'A']);
    }

    #[test]
    fn test_move_item_backward() {
        let mut v = vec!['A', 'B', 'C', 'D'];
        move_item(&mut v, 3, 1).unwrap();
        assert_eq!(v, vec!['A', 'D', 'B', 'C']);
    }

    #[test]
    fn test_move_item_out_of_range() {
        let mut v = vec!['A', 'B'];
        assert_eq!(move_item(&mut v, 2, 0), Err(QueueIndexError { index: 2, len: 2 }));
        assert_eq!(move_item(&mut v, 0, 5), Err(QueueIndexError { index: 5, len: 2 }));
        assert_eq!(v, vec!['A', 'B']);
    }

    #[test]
    fn test_append_preserves_input_order() {
        let (queue, store, handles) = filled(&["a.png", "b.png", "c.png"]);
        assert_eq!(names(&queue), vec!["a.png", "b.png", "c.png"]);
        assert_eq!(handles.live_count(), 3);
        for entry in queue.entries() {
            assert_eq!(store.handle(Slot::QueueEntry(entry.id)), Some(&entry.handle));
            assert_eq!(entry.surface.native_width(), 4);
        }
    }

    #[test]
    fn test_append_drops_undecodable_assets() {
        let handles = MemoryHandles::new();
        let mut store = ArtifactStore::new(handles.clone());
        let mut queue = ImageQueue::new();

        let assets = vec![
            png_asset("good-1.png", 2, 2),
            SourceAsset::new("broken.png", vec![0xde, 0xad, 0xbe, 0xef]),
            png_asset("good-2.png", 2, 2),
        ];
        let report = block_on(queue.append(&NativeCodec, &mut store, assets));

        assert_eq!(report.added.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].name, "broken.png");
        assert!(matches!(report.rejected[0].error, PipelineError::Decode(_)));
        assert_eq!(names(&queue), vec!["good-1.png", "good-2.png"]);
        assert_eq!(handles.live_count(), 2);
    }

    #[test]
    fn test_append_extends_existing_sequence() {
        let (mut queue, mut store, _) = filled(&["a", "b"]);
        block_on(queue.append(&NativeCodec, &mut store, vec![png_asset("c", 1, 1)]));
        assert_eq!(names(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_at_releases_handle_and_shifts() {
        let (mut queue, mut store, handles) = filled(&["a", "b", "c"]);
        let removed = queue.remove_at(&mut store, 1).unwrap();

        assert_eq!(removed.display_name, "b");
        assert!(!handles.is_live(&removed.handle));
        assert_eq!(names(&queue), vec!["a", "c"]);
        assert_eq!(queue.position(queue.entries()[1].id), Some(1));
        assert_eq!(handles.live_count(), 2);
    }

    #[test]
    fn test_remove_at_out_of_range_leaves_queue_unchanged() {
        let (mut queue, mut store, handles) = filled(&["a", "b"]);
        let before = queue.ids();

        let err = queue.remove_at(&mut store, 2).unwrap_err();
        assert_eq!(err, QueueIndexError { index: 2, len: 2 });
        assert_eq!(queue.ids(), before);
        assert_eq!(handles.live_count(), 2);
    }

    #[test]
    fn test_reorder_entries() {
        let (mut queue, _store, _) = filled(&["A", "B", "C"]);
        queue.reorder(0, 2).unwrap();
        assert_eq!(names(&queue), vec!["B", "C", "A"]);

        let before = queue.ids();
        queue.reorder(1, 1).unwrap();
        assert_eq!(queue.ids(), before);

        assert!(queue.reorder(0, 3).is_err());
        assert_eq!(queue.ids(), before);
    }

    #[test]
    fn test_clear_releases_everything() {
        let (mut queue, mut store, handles) = filled(&["a", "b", "c"]);
        let generation = queue.generation();
        queue.clear(&mut store);
        assert!(queue.is_empty());
        assert_eq!(queue.generation(), generation + 1);
        assert_eq!(handles.live_count(), 0);
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let (mut queue, mut store, _) = filled(&["a"]);
        let first = queue.ids()[0];
        queue.remove_at(&mut store, 0).unwrap();
        block_on(queue.append(&NativeCodec, &mut store, vec![png_asset("b", 1, 1)]));
        assert_ne!(queue.ids()[0], first);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
