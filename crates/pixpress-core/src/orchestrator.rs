//! Per-tool request orchestration.
//!
//! The [`Orchestrator`] wires the codec, the artifact store, the image queue
//! and the tool states together. Request methods issue their
//! [`RequestToken`] synchronously and return a `'static` future, so a host can
//! fire a new request while an older one is still running. When a request
//! finishes, its result is installed only if its token is still current;
//! otherwise the future resolves to [`Delivery::Superseded`] and nothing
//! changes.
//!
//! Everything is single-threaded. Shared state lives behind `Rc<RefCell<_>>`,
//! and no borrow is held across an `.await`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use crate::artifact::{ArtifactStore, Handle, HandleError, HandleProvider, RequestToken, Slot};
use crate::codec::Codec;
use crate::config::PipelineConfig;
use crate::decode::SourceAsset;
use crate::document::{self, Document, PageSize};
use crate::encode::{EncodedArtifact, FilterType, OutputFormat, Quality};
use crate::error::PipelineError;
use crate::geometry::compute_render_target;
use crate::queue::{decode_batch, AppendReport, ImageQueue, QueueEntry};
use crate::state::{reduce, OutputSummary, Tool, ToolEvent, ToolState};

/// Outcome of a request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    /// The result is now the slot's artifact.
    Installed { value: T, handle: Handle },
    /// A newer request for the same slot was issued; the result was dropped.
    Superseded,
}

impl<T> Delivery<T> {
    pub fn is_superseded(&self) -> bool {
        matches!(self, Delivery::Superseded)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Delivery::Installed { value, .. } => Some(value),
            Delivery::Superseded => None,
        }
    }

    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Delivery::Installed { handle, .. } => Some(handle),
            Delivery::Superseded => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Delivery::Installed { value, .. } => Some(value),
            Delivery::Superseded => None,
        }
    }
}

/// Something a request can install into a slot.
trait Deliverable {
    fn bytes(&self) -> &[u8];
    fn mime(&self) -> &str;
    fn summary(&self, handle: Handle) -> OutputSummary;
}

impl Deliverable for EncodedArtifact {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn mime(&self) -> &str {
        EncodedArtifact::mime(self)
    }

    fn summary(&self, handle: Handle) -> OutputSummary {
        OutputSummary {
            handle,
            mime: EncodedArtifact::mime(self).to_string(),
            byte_size: self.byte_size(),
            dimensions: Some((self.width, self.height)),
            pages: None,
        }
    }
}

impl Deliverable for Document {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn mime(&self) -> &str {
        Document::mime(self)
    }

    fn summary(&self, handle: Handle) -> OutputSummary {
        OutputSummary {
            handle,
            mime: Document::mime(self).to_string(),
            byte_size: self.byte_size(),
            dimensions: None,
            pages: Some(self.page_count()),
        }
    }
}

/// State shared between the orchestrator and its in-flight futures.
struct Shared<P: HandleProvider> {
    store: RefCell<ArtifactStore<P>>,
    queue: RefCell<ImageQueue>,
    states: RefCell<HashMap<Tool, ToolState>>,
}

impl<P: HandleProvider> Shared<P> {
    fn apply(&self, tool: Tool, event: ToolEvent) {
        let mut states = self.states.borrow_mut();
        let next = reduce(states.get(&tool).unwrap_or(&ToolState::default()), event);
        states.insert(tool, next);
    }

    /// Issue a token for the tool's output slot and mark the tool busy.
    fn begin(&self, tool: Tool) -> RequestToken {
        let token = self.store.borrow_mut().issue(tool.output_slot());
        self.apply(tool, ToolEvent::Started(token));
        token
    }

    /// Install a finished request's result, or drop it if superseded.
    fn deliver<T: Deliverable>(
        &self,
        tool: Tool,
        token: RequestToken,
        result: Result<T, PipelineError>,
    ) -> Result<Delivery<T>, PipelineError> {
        if !self.store.borrow().is_current(token) {
            tracing::debug!(?tool, seq = token.seq(), "request superseded");
            return Ok(Delivery::Superseded);
        }

        let value = match result {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(?tool, %error, "request failed");
                self.apply(tool, ToolEvent::Failed { token, error: error.clone() });
                return Err(error);
            }
        };

        let installed = self
            .store
            .borrow_mut()
            .install_if_current(token, value.bytes(), value.mime());

        match installed {
            Ok(Some(handle)) => {
                let output = value.summary(handle.clone());
                self.apply(tool, ToolEvent::Completed { token, output });
                Ok(Delivery::Installed { value, handle })
            }
            Ok(None) => Ok(Delivery::Superseded),
            Err(error) => {
                let error = PipelineError::from(error);
                tracing::warn!(?tool, %error, "could not install result");
                self.apply(tool, ToolEvent::InstallFailed { token, error: error.clone() });
                Err(error)
            }
        }
    }

    fn fail_now(&self, tool: Tool, token: RequestToken, error: &PipelineError) {
        tracing::warn!(?tool, %error, "request rejected");
        self.apply(tool, ToolEvent::Failed { token, error: error.clone() });
    }
}

/// Decode, size and encode one asset.
async fn transcode<C: Codec + ?Sized>(
    codec: &C,
    asset: &SourceAsset,
    format: OutputFormat,
    quality: Quality,
    max_width: u32,
    filter: FilterType,
) -> Result<EncodedArtifact, PipelineError> {
    let surface = codec.decode(asset).await?;
    let target = compute_render_target(surface.native_width(), surface.native_height(), max_width)?;
    let artifact = codec.encode(&surface, target, format, quality, filter).await?;
    Ok(artifact)
}

/// Front door for the compress, convert and document tools.
pub struct Orchestrator<C: Codec + 'static, P: HandleProvider + 'static> {
    codec: Rc<C>,
    shared: Rc<Shared<P>>,
    config: Rc<PipelineConfig>,
}

impl<C: Codec + 'static, P: HandleProvider + 'static> Orchestrator<C, P> {
    pub fn new(codec: C, provider: P, config: PipelineConfig) -> Self {
        Self {
            codec: Rc::new(codec),
            shared: Rc::new(Shared {
                store: RefCell::new(ArtifactStore::new(provider)),
                queue: RefCell::new(ImageQueue::new()),
                states: RefCell::new(HashMap::new()),
            }),
            config: Rc::new(config),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current snapshot of a tool.
    pub fn state(&self, tool: Tool) -> ToolState {
        self.shared
            .states
            .borrow()
            .get(&tool)
            .cloned()
            .unwrap_or_default()
    }

    pub fn handle(&self, slot: Slot) -> Option<Handle> {
        self.shared.store.borrow().handle(slot).cloned()
    }

    /// Number of handles the orchestrator currently owns.
    pub fn live_handles(&self) -> usize {
        self.shared.store.borrow().live_count()
    }

    /// Pick a new source for a tool.
    ///
    /// The tool's previous output is released, any in-flight request for it
    /// is superseded, and its state returns to idle. For tools with an
    /// original slot the source bytes are installed there and the new handle
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns `HandleError` if the host could not create the handle.
    pub fn select_source(&self, tool: Tool, asset: &SourceAsset) -> Result<Option<Handle>, HandleError> {
        {
            let mut store = self.shared.store.borrow_mut();
            store.issue(tool.output_slot());
            store.release(tool.output_slot());
        }
        self.shared.apply(tool, ToolEvent::Reset);

        match tool.original_slot() {
            Some(slot) => {
                let mime = asset.inferred_mime().unwrap_or_default();
                let handle = self.shared.store.borrow_mut().install(slot, &asset.bytes, &mime)?;
                Ok(Some(handle))
            }
            None => Ok(None),
        }
    }

    /// Re-encode `asset` as JPEG for the compress tool's live preview.
    ///
    /// # Arguments
    ///
    /// * `asset` - Source bytes
    /// * `quality` - Defaults to the configured quality
    /// * `max_width` - Defaults to the configured max width; `0` keeps the native width
    pub fn preview_resize(
        &self,
        asset: SourceAsset,
        quality: Option<Quality>,
        max_width: Option<u32>,
    ) -> impl Future<Output = Result<Delivery<EncodedArtifact>, PipelineError>> + 'static {
        let token = self.shared.begin(Tool::Compress);
        let codec = Rc::clone(&self.codec);
        let shared = Rc::clone(&self.shared);
        let quality = self.resolve_quality(quality, self.config.default_quality);
        let max_width = max_width.unwrap_or(self.config.default_max_width);
        let filter = self.config.filter;

        async move {
            let result = transcode(&*codec, &asset, OutputFormat::Jpeg, quality, max_width, filter).await;
            shared.deliver(Tool::Compress, token, result)
        }
    }

    /// Transcode `asset` into the format named by `target` (MIME type or extension).
    ///
    /// An unavailable or unknown target is reported before any decoding, and
    /// the convert tool is in the error state as soon as this returns.
    /// Omitted `quality` and `max_width` fall back to `convert_quality` and
    /// `convert_max_width`, so by default the native width is kept.
    pub fn convert(
        &self,
        asset: SourceAsset,
        target: &str,
        quality: Option<Quality>,
        max_width: Option<u32>,
    ) -> impl Future<Output = Result<Delivery<EncodedArtifact>, PipelineError>> + 'static {
        let token = self.shared.begin(Tool::Convert);
        let format = OutputFormat::parse(target).map_err(PipelineError::from);
        if let Err(error) = &format {
            self.shared.fail_now(Tool::Convert, token, error);
        }

        let codec = Rc::clone(&self.codec);
        let shared = Rc::clone(&self.shared);
        let quality = self.resolve_quality(quality, self.config.convert_quality);
        let max_width = max_width.unwrap_or(self.config.convert_max_width);
        let filter = self.config.filter;

        async move {
            let format = format?;
            let result = transcode(&*codec, &asset, format, quality, max_width, filter).await;
            shared.deliver(Tool::Convert, token, result)
        }
    }

    /// Build a document from the queue as it is right now.
    ///
    /// Later queue edits do not affect a document that is already being built.
    pub fn assemble_document(
        &self,
        page_size: PageSize,
    ) -> impl Future<Output = Result<Delivery<Document>, PipelineError>> + 'static {
        let token = self.shared.begin(Tool::Document);
        let entries: Vec<QueueEntry> = self.shared.queue.borrow().entries().to_vec();
        let codec = Rc::clone(&self.codec);
        let shared = Rc::clone(&self.shared);
        let config = Rc::clone(&self.config);

        async move {
            let result = document::assemble_document(&*codec, &entries, page_size, &config).await;
            shared.deliver(Tool::Document, token, result)
        }
    }

    /// Decode and append images to the queue. Undecodable assets are reported, not added.
    ///
    /// If the queue is cleared (or the orchestrator torn down) before decoding
    /// finishes, the batch is dropped and the report is marked superseded.
    pub fn append_images(&self, assets: Vec<SourceAsset>) -> impl Future<Output = AppendReport> + 'static {
        let generation = self.shared.queue.borrow().generation();
        let codec = Rc::clone(&self.codec);
        let shared = Rc::clone(&self.shared);

        async move {
            let decoded = decode_batch(&*codec, assets).await;
            if shared.queue.borrow().generation() != generation {
                tracing::debug!(dropped = decoded.len(), "queue cleared while decoding; append superseded");
                return AppendReport {
                    superseded: true,
                    ..AppendReport::default()
                };
            }
            let mut store = shared.store.borrow_mut();
            let report = shared.queue.borrow_mut().extend(&mut store, decoded);
            tracing::debug!(
                added = report.added.len(),
                rejected = report.rejected.len(),
                "appended images"
            );
            report
        }
    }

    /// Remove the queue entry at `index`, releasing its handle.
    pub fn remove_image(&self, index: usize) -> Result<QueueEntry, PipelineError> {
        let mut store = self.shared.store.borrow_mut();
        let entry = self.shared.queue.borrow_mut().remove_at(&mut store, index)?;
        Ok(entry)
    }

    /// Move a queue entry from `from` to `to`.
    pub fn reorder_images(&self, from: usize, to: usize) -> Result<(), PipelineError> {
        self.shared.queue.borrow_mut().reorder(from, to)?;
        Ok(())
    }

    pub fn clear_images(&self) {
        let mut store = self.shared.store.borrow_mut();
        self.shared.queue.borrow_mut().clear(&mut store);
    }

    /// The queue's entries, in order.
    pub fn queue_snapshot(&self) -> Vec<QueueEntry> {
        self.shared.queue.borrow().entries().to_vec()
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.borrow().len()
    }

    /// Release everything: queue entries, sources, outputs and tool states.
    ///
    /// Requests still in flight are superseded and will not install.
    pub fn teardown(&self) {
        {
            let mut store = self.shared.store.borrow_mut();
            for tool in Tool::ALL {
                store.issue(tool.output_slot());
            }
            self.shared.queue.borrow_mut().clear(&mut store);
            store.release_all();
        }
        self.shared.states.borrow_mut().clear();
        tracing::debug!("orchestrator torn down");
    }

    fn resolve_quality(&self, quality: Option<Quality>, default_percent: u32) -> Quality {
        match quality {
            Some(q) => self.config.quality(q.fraction()),
            None => self.config.quality_percent(default_percent),
        }
    }
}
