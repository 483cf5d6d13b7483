//! Orchestrator bindings.
//!
//! [`JsOrchestrator`] owns one pixpress orchestrator with object-URL handles.
//! Request methods return Promises that resolve to a `JsArtifact` /
//! `JsDocument`, or to `undefined` when a newer request for the same tool
//! superseded them. Failures reject with the error message.
//!
//! # Example
//!
//! ```typescript
//! import { JsOrchestrator } from '@pixpress/wasm';
//!
//! const pipeline = new JsOrchestrator({ max_page_dim: 1600 });
//! const bytes = new Uint8Array(await file.arrayBuffer());
//!
//! pipeline.select_source('compress', file.name, bytes);
//! const preview = await pipeline.preview_resize(file.name, bytes, 60, 1024);
//! if (preview) img.src = preview.url;
//! ```

use js_sys::{Array, Promise, Uint8Array};
use pixpress_core::{
    Delivery, Document, EncodedArtifact, NativeCodec, Orchestrator, PipelineConfig, PipelineError,
    Quality, SourceAsset, Tool,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;

use crate::handles::ObjectUrlHandles;
use crate::types::{
    parse_page_size, parse_tool, status_name, AppendReportView, JsArtifact, JsDocument,
    QueueEntryView,
};

fn to_js_error(err: PipelineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn tool_arg(value: &str) -> Result<Tool, JsValue> {
    parse_tool(value).ok_or_else(|| JsValue::from_str(&format!("Unknown tool: {value}")))
}

fn artifact_result(result: Result<Delivery<EncodedArtifact>, PipelineError>) -> Result<JsValue, JsValue> {
    match result.map_err(to_js_error)? {
        Delivery::Installed { value, handle } => Ok(JsArtifact::from_artifact(value, handle).into()),
        Delivery::Superseded => Ok(JsValue::UNDEFINED),
    }
}

fn document_result(result: Result<Delivery<Document>, PipelineError>) -> Result<JsValue, JsValue> {
    match result.map_err(to_js_error)? {
        Delivery::Installed { value, handle } => Ok(JsDocument::from_document(value, handle).into()),
        Delivery::Superseded => Ok(JsValue::UNDEFINED),
    }
}

/// The image pipeline, as seen from JavaScript.
#[wasm_bindgen]
pub struct JsOrchestrator {
    inner: Orchestrator<NativeCodec, ObjectUrlHandles>,
}

#[wasm_bindgen]
impl JsOrchestrator {
    /// Create a pipeline. `config` may be `undefined` or a partial
    /// `PipelineConfig` object; missing fields take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsOrchestrator, JsValue> {
        let config: PipelineConfig = if config.is_undefined() || config.is_null() {
            PipelineConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        log::debug!("pipeline created with {:?}", config);

        Ok(JsOrchestrator {
            inner: Orchestrator::new(NativeCodec, ObjectUrlHandles::new(), config),
        })
    }

    /// Effective configuration as a plain object.
    pub fn config(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.inner.config()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Show a new source for `tool`. Returns the source's object URL, or
    /// `undefined` for the document tool.
    pub fn select_source(&self, tool: &str, name: String, bytes: Vec<u8>) -> Result<Option<String>, JsValue> {
        let tool = tool_arg(tool)?;
        let asset = SourceAsset::new(name, bytes);
        let handle = self
            .inner
            .select_source(tool, &asset)
            .map_err(|e| to_js_error(e.into()))?;
        Ok(handle.map(|h| h.as_str().to_string()))
    }

    /// Re-encode as JPEG for the compress preview.
    ///
    /// # Arguments
    ///
    /// * `quality` - Percent (1-100); `undefined` uses the configured default
    /// * `max_width` - Pixels; `undefined` uses the configured default, 0 keeps the native width
    pub fn preview_resize(
        &self,
        name: String,
        bytes: Vec<u8>,
        quality: Option<u32>,
        max_width: Option<u32>,
    ) -> Promise {
        let pending = self.inner.preview_resize(
            SourceAsset::new(name, bytes),
            quality.map(Quality::from_percent),
            max_width,
        );
        future_to_promise(async move { artifact_result(pending.await) })
    }

    /// Convert to `target` (a MIME type such as `"image/webp"`, or an extension).
    ///
    /// Omitted `quality` and `max_width` use the convert defaults (90, and
    /// the native width).
    pub fn convert(
        &self,
        name: String,
        bytes: Vec<u8>,
        target: &str,
        quality: Option<u32>,
        max_width: Option<u32>,
    ) -> Promise {
        let pending = self.inner.convert(
            SourceAsset::new(name, bytes),
            target,
            quality.map(Quality::from_percent),
            max_width,
        );
        future_to_promise(async move { artifact_result(pending.await) })
    }

    /// Assemble the queue into a PDF. `page_size` defaults to `"auto"`.
    pub fn assemble_document(&self, page_size: Option<String>) -> Result<Promise, JsValue> {
        let name = page_size.unwrap_or_default();
        let page_size = parse_page_size(&name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown page size: {name}")))?;
        let pending = self.inner.assemble_document(page_size);
        Ok(future_to_promise(async move { document_result(pending.await) }))
    }

    /// Decode and queue images. `files` is an array of `Uint8Array`, parallel
    /// to `names`. Resolves to `{ added: number[], rejected: { name, error }[], superseded }`;
    /// `superseded` is true when the queue was cleared before decoding finished.
    pub fn append_images(&self, names: Vec<String>, files: Array) -> Result<Promise, JsValue> {
        if names.len() != files.length() as usize {
            return Err(JsValue::from_str("names and files must have the same length"));
        }

        let mut assets = Vec::with_capacity(names.len());
        for (name, file) in names.into_iter().zip(files.iter()) {
            let bytes: Uint8Array = file
                .dyn_into()
                .map_err(|_| JsValue::from_str(&format!("{name}: expected a Uint8Array")))?;
            assets.push(SourceAsset::new(name, bytes.to_vec()));
        }

        let pending = self.inner.append_images(assets);
        Ok(future_to_promise(async move {
            let report = AppendReportView::from(pending.await);
            serde_wasm_bindgen::to_value(&report).map_err(|e| JsValue::from_str(&e.to_string()))
        }))
    }

    pub fn remove_image(&self, index: usize) -> Result<(), JsValue> {
        self.inner.remove_image(index).map(|_| ()).map_err(to_js_error)
    }

    pub fn reorder_images(&self, from: usize, to: usize) -> Result<(), JsValue> {
        self.inner.reorder_images(from, to).map_err(to_js_error)
    }

    pub fn clear_images(&self) {
        self.inner.clear_images();
    }

    #[wasm_bindgen(getter)]
    pub fn queue_length(&self) -> usize {
        self.inner.queue_len()
    }

    /// Queue entries in page order: `{ id, name, url, width, height }[]`.
    pub fn queue(&self) -> Result<JsValue, JsValue> {
        let entries: Vec<QueueEntryView> = self.inner.queue_snapshot().iter().map(QueueEntryView::from).collect();
        serde_wasm_bindgen::to_value(&entries).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// `"idle"`, `"working"`, `"ready"` or `"error"`.
    pub fn status(&self, tool: &str) -> Result<String, JsValue> {
        let tool = tool_arg(tool)?;
        Ok(status_name(self.inner.state(tool).status).to_string())
    }

    /// Message of the tool's last failure, if it is in the error state.
    pub fn error(&self, tool: &str) -> Result<Option<String>, JsValue> {
        let tool = tool_arg(tool)?;
        Ok(self.inner.state(tool).error.map(|e| e.to_string()))
    }

    /// Whether the tool's last failure means "planned but not available yet".
    pub fn is_not_yet_available(&self, tool: &str) -> Result<bool, JsValue> {
        let tool = tool_arg(tool)?;
        Ok(self
            .inner
            .state(tool)
            .error
            .is_some_and(|e| e.is_not_yet_available()))
    }

    /// Object URL of the tool's current output.
    pub fn output_url(&self, tool: &str) -> Result<Option<String>, JsValue> {
        let tool = tool_arg(tool)?;
        Ok(self
            .inner
            .handle(tool.output_slot())
            .map(|h| h.as_str().to_string()))
    }

    /// Revoke every object URL and empty the queue.
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn red_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([255, 0, 0]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[wasm_bindgen_test]
    async fn test_preview_resize_resolves_artifact() {
        let pipeline = JsOrchestrator::new(JsValue::UNDEFINED).unwrap();
        let promise = pipeline.preview_resize("red.png".into(), red_png(), Some(80), None);
        let value = JsFuture::from(promise).await.unwrap();
        assert!(!value.is_undefined());
        assert_eq!(pipeline.status("compress").unwrap(), "ready");
        assert!(pipeline.output_url("compress").unwrap().unwrap().starts_with("blob:"));
        pipeline.teardown();
    }

    #[wasm_bindgen_test]
    async fn test_convert_gif_rejects() {
        let pipeline = JsOrchestrator::new(JsValue::UNDEFINED).unwrap();
        let promise = pipeline.convert("red.png".into(), red_png(), "image/gif", None, None);
        assert_eq!(pipeline.status("convert").unwrap(), "error");
        assert!(pipeline.is_not_yet_available("convert").unwrap());
        assert!(JsFuture::from(promise).await.is_err());
    }

    #[wasm_bindgen_test]
    async fn test_document_round_trip() {
        let pipeline = JsOrchestrator::new(JsValue::UNDEFINED).unwrap();
        let png = red_png();
        let files = Array::of2(
            &JsValue::from(Uint8Array::from(png.as_slice())),
            &JsValue::from(Uint8Array::from(png.as_slice())),
        );
        let promise = pipeline
            .append_images(vec!["a.png".into(), "b.png".into()], files)
            .unwrap();
        JsFuture::from(promise).await.unwrap();
        assert_eq!(pipeline.queue_length(), 2);

        let promise = pipeline.assemble_document(None).unwrap();
        JsFuture::from(promise).await.unwrap();
        assert_eq!(pipeline.status("document").unwrap(), "ready");
        pipeline.teardown();
        assert_eq!(pipeline.queue_length(), 0);
    }

    #[wasm_bindgen_test]
    fn test_unknown_tool() {
        let pipeline = JsOrchestrator::new(JsValue::UNDEFINED).unwrap();
        assert!(pipeline.status("crop").is_err());
    }
}
