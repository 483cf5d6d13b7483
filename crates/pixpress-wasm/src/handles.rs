//! Object URL handles backed by browser Blobs.

use js_sys::{Array, Uint8Array};
use pixpress_core::{Handle, HandleError, HandleProvider};
use wasm_bindgen::JsValue;
use web_sys::{Blob, BlobPropertyBag, Url};

/// Creates `blob:` URLs for artifacts and revokes them on release.
#[derive(Debug, Default)]
pub struct ObjectUrlHandles;

impl ObjectUrlHandles {
    pub fn new() -> Self {
        ObjectUrlHandles
    }
}

fn js_error(context: &str, err: JsValue) -> HandleError {
    let detail = err.as_string().unwrap_or_else(|| format!("{err:?}"));
    HandleError(format!("{context}: {detail}"))
}

impl HandleProvider for ObjectUrlHandles {
    fn create(&mut self, bytes: &[u8], mime: &str) -> Result<Handle, HandleError> {
        let parts = Array::of1(&Uint8Array::from(bytes));
        let options = BlobPropertyBag::new();
        options.set_type(mime);

        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| js_error("failed to create blob", e))?;
        let url = Url::create_object_url_with_blob(&blob)
            .map_err(|e| js_error("failed to create object URL", e))?;
        Ok(Handle::new(url))
    }

    fn revoke(&mut self, handle: &Handle) {
        if let Err(err) = Url::revoke_object_url(handle.as_str()) {
            log::warn!("failed to revoke {}: {:?}", handle, err);
        }
    }
}
