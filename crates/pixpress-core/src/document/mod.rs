//! Multi-page document assembly.
//!
//! Each queued image becomes one page whose MediaBox matches the image's
//! size, capped by [`PipelineConfig::max_page_dim`]. JPEG and PNG sources are
//! embedded from what was already decoded; other formats are transcoded to PNG
//! through the [`Codec`] first.
//!
//! Assembly is all-or-nothing: the first failing page aborts the document.

mod embed;
mod writer;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::Codec;
use crate::config::PipelineConfig;
use crate::decode::{DecodeError, SourceAsset};
use crate::encode::{EncodeError, FilterType, OutputFormat, Quality};
use crate::error::PipelineError;
use crate::geometry::{fit_within, RenderTarget};
use crate::naming::strip_extension;
use crate::queue::{EntryId, QueueEntry};

use embed::{EmbedPlan, EmbeddedImage};
use writer::PreparedPage;

/// MIME type of assembled documents.
pub const DOCUMENT_MIME: &str = "application/pdf";

/// Page sizing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// Each page takes the size of its image.
    #[default]
    Auto,
    A4,
    Letter,
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageSize::Auto => "Auto",
            PageSize::A4 => "A4",
            PageSize::Letter => "Letter",
        };
        f.write_str(name)
    }
}

/// One page of an assembled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub rendered_width: u32,
    pub rendered_height: u32,
    pub source: EntryId,
}

/// An assembled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub pages: Vec<Page>,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn mime(&self) -> &'static str {
        DOCUMENT_MIME
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Why a format could not be brought into embeddable form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedFailure {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// An image could not be embedded, even after transcoding to PNG.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot embed {name} in the document: {cause}")]
pub struct UnsupportedEmbedFormatError {
    pub name: String,
    #[source]
    pub cause: EmbedFailure,
}

/// Build a document from queue entries, one page per entry, in order.
///
/// # Arguments
///
/// * `codec` - Used only for entries that need the PNG fallback
/// * `entries` - Queue entries in page order
/// * `page_size` - Only [`PageSize::Auto`] is available
/// * `config` - Supplies the page-size cap
///
/// # Errors
///
/// * `PageSizeUnavailable` for `A4` and `Letter`
/// * `EmptyQueue` if `entries` is empty
/// * `UnsupportedEmbedFormat` if the PNG fallback fails for an entry
/// * `DocumentWrite` if serialization fails
pub async fn assemble_document<C: Codec + ?Sized>(
    codec: &C,
    entries: &[QueueEntry],
    page_size: PageSize,
    config: &PipelineConfig,
) -> Result<Document, PipelineError> {
    if page_size != PageSize::Auto {
        return Err(PipelineError::PageSizeUnavailable(page_size));
    }
    if entries.is_empty() {
        return Err(PipelineError::EmptyQueue);
    }

    let mut prepared = Vec::with_capacity(entries.len());
    let mut pages = Vec::with_capacity(entries.len());

    for entry in entries {
        let (width, height) = (entry.surface.native_width(), entry.surface.native_height());
        let target = fit_within(width, height, config.max_page_dim)?;
        let image = embed_entry(codec, entry).await?;

        pages.push(Page {
            rendered_width: target.width,
            rendered_height: target.height,
            source: entry.id,
        });
        prepared.push(PreparedPage {
            image,
            width: target.width,
            height: target.height,
        });
    }

    let bytes = writer::write_pdf(prepared)?;
    tracing::info!(pages = pages.len(), size = bytes.len(), "assembled document");

    Ok(Document { pages, bytes })
}

async fn embed_entry<C: Codec + ?Sized>(
    codec: &C,
    entry: &QueueEntry,
) -> Result<EmbeddedImage, PipelineError> {
    let surface = &entry.surface;
    let plan = embed::plan(&entry.asset, surface);
    tracing::debug!(name = %entry.display_name, ?plan, "embedding page image");

    match plan {
        EmbedPlan::Jpeg { components } => Ok(embed::jpeg_xobject(
            &entry.asset.bytes,
            surface.native_width(),
            surface.native_height(),
            components,
        )),
        EmbedPlan::Raster => Ok(embed::raster_xobject(&surface.image)?),
        EmbedPlan::Transcode => {
            let unsupported = |cause: EmbedFailure| UnsupportedEmbedFormatError {
                name: entry.display_name.clone(),
                cause,
            };

            let native = RenderTarget {
                width: surface.native_width(),
                height: surface.native_height(),
            };
            let png = codec
                .encode(surface, native, OutputFormat::Png, Quality::default(), FilterType::Nearest)
                .await
                .map_err(|e| unsupported(e.into()))?;

            let name = format!("{}.png", strip_extension(&entry.display_name));
            let asset = SourceAsset::new(name, png.bytes);
            let decoded = codec
                .decode(&asset)
                .await
                .map_err(|e| unsupported(e.into()))?;

            Ok(embed::raster_xobject(&decoded.image)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactStore, MemoryHandles};
    use crate::codec::NativeCodec;
    use crate::decode::Surface;
    use crate::encode::EncodedArtifact;
    use crate::queue::ImageQueue;
    use async_trait::async_trait;
    use futures::executor::block_on;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn rgb(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 100, 50]))),
            format,
        )
    }

    fn queue_of<C: Codec>(codec: &C, assets: Vec<SourceAsset>) -> Vec<QueueEntry> {
        let mut store = ArtifactStore::new(MemoryHandles::new());
        let mut queue = ImageQueue::new();
        let report = block_on(queue.append(codec, &mut store, assets));
        assert!(report.rejected.is_empty());
        queue.entries().to_vec()
    }

    fn small_pages() -> PipelineConfig {
        PipelineConfig {
            max_page_dim: 100,
            ..PipelineConfig::default()
        }
    }

    fn page_image(pdf: &lopdf::Document, page_id: lopdf::ObjectId) -> lopdf::Stream {
        let page = pdf.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        pdf.get_object(image_id).unwrap().as_stream().unwrap().clone()
    }

    fn media_box(pdf: &lopdf::Document, page_id: lopdf::ObjectId) -> Vec<i64> {
        let page = pdf.get_dictionary(page_id).unwrap();
        page.get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_two_entries_two_pages_with_capped_sizes() {
        let entries = queue_of(
            &NativeCodec,
            vec![
                SourceAsset::new("small.png", rgb(30, 20, ImageFormat::Png)),
                SourceAsset::new("wide.jpg", rgb(250, 100, ImageFormat::Jpeg)),
            ],
        );

        let doc = block_on(assemble_document(&NativeCodec, &entries, PageSize::Auto, &small_pages())).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!((doc.pages[0].rendered_width, doc.pages[0].rendered_height), (30, 20));
        assert_eq!((doc.pages[1].rendered_width, doc.pages[1].rendered_height), (100, 40));
        assert_eq!(doc.pages[0].source, entries[0].id);
        assert_eq!(doc.mime(), "application/pdf");
        assert!(doc.bytes.starts_with(b"%PDF-1.5"));

        let pdf = lopdf::Document::load_mem(&doc.bytes).unwrap();
        let pages = pdf.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(media_box(&pdf, pages[&1]), vec![0, 0, 30, 20]);
        assert_eq!(media_box(&pdf, pages[&2]), vec![0, 0, 100, 40]);

        let png_image = page_image(&pdf, pages[&1]);
        assert_eq!(png_image.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
        let jpeg_image = page_image(&pdf, pages[&2]);
        assert_eq!(jpeg_image.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(jpeg_image.dict.get(b"Width").unwrap().as_i64().unwrap(), 250);
    }

    #[test]
    fn test_page_order_follows_queue_order() {
        let entries = queue_of(
            &NativeCodec,
            vec![
                SourceAsset::new("a.png", rgb(10, 20, ImageFormat::Png)),
                SourceAsset::new("b.png", rgb(30, 40, ImageFormat::Png)),
                SourceAsset::new("c.png", rgb(50, 60, ImageFormat::Png)),
            ],
        );
        let reversed: Vec<QueueEntry> = entries.iter().rev().cloned().collect();

        let doc = block_on(assemble_document(&NativeCodec, &reversed, PageSize::Auto, &small_pages())).unwrap();
        let sources: Vec<EntryId> = doc.pages.iter().map(|p| p.source).collect();
        assert_eq!(sources, vec![entries[2].id, entries[1].id, entries[0].id]);
        assert_eq!(doc.pages[0].rendered_width, 50);
    }

    #[test]
    fn test_other_formats_use_png_fallback() {
        let entries = queue_of(
            &NativeCodec,
            vec![
                SourceAsset::new("a.bmp", rgb(8, 6, ImageFormat::Bmp)),
                SourceAsset::new("b.webp", rgb(6, 8, ImageFormat::WebP)),
            ],
        );

        let doc = block_on(assemble_document(&NativeCodec, &entries, PageSize::Auto, &small_pages())).unwrap();
        let pdf = lopdf::Document::load_mem(&doc.bytes).unwrap();
        for (_, page_id) in pdf.get_pages() {
            let image = page_image(&pdf, page_id);
            assert_eq!(image.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
        }
        assert_eq!((doc.pages[1].rendered_width, doc.pages[1].rendered_height), (6, 8));
    }

    #[test]
    fn test_transparent_png_gets_soft_mask() {
        let png = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 64]))),
            ImageFormat::Png,
        );
        let entries = queue_of(&NativeCodec, vec![SourceAsset::new("t.png", png)]);

        let doc = block_on(assemble_document(&NativeCodec, &entries, PageSize::Auto, &small_pages())).unwrap();
        let pdf = lopdf::Document::load_mem(&doc.bytes).unwrap();
        let page_id = pdf.get_pages()[&1];
        let image = page_image(&pdf, page_id);
        assert!(image.dict.get(b"SMask").unwrap().as_reference().is_ok());
    }

    #[test]
    fn test_empty_queue_is_rejected() {
        let result = block_on(assemble_document(&NativeCodec, &[], PageSize::Auto, &PipelineConfig::default()));
        assert_eq!(result, Err(PipelineError::EmptyQueue));
    }

    #[test]
    fn test_fixed_page_sizes_not_yet_available() {
        let entries = queue_of(&NativeCodec, vec![SourceAsset::new("a.png", rgb(4, 4, ImageFormat::Png))]);
        for size in [PageSize::A4, PageSize::Letter] {
            let err = block_on(assemble_document(&NativeCodec, &entries, size, &PipelineConfig::default()))
                .unwrap_err();
            assert_eq!(err, PipelineError::PageSizeUnavailable(size));
            assert!(err.is_not_yet_available());
        }
    }

    /// Decodes normally but cannot encode anything.
    struct NoEncoder;

    #[async_trait(?Send)]
    impl Codec for NoEncoder {
        async fn decode(&self, asset: &SourceAsset) -> Result<Surface, DecodeError> {
            crate::decode::decode_asset(asset)
        }

        async fn encode(
            &self,
            _surface: &Surface,
            _target: RenderTarget,
            _format: OutputFormat,
            _quality: Quality,
            _filter: FilterType,
        ) -> Result<EncodedArtifact, EncodeError> {
            Err(EncodeError::EncodingFailed("no encoder".into()))
        }
    }

    #[test]
    fn test_failed_fallback_aborts_whole_document() {
        let entries = queue_of(
            &NoEncoder,
            vec![
                SourceAsset::new("ok.png", rgb(4, 4, ImageFormat::Png)),
                SourceAsset::new("odd.bmp", rgb(4, 4, ImageFormat::Bmp)),
            ],
        );

        let err = block_on(assemble_document(&NoEncoder, &entries, PageSize::Auto, &small_pages())).unwrap_err();
        match err {
            PipelineError::UnsupportedEmbedFormat(e) => {
                assert_eq!(e.name, "odd.bmp");
                assert_eq!(
                    e.cause,
                    EmbedFailure::Encode(EncodeError::EncodingFailed("no encoder".into()))
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_page_size_display() {
        assert_eq!(PageSize::Letter.to_string(), "Letter");
        assert_eq!(PageSize::default(), PageSize::Auto);
    }
}
