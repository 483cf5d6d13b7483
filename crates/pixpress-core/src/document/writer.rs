//! PDF serialization with `lopdf`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};

use super::embed::EmbeddedImage;

/// A page ready to be written: one image covering a `width x height` MediaBox.
pub(crate) struct PreparedPage {
    pub image: EmbeddedImage,
    pub width: u32,
    pub height: u32,
}

/// Write pages into a single PDF 1.5 file, one image per page.
pub(crate) fn write_pdf(pages: Vec<PreparedPage>) -> lopdf::Result<Vec<u8>> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let page_id = add_page(&mut doc, pages_id, page)?;
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn add_page(doc: &mut lopdf::Document, parent: ObjectId, page: PreparedPage) -> lopdf::Result<ObjectId> {
    let PreparedPage { image, width, height } = page;
    let (w, h) = (i64::from(width), i64::from(height));

    let mut image_stream = image.image;
    if let Some(smask) = image.smask {
        let smask_id = doc.add_object(smask);
        image_stream.dict.set("SMask", smask_id);
    }
    let image_id = doc.add_object(image_stream);

    // Scale the unit square onto the whole page.
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.into(), 0_i64.into(), 0_i64.into(), h.into(), 0_i64.into(), 0_i64.into()],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "MediaBox" => vec![0_i64.into(), 0_i64.into(), w.into(), h.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });

    Ok(page_id)
}
