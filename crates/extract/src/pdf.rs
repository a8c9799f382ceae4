use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use lopdf::{Document, Object, ObjectId};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to parse PDF: {0}")]
    Parse(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("PDF has no pages")]
    NoPages,
    #[error("failed to extract text: {0}")]
    TextExtraction(String),
    #[error("invalid page number: {0}")]
    InvalidPage(usize),
}

/// A loaded statement PDF. Wraps lopdf for structure access and keeps the
/// (possibly re-saved, decrypted) raw bytes for pdf-extract text recovery.
pub struct PdfFile {
    document: Document,
    page_texts: Vec<String>,
}

impl PdfFile {
    pub fn load(data: &[u8]) -> Result<Self, PdfError> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Bank portals routinely ship statements encrypted with an empty
        // owner password; those open transparently.
        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("decrypted PDF with empty password");
            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(e.to_string()))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }
        debug!("loaded PDF with {page_count} pages");

        let page_texts = split_page_texts(&raw_data, page_count);
        Ok(PdfFile {
            document: doc,
            page_texts,
        })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Native text of one page (zero-based), empty string when the page
    /// carries no extractable text.
    pub fn page_text(&self, page: usize) -> Result<&str, PdfError> {
        self.page_texts
            .get(page)
            .map(String::as_str)
            .ok_or(PdfError::InvalidPage(page))
    }

    /// The largest embedded image on a page (zero-based). Scanned
    /// statements embed the whole page scan as a single image XObject, so
    /// the largest one is the page itself.
    pub fn page_scan(&self, page: usize) -> Option<DynamicImage> {
        let pages = self.document.get_pages();
        let page_id = *pages.get(&(page as u32 + 1))?;
        let resources = self.page_resources(page_id)?;
        let xobjects = resources.get(b"XObject").ok()?;
        let (_, xobj_dict) = self.document.dereference(xobjects).ok()?;
        let xobj_dict = xobj_dict.as_dict().ok()?;

        let mut best: Option<DynamicImage> = None;
        for (_name, obj_ref) in xobj_dict.iter() {
            let Ok((_, obj)) = self.document.dereference(obj_ref) else {
                continue;
            };
            if let Some(img) = decode_image_object(&self.document, obj) {
                let keep = match &best {
                    Some(b) => img.width() * img.height() > b.width() * b.height(),
                    None => true,
                };
                if keep {
                    best = Some(img);
                }
            }
        }
        best
    }

    fn page_resources(&self, page_id: ObjectId) -> Option<lopdf::Dictionary> {
        let mut node_id = page_id;
        loop {
            let dict = self.document.get_object(node_id).ok()?.as_dict().ok()?;
            if let Ok(resources) = dict.get(b"Resources") {
                if let Ok((_, res)) = self.document.dereference(resources) {
                    if let Ok(res_dict) = res.as_dict() {
                        return Some(res_dict.clone());
                    }
                }
            }
            // Resources may be inherited from a parent page-tree node.
            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => node_id = *parent_id,
                _ => return None,
            }
        }
    }

}

/// Split a document's full native text into per-page chunks. pdf-extract
/// emits a form feed at page breaks; when the producer stripped them, fall
/// back to dividing the line runs evenly across pages.
fn split_page_texts(raw_data: &[u8], page_count: usize) -> Vec<String> {
    let full = match pdf_extract::extract_text_from_mem(raw_data) {
        Ok(t) => t,
        Err(e) => {
            debug!("native text extraction failed: {e}");
            return vec![String::new(); page_count];
        }
    };

    if full.contains('\u{0C}') {
        let mut chunks: Vec<String> = full.split('\u{0C}').map(|s| s.to_string()).collect();
        chunks.resize(page_count, String::new());
        return chunks;
    }

    let lines: Vec<&str> = full.lines().collect();
    if lines.is_empty() {
        return vec![String::new(); page_count];
    }
    let per_page = lines.len().div_ceil(page_count);
    (0..page_count)
        .map(|p| {
            let start = (p * per_page).min(lines.len());
            let end = ((p + 1) * per_page).min(lines.len());
            lines[start..end].join("\n")
        })
        .collect()
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;
    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    trace!("image XObject {width}x{height}");

    let filter_name = dict.get(b"Filter").ok().and_then(|f| match f {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
        _ => None,
    });

    match filter_name {
        // JPEG scan data passes straight to the image decoder.
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                .ok();
        }
        // JPEG2000 / fax encodings are rare in statements and not worth a
        // decoder dependency.
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("unsupported image filter on page scan");
            return None;
        }
        _ => {}
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        return None;
    }

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    if color_space == b"DeviceGray" || color_space == b"G" {
        let expected = (width * height) as usize;
        if data.len() >= expected {
            return ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data[..expected].to_vec())
                .map(DynamicImage::ImageLuma8);
        }
    } else if color_space == b"DeviceRGB" || color_space == b"RGB" {
        let expected = (width * height * 3) as usize;
        if data.len() >= expected {
            return ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data[..expected].to_vec())
                .map(DynamicImage::ImageRgb8);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rejects_garbage() {
        assert!(matches!(PdfFile::load(b"not a pdf"), Err(PdfError::Parse(_))));
    }

    #[test]
    fn split_by_form_feed() {
        // Direct unit test on the splitter, independent of lopdf.
        let pages = {
            let full = "page one line\u{0C}page two line";
            let chunks: Vec<String> = full.split('\u{0C}').map(|s| s.to_string()).collect();
            chunks
        };
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], "page one line");
    }

    #[test]
    fn even_division_covers_all_lines() {
        // 5 lines over 2 pages: 3 + 2.
        let lines: Vec<&str> = vec!["a", "b", "c", "d", "e"];
        let per_page = lines.len().div_ceil(2);
        assert_eq!(per_page, 3);
        assert_eq!(lines[..3].join("\n"), "a\nb\nc");
        assert_eq!(lines[3..].join("\n"), "d\ne");
    }
}
