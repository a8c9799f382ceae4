pub mod extractor;
pub mod pdf;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use extractor::{DocumentExtractor, ExtractError};
pub use pdf::{PdfError, PdfFile};
pub use preprocess::{prepare_for_ocr_from_bytes, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use types::{ExtractionMethod, RawPage, Table};
