use serde::{Deserialize, Serialize};

/// How a page's content was obtained. Parsers use this to decide how much
/// noise tolerance a page needs: native content is trustworthy, OCR output
/// is unstructured text only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    NativeText,
    NativeTable,
    Ocr,
}

/// A recovered cell grid: rows × cells. A cell may contain embedded
/// newlines when the source renderer merged several physical lines into
/// one logical cell.
pub type Table = Vec<Vec<String>>;

/// One page's extracted content. Produced once per page and never mutated
/// afterwards; owned by the extraction call that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    /// Zero-based page index within the document.
    pub index: usize,
    pub method: ExtractionMethod,
    /// Ordered text lines. Always populated, even when a table was
    /// recovered, so line-oriented parsers work on every page.
    pub lines: Vec<String>,
    /// Cell grids recovered from column-aligned regions. Empty for OCR
    /// pages: no structural information from OCR is considered reliable.
    pub tables: Vec<Table>,
}

impl RawPage {
    pub fn text(index: usize, method: ExtractionMethod, lines: Vec<String>) -> Self {
        RawPage {
            index,
            method,
            lines,
            tables: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty()) && self.tables.is_empty()
    }
}
