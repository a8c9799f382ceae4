pub mod assemble;
pub mod detect;
pub mod normalize;
pub mod parsers;
pub mod pipeline;

pub use assemble::{assemble, AssembleOutput};
pub use detect::{detect_format, detect_from_pages};
pub use normalize::{
    normalize_amount, normalize_date, resolve_year, NormalizeError, YearResolution,
};
pub use parsers::{parser_for, LayoutMismatch, ParsedPage, RowParser};
pub use pipeline::{parse_pages, parse_statement, ParseError, ParseOptions, StatementParse};
