// Matcher module: author-name scoring and refinement of search results.

pub mod similarity;
pub mod refine;

pub use similarity::{score, DEFAULT_THRESHOLD};
pub use refine::{refine, summarize_by_author, Refinement};
