// Word-boundary safe matching of taxonomy terms in free text.

pub mod matcher;
pub mod terms;
