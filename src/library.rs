mod scan;

pub use scan::{ScannedTags, YEAR_TAG, scan};
