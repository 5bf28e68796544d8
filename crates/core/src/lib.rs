pub mod money;
pub mod patterns;
pub mod taxonomy;

pub use money::Money;
pub use patterns::{ReceiptDate, DATE_FORMATS, ITEM_STOPLIST, TOTAL_INDICATORS};
pub use taxonomy::{Category, CategoryDef, CategoryTaxonomy, TaxonomyError, OTHER_CATEGORY};
