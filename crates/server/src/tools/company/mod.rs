//! Company register tools.

pub mod export;
pub mod get;
pub mod import;
pub mod search;

pub use export::{CompanyExportParams, export_impl};
pub use get::{CompanyGetParams, get_impl};
pub use import::{CompanyImportParams, import_impl};
pub use search::{CompanySearchParams, search_impl};
