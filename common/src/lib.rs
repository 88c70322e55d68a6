//! VIN Scan Common Library
//!
//! CLIとデスクトップで共有される状態機械・アップロード内容・結果整形

pub mod error;
pub mod filters;
pub mod render;
pub mod response;
pub mod session;
pub mod types;
pub mod upload;

pub use error::{Error, Result};
pub use filters::{FilterOption, SelectedFilters};
pub use render::{render_rows, ResultRow, NOT_AVAILABLE};
pub use response::{parse_response, ResponseContract, LEGACY_VIN_LABEL};
pub use session::{Completion, ScanSession, ScanState, SessionNotice, UploadTicket, View};
pub use types::{FieldMapping, ImageLocation};
pub use upload::{UploadRequest, FILTERS_PART, IMAGE_PART};
