//! Client side of the user directory: a typed HTTP client for the proxy and a
//! controller that sequences calls and owns the state shown to the user.

pub mod api;
pub mod controller;
pub mod disposition;
pub mod error;
pub mod form;

pub use api::{CsvExport, DirectoryApi, ImportFile, ListQuery, ProxyClient};
pub use controller::{
    import_summary, DetailState, DirectoryController, DownloadSink, FormState, ImportState,
    OpenForm, Outcome, Phase, Prompt,
};
pub use disposition::{filename_from_disposition, DEFAULT_EXPORT_FILENAME};
pub use error::ClientError;
pub use form::UserForm;
