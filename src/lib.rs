pub mod accounting;
pub mod batch;
pub mod cli;
pub mod compressor;
pub mod config;
pub mod constants;
pub mod delivery;
pub mod error;
pub mod logger;
pub mod mime;
pub mod notify;
pub mod profile;
pub mod remote;
pub mod server;
pub mod temp_store;
pub mod workflow;

pub use accounting::{format_file_size, rounded_kib, size_reduction_percent};
pub use batch::{collect_input_files, Batch, CandidateFile, CompressionResult, ImageItem, ItemStatus};
pub use compressor::{Compressor, ImageCompressor};
pub use config::{ServerConfig, ServerOverrides};
pub use delivery::{download_name, export_batch};
pub use error::{CompressionError, Result};
pub use mime::ImageMime;
pub use notify::{CollectingNotifier, LogNotifier, Notification, Notifier};
pub use profile::{CompressionOptions, CompressionProfile};
pub use remote::HttpCompressor;
pub use server::{router, serve, AppState, CompressResponse};
pub use temp_store::{TempFile, TempStore};
pub use workflow::{CompressionWorkflow, RunOutcome};
