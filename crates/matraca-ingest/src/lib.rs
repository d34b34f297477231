mod cache;
mod error;
mod importer;
mod media;
mod pipeline;
mod router;
mod storage;

pub use cache::ConnectionStore;
pub use error::IngestError;
pub use importer::{HistoryImport, Importer};
pub use media::MediaResolver;
pub use router::WebhookRouter;
pub use storage::MediaStore;
