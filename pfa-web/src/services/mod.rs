//! Service modules: upload storage, AI extraction, export, email

pub mod ai_client;
pub mod export;
pub mod extraction;
pub mod mailer;
pub mod storage;
pub mod uploads;

pub use ai_client::{AiError, DisabledAnalyzer, DocumentAnalyzer, GeminiClient};
pub use export::ExportError;
pub use extraction::{ExtractionError, PayslipData, ReceiptData};
pub use mailer::{MailAttachment, MailError, Mailer, OutgoingMail, SmtpMailer};
pub use storage::UploadStore;
pub use uploads::{collect_multipart, MultipartUpload, UploadResult, UploadStatus, UploadedFile};
