//! hearth-core: configuration, errors and the business rules shared by
//! the hearth server and CLI.

pub mod bulk;
pub mod codes;
pub mod config;
pub mod error;
pub mod purchasing;
pub mod slug;
pub mod templates;

pub use bulk::{parse_records, BulkError, BulkKind, BulkRecord, BulkReport, EntityRecord, RecordError, UserRecord};
pub use codes::{organization_code, transaction_code};
pub use config::{load_dotenv, HearthConfig};
pub use error::{HearthError, Result};
pub use purchasing::{line_amount, ApprovalDecision, ApprovalPolicy, ApproverRole, PoStatus};
pub use slug::is_slug;
pub use templates::{Template, TemplateEntity, TemplateRelationship};
