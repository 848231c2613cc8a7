//! Domain models with validation at construction
//!
//! All request input is validated when building these types.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod slug;
pub mod organization;
pub mod entity;
pub mod field_value;
pub mod user;
pub mod purchase_order;
pub mod pagination;

pub use validation::ValidationError;
pub use slug::{EntityType, FieldName, MetadataKey, RelationshipType};
pub use organization::OrganizationName;
pub use entity::{EntityCode, EntityName};
pub use field_value::FieldValue;
pub use user::{Email, USER_ENTITY_TYPE};
pub use purchase_order::{OrderLine, OrderLineInput, OrderLines};
pub use pagination::{Pagination, Paginated, PaginationParams};
