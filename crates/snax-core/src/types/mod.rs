//! Type definitions for snax

pub mod column_like;
pub mod entity;
pub mod feature;
pub mod if_exists;
pub mod row_key;
pub mod table;
pub mod value;
pub mod value_type;

pub use column_like::{resolve, ColumnLike};
pub use entity::{Entity, DUMMY_ENTITY_ID, DUMMY_ENTITY_NAME};
pub use feature::Feature;
pub use if_exists::IfExists;
pub use row_key::RowKey;
pub use table::Table;
pub use value::Value;
pub use value_type::ValueType;
