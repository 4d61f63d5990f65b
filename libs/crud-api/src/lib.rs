// Lets `#[derive(Record)]` and `#[derive(Args)]` expand to `crud_api::...`
// paths inside this crate too.
extern crate self as crud_api;

pub mod config;
pub mod decode;
pub mod error;
pub mod identifier;
pub mod mapping;
pub mod query;
pub mod schema;
pub mod store;
pub mod value;

pub use crud_api_derive::{Args, Record};

pub use config::StoreConfig;
pub use decode::{CommitMode, decode, decode_with, set_field};
pub use error::{BoxError, CrudError, IdentifierError, ScanStage, ShapeError};
pub use identifier::parse_identifier;
pub use mapping::{FieldMapping, FieldRef, resolve};
pub use query::{Args, Connection, Cursor, run, run_with};
pub use schema::{FieldDescriptor, FieldKind, FieldType, Record, Shape, ShapeBuilder};
pub use store::Store;
pub use uuid::Uuid;
pub use value::{FromValue, Row, ToValue, Value, ValueError};
