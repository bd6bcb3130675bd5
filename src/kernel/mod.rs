//! The CRUD kernel: method selection, authorization, validation, execution,
//! and response serialisation.

mod dispatch;
mod exec;
mod select;
mod serialize;
mod validate;

pub use dispatch::{dispatch, KernelResponse};
pub use exec::DataService;
pub use select::{select_operation, Operation};
pub use serialize::{rows_to_csv, to_xml};
pub use validate::validate_record;
