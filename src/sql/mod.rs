//! Parameterized SQL construction for the CRUD kernel.

mod builder;
mod params;

pub use builder::{
    count, insert, nullify_component, purge, select_group_counts, select_list, select_one,
    select_one_any, soft_delete, soft_delete_components, update, Filter, QueryBuf, META_COLUMNS,
};
pub use params::PgBindValue;
