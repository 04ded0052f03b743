pub use self::{
    path::get_path,
    types::{DBRow, DataBase, PoolOption, PoolType, QueryResult},
};

mod path;
mod race_snapshot;
mod types;
