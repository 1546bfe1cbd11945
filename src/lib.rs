pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod logger;
pub mod model;
pub mod progression;
pub mod service;
pub mod store;

mod macros;

pub trait Located {
    fn location(&self) -> snafu::Location;
}

pub mod prelude {
    pub use derive_new::new;
    pub use serde::{de::DeserializeOwned, Deserialize, Serialize};
    pub use snafu::{Location, OptionExt as _, ResultExt as _, Snafu};

    pub use crate::database::{Database, DatabaseError};
    pub use crate::model::*;
    pub use crate::Located;
}
