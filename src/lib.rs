//! Minimal HTTP CRUD service over a product collection kept in a JSON file.
//!
//! Two pieces do the work: [`ProductStore`] owns the collection and its
//! backing document, and [`Dispatcher`] maps `/products` requests onto it.
//!
//! ```rust,no_run
//! use json_products::{Commit, ProductStore, Record};
//!
//! let store = ProductStore::open("data.json").unwrap();
//! let created = store.transact(|records| {
//!     let mut product = Record::from_json(br#"{"name": "Lamp"}"#).unwrap();
//!     product.set_id(store.next_id(records));
//!     records.push(product.clone());
//!     Commit::Save(product)
//! });
//! assert_eq!(created.id(), Some(1));
//! ```
//!
//! **Single-process only.** Writes within one process are serialized by
//! [`ProductStore::transact`]; two processes pointed at the same file will
//! clobber each other.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod flush;
pub mod persist;
pub mod record;
pub mod serializer;
pub mod server;
pub mod store;

pub use config::ServerConfig;
pub use dispatch::{BodyLimits, DispatchError, Dispatcher, Operation, UpdateMode};
pub use error::{Error, Result};
pub use flush::FlushPolicy;
pub use record::{Collection, Record};
pub use server::{app, Server};
pub use store::{Commit, IdStrategy, ProductStore, StoreBuilder, StoreHandle};
