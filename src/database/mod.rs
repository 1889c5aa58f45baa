pub mod connection;
pub mod memory;
pub mod models;
pub mod store;

pub use store::{
    DeliveryLedger, RecipientDirectory, ResultStore, StorageError, Stores, TimezoneStore,
};
