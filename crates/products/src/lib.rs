//! Products and the vendors they can be bought from (event-sourced).
//!
//! Pure domain logic (no IO, no storage).

pub mod product;

pub use product::{
    AddSupplier, CreateProduct, Product, ProductCommand, ProductCreated, ProductEvent, ProductId,
    RemoveSupplier, SupplierAdded, SupplierInfo, SupplierRemoved,
};
