//! Checkout data structures and algorithms
//!
//! - `branch`: branch and symbolic ref names
//! - `checkout`: target resolution, conflict detection, materialization
//! - `database`: database entry types
//! - `index`: index entry binary format
//! - `objects`: object types (blob, tree, commit)
//! - `status`: working tree status inspection and the dirty set
//! - `walk`: lazy depth-first traversal over tree graphs

pub mod branch;
pub mod checkout;
pub mod database;
pub mod index;
pub mod objects;
pub mod status;
pub mod walk;
