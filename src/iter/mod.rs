//! Inventory iteration and address filtering.
//!
//! `inventory` defines what a provider must offer; `walk` holds the nested
//! `for_each_*` walkers built on it.

pub mod inventory;
pub mod walk;

pub use inventory::{Inventory, MAX_NAME_LEN, bounded_name};
pub use walk::{
    for_each_connection, for_each_control, for_each_domain, for_each_entity, for_each_mc,
    for_each_sensor, parse_conn_number,
};
