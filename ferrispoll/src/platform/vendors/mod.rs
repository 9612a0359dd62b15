//! Built-in device families.

pub mod tejas;
