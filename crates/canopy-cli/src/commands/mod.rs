pub mod apply;
pub mod classify;
pub mod consistency;
pub mod crs_check;
pub mod validate;
