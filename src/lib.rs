#[macro_use]
extern crate prettytable;

pub mod cli;
pub mod filter;
pub mod interface;
pub mod loader;
pub mod model;

pub use filter::{filter, render, render_line, select};
pub use loader::{load_from_reader, load_from_workbook, load_tasks, LoadError};
pub use model::{Criteria, Period, TaskRecord};
