//! Task domain types and validation.

pub mod model;

pub use model::{
    DESCRIPTION_MAX_LEN, Priority, TITLE_MAX_LEN, Task, TaskCreate, TaskUpdate,
    validate_description, validate_title,
};
