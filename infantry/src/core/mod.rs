//! Pure mission logic: types, naming rules, summary handling, invariants.

pub mod branch_name;
pub mod fences;
pub mod invariants;
pub mod paths;
pub mod records;
pub mod summary;
pub mod types;
