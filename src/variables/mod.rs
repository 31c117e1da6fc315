//! Debugger variables on top of the tree: watches, per-scope locals and
//! the reconciliation that keeps them in line with the debugger.

mod collection;
mod locals;
mod variable;
mod watches;

pub use collection::{Item, VariableCollection};
pub use variable::{
    is_potential_problematic_value, CellData, DataRole, Format, Highlight, Variable, NAME_COLUMN,
    TYPE_COLUMN, VALUE_COLUMN,
};
