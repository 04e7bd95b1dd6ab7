//! UI components module.
//!
//! This module provides UI components that track cache records as dependent entries.

pub mod menu;

pub use menu::{InvalidateCallback, MenuEntry, MenuList, MenuListBuilder, MenuRow, RowFilter};
