//! Locator resolution for Windows desktop UI automation.
//!
//! This crate turns human-written locator strings such as
//! `name:'Save As' and type:Button > id:confirm` into structured search
//! specifications and resolves them against a live control tree. The tree
//! itself is reached through the [`platforms::ControlProvider`] capability
//! set; the OS accessibility binding is an external collaborator, not
//! something this crate re-implements.
//!
//! # Examples
//!
//! ```no_run
//! use winlocator::Resolver;
//!
//! let mut resolver = Resolver::new_default()?;
//! resolver.control_window("subname:Notepad")?;
//! let element = resolver.resolve("name:'Save As' and type:Button")?;
//! println!("resolved {} at ({}, {})", element.name, element.xcenter, element.ycenter);
//! # Ok::<(), winlocator::LocatorError>(())
//! ```

pub mod aliases;
pub mod element;
pub mod errors;
pub mod locator;
pub mod platforms;
pub mod resolver;
#[cfg(test)]
mod tests;

pub use aliases::AliasStore;
pub use element::WindowsElement;
pub use errors::LocatorError;
pub use locator::{Locator, LocatorToken, MatchType, ParsedLocator, Strategy};
pub use platforms::{
    Control, ControlAttributes, ControlNode, ControlProvider, Rect, SearchParams, WindowInfo,
};
pub use resolver::{ResolutionContext, Resolver, DEFAULT_SEARCH_DEPTH};
