//! Control provider abstraction.
//!
//! The resolver never talks to an OS accessibility API directly. It consumes
//! the capability set defined here: read access to a live control tree plus
//! window-level enumeration. Each backend implements [`ControlNode`] for its
//! native element type and [`ControlProvider`] for tree-level operations.

use crate::errors::LocatorError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Screen rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }
}

/// Identity attributes of one control, read live from the tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlAttributes {
    pub name: String,
    pub automation_id: String,
    pub class_name: String,
    pub control_type: String,
}

/// One row of `list_windows`: a top-level window cross-referenced with the
/// OS process list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowInfo {
    pub title: String,
    pub pid: u32,
    /// Executable name of the owning process, e.g. `notepad.exe`.
    pub name: String,
    pub handle: isize,
}

/// Attribute-search parameters handed to the provider for one chain segment.
///
/// A `control_type` of `"Control"` means "any control type".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub control_type: String,
    pub name: Option<String>,
    /// Partial (substring) name match.
    pub sub_name: Option<String>,
    /// Regular-expression name match.
    pub regex_name: Option<String>,
    pub automation_id: Option<String>,
    pub class_name: Option<String>,
    pub search_depth: u32,
    /// 1-based index among matches.
    pub found_index: Option<u32>,
}

impl SearchParams {
    pub fn new(search_depth: u32) -> Self {
        Self {
            control_type: "Control".to_string(),
            name: None,
            sub_name: None,
            regex_name: None,
            automation_id: None,
            class_name: None,
            search_depth,
            found_index: None,
        }
    }
}

/// Interface for platform-specific control implementations.
pub trait ControlNode: Send + Sync + Debug {
    fn attributes(&self) -> Result<ControlAttributes, LocatorError>;
    fn children(&self) -> Result<Vec<Control>, LocatorError>;
    fn parent(&self) -> Result<Option<Control>, LocatorError>;
    fn next_sibling(&self) -> Result<Option<Control>, LocatorError>;

    /// Read the control's bounding rectangle.
    ///
    /// `Ok(None)` means the control has no on-screen geometry (non-visual
    /// node). `Err(ElementGone)` means the control no longer exists; callers
    /// use this read as the liveness probe.
    fn bounding_rectangle(&self) -> Result<Option<Rect>, LocatorError>;

    fn native_window_handle(&self) -> Result<isize, LocatorError>;
    fn process_id(&self) -> Result<u32, LocatorError>;

    /// Un-minimize the window backing this control, when there is one.
    fn try_restore(&self) -> Result<(), LocatorError>;
    fn focus(&self) -> Result<(), LocatorError>;

    fn clone_box(&self) -> Box<dyn ControlNode>;
    fn as_any(&self) -> &dyn std::any::Any;
}

/// A handle to one live control in the tree.
#[derive(Debug)]
pub struct Control {
    inner: Box<dyn ControlNode>,
}

impl Control {
    pub fn new(inner: Box<dyn ControlNode>) -> Self {
        Self { inner }
    }

    pub fn attributes(&self) -> Result<ControlAttributes, LocatorError> {
        self.inner.attributes()
    }

    pub fn children(&self) -> Result<Vec<Control>, LocatorError> {
        self.inner.children()
    }

    pub fn parent(&self) -> Result<Option<Control>, LocatorError> {
        self.inner.parent()
    }

    pub fn next_sibling(&self) -> Result<Option<Control>, LocatorError> {
        self.inner.next_sibling()
    }

    pub fn bounding_rectangle(&self) -> Result<Option<Rect>, LocatorError> {
        self.inner.bounding_rectangle()
    }

    pub fn native_window_handle(&self) -> Result<isize, LocatorError> {
        self.inner.native_window_handle()
    }

    pub fn process_id(&self) -> Result<u32, LocatorError> {
        self.inner.process_id()
    }

    pub fn try_restore(&self) -> Result<(), LocatorError> {
        self.inner.try_restore()
    }

    pub fn focus(&self) -> Result<(), LocatorError> {
        self.inner.focus()
    }

    pub fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }
}

impl Clone for Control {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

/// The common trait that all platform backends implement.
pub trait ControlProvider: Send + Sync {
    /// The desktop root control.
    fn root_control(&self) -> Control;

    /// Attribute search scoped to `root`.
    ///
    /// Zero-match and ambiguity semantics are provider-defined; the engine
    /// passes parameters through and surfaces whatever the provider raises.
    fn find_by_attributes(
        &self,
        root: &Control,
        params: &SearchParams,
    ) -> Result<Control, LocatorError>;

    /// Enumerate all top-level windows, re-read on every call.
    fn list_top_level_windows(&self) -> Result<Vec<WindowInfo>, LocatorError> {
        let mut windows = Vec::new();
        for child in self.root_control().children()? {
            let attrs = child.attributes()?;
            let pid = child.process_id()?;
            let name = self.process_name(pid).unwrap_or_default();
            windows.push(WindowInfo {
                title: attrs.name,
                pid,
                name,
                handle: child.native_window_handle().unwrap_or(0),
            });
        }
        Ok(windows)
    }

    /// Executable name for a process id.
    fn process_name(&self, pid: u32) -> Result<String, LocatorError>;

    /// Move the synthetic pointer to screen coordinates.
    fn move_pointer(&self, x: i32, y: i32) -> Result<(), LocatorError>;

    /// Swap the process-wide search timeout, returning the previous value.
    ///
    /// Scoped configuration change, not a per-call parameter; concurrent
    /// resolvers would race on it. Single-threaded callers only.
    fn set_search_timeout(&self, seconds: f64) -> f64;
}

#[cfg(target_os = "windows")]
pub mod windows;

/// Create the binding for the current platform.
pub fn create_provider() -> Result<Arc<dyn ControlProvider>, LocatorError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::UiAutomationProvider::new()?))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(LocatorError::UnsupportedPlatform(
            "no control provider for the current platform".to_string(),
        ))
    }
}
