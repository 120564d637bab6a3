//! Windows UI Automation binding.
//!
//! Implements the control-provider capability set over the `uiautomation`
//! crate. All searches honor the provider-wide timeout slot, which
//! `set_search_timeout` swaps in place.

#![allow(clippy::arc_with_non_send_sync)]

use crate::errors::LocatorError;
use crate::platforms::{
    Control, ControlAttributes, ControlNode, ControlProvider, Rect, SearchParams,
};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uiautomation::controls::ControlType;
use uiautomation::filters::{AndFilter, ClassNameFilter, MatcherFilter, NameFilter};
use uiautomation::types::TreeScope;
use uiautomation::UIAutomation;

const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 5000;

// thread-safety wrappers for the COM pointers
#[derive(Clone)]
pub struct ThreadSafeUIAutomation(pub Arc<UIAutomation>);

unsafe impl Send for ThreadSafeUIAutomation {}
unsafe impl Sync for ThreadSafeUIAutomation {}

#[derive(Clone)]
pub struct ThreadSafeUIElement(pub Arc<uiautomation::UIElement>);

unsafe impl Send for ThreadSafeUIElement {}
unsafe impl Sync for ThreadSafeUIElement {}

pub struct UiAutomationProvider {
    automation: ThreadSafeUIAutomation,
    search_timeout_ms: Mutex<u64>,
}

impl UiAutomationProvider {
    pub fn new() -> Result<Self, LocatorError> {
        let automation = UIAutomation::new().map_err(|e| {
            LocatorError::PlatformError(format!("failed to initialize UI Automation: {e}"))
        })?;
        Ok(Self {
            automation: ThreadSafeUIAutomation(Arc::new(automation)),
            search_timeout_ms: Mutex::new(DEFAULT_SEARCH_TIMEOUT_MS),
        })
    }

    fn wrap(&self, element: uiautomation::UIElement) -> Control {
        Control::new(Box::new(WinControl {
            element: ThreadSafeUIElement(Arc::new(element)),
            automation: self.automation.clone(),
        }))
    }

    fn timeout_ms(&self) -> u64 {
        *self
            .search_timeout_ms
            .lock()
            .expect("timeout lock poisoned")
    }
}

impl ControlProvider for UiAutomationProvider {
    fn root_control(&self) -> Control {
        let root = self
            .automation
            .0
            .get_root_element()
            .expect("desktop root element is always available");
        self.wrap(root)
    }

    fn find_by_attributes(
        &self,
        root: &Control,
        params: &SearchParams,
    ) -> Result<Control, LocatorError> {
        let root_el = root
            .as_any()
            .downcast_ref::<WinControl>()
            .ok_or_else(|| {
                LocatorError::PlatformError(
                    "search root is not a Windows control".to_string(),
                )
            })?;

        let timeout_ms = self.timeout_ms();
        debug!(?params, timeout_ms, "searching control tree");

        let mut matcher = self
            .automation
            .0
            .create_matcher()
            .from_ref(&root_el.element.0)
            .depth(params.search_depth)
            .timeout(timeout_ms);

        if let Some(control_type) = map_control_type(&params.control_type) {
            matcher = matcher.control_type(control_type);
        }

        let mut filters: Vec<Box<dyn MatcherFilter>> = Vec::new();
        if let Some(name) = &params.name {
            filters.push(Box::new(NameFilter {
                value: name.clone(),
                casesensitive: true,
                partial: false,
            }));
        }
        if let Some(sub_name) = &params.sub_name {
            filters.push(Box::new(NameFilter {
                value: sub_name.clone(),
                casesensitive: true,
                partial: true,
            }));
        }
        if let Some(class_name) = &params.class_name {
            filters.push(Box::new(ClassNameFilter {
                classname: class_name.clone(),
            }));
        }
        let automation_id = params.automation_id.clone();
        let name_pattern = params
            .regex_name
            .as_deref()
            .map(regex::Regex::new)
            .transpose()
            .map_err(|e| LocatorError::PlatformError(format!("invalid name regex: {e}")))?;
        if automation_id.is_some() || name_pattern.is_some() {
            matcher = matcher.filter_fn(Box::new(move |e: &uiautomation::UIElement| {
                if let Some(id) = &automation_id {
                    if &e.get_automation_id()? != id {
                        return Ok(false);
                    }
                }
                if let Some(pattern) = &name_pattern {
                    if !pattern.is_match(&e.get_name()?) {
                        return Ok(false);
                    }
                }
                Ok(true)
            }));
        }
        if let Some(filter) = and_filters(filters) {
            matcher = matcher.filter(filter);
        }

        match params.found_index {
            Some(index) => {
                let all = matcher.find_all().map_err(|e| {
                    LocatorError::ElementNotFound(format!("{params:?}, Err: {e}"))
                })?;
                let count = all.len();
                all.into_iter()
                    .nth(index.saturating_sub(1) as usize)
                    .map(|e| self.wrap(e))
                    .ok_or_else(|| {
                        LocatorError::ElementNotFound(format!(
                            "index {index} out of {count} matches for {params:?}"
                        ))
                    })
            }
            None => matcher
                .find_first()
                .map(|e| self.wrap(e))
                .map_err(|e| LocatorError::ElementNotFound(format!("{params:?}, Err: {e}"))),
        }
    }

    fn process_name(&self, pid: u32) -> Result<String, LocatorError> {
        use sysinfo::{Pid, System};
        let system = System::new_all();
        system
            .process(Pid::from_u32(pid))
            .map(|p| p.name().to_string_lossy().into_owned())
            .ok_or_else(|| {
                LocatorError::PlatformError(format!("process with pid {pid} not found"))
            })
    }

    fn move_pointer(&self, x: i32, y: i32) -> Result<(), LocatorError> {
        unsafe { windows::Win32::UI::WindowsAndMessaging::SetCursorPos(x, y) }
            .map_err(|e| LocatorError::PlatformError(format!("failed to move pointer: {e}")))
    }

    fn set_search_timeout(&self, seconds: f64) -> f64 {
        let mut slot = self
            .search_timeout_ms
            .lock()
            .expect("timeout lock poisoned");
        let previous = *slot as f64 / 1000.0;
        *slot = (seconds * 1000.0) as u64;
        previous
    }
}

pub struct WinControl {
    element: ThreadSafeUIElement,
    automation: ThreadSafeUIAutomation,
}

impl WinControl {
    fn wrap(&self, element: uiautomation::UIElement) -> Control {
        Control::new(Box::new(WinControl {
            element: ThreadSafeUIElement(Arc::new(element)),
            automation: self.automation.clone(),
        }))
    }

    fn hwnd(&self) -> Result<windows::Win32::Foundation::HWND, LocatorError> {
        let handle = self.element.0.get_native_window_handle().map_err(|e| {
            LocatorError::PlatformError(format!("no native window handle: {e}"))
        })?;
        Ok(handle.into())
    }
}

impl std::fmt::Debug for WinControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WinControl").finish()
    }
}

impl ControlNode for WinControl {
    fn attributes(&self) -> Result<ControlAttributes, LocatorError> {
        let element = &self.element.0;
        let control_type = element
            .get_control_type()
            .map(|ct| format!("{ct}Control"))
            .map_err(|e| LocatorError::ElementGone(format!("control type read failed: {e}")))?;
        Ok(ControlAttributes {
            name: element.get_name().unwrap_or_default(),
            automation_id: element.get_automation_id().unwrap_or_default(),
            class_name: element.get_classname().unwrap_or_default(),
            control_type,
        })
    }

    fn children(&self) -> Result<Vec<Control>, LocatorError> {
        let condition = self.automation.0.create_true_condition().map_err(|e| {
            LocatorError::PlatformError(format!("failed to create child condition: {e}"))
        })?;
        let children = self
            .element
            .0
            .find_all(TreeScope::Children, &condition)
            .map_err(|e| {
                LocatorError::PlatformError(format!("failed to enumerate children: {e}"))
            })?;
        Ok(children.into_iter().map(|e| self.wrap(e)).collect())
    }

    fn parent(&self) -> Result<Option<Control>, LocatorError> {
        let walker = self.automation.0.get_raw_view_walker().map_err(|e| {
            LocatorError::PlatformError(format!("failed to get tree walker: {e}"))
        })?;
        match walker.get_parent(&self.element.0) {
            Ok(parent) => Ok(Some(self.wrap(parent))),
            // No parent means this is the root.
            Err(e) => {
                debug!("tree walker get_parent failed: {e}");
                Ok(None)
            }
        }
    }

    fn next_sibling(&self) -> Result<Option<Control>, LocatorError> {
        let walker = self.automation.0.get_raw_view_walker().map_err(|e| {
            LocatorError::PlatformError(format!("failed to get tree walker: {e}"))
        })?;
        match walker.get_next_sibling(&self.element.0) {
            Ok(sibling) => Ok(Some(self.wrap(sibling))),
            Err(e) => {
                debug!("tree walker get_next_sibling failed: {e}");
                Ok(None)
            }
        }
    }

    fn bounding_rectangle(&self) -> Result<Option<Rect>, LocatorError> {
        match self.element.0.get_bounding_rectangle() {
            Ok(rect) => {
                let rect = Rect {
                    left: rect.get_left(),
                    top: rect.get_top(),
                    right: rect.get_right(),
                    bottom: rect.get_bottom(),
                };
                // UI Automation reports an empty rectangle for non-visual
                // nodes rather than failing the read.
                if rect.width() <= 0 && rect.height() <= 0 {
                    Ok(None)
                } else {
                    Ok(Some(rect))
                }
            }
            Err(e) => Err(LocatorError::ElementGone(format!(
                "bounding rectangle read failed: {e}"
            ))),
        }
    }

    fn native_window_handle(&self) -> Result<isize, LocatorError> {
        let hwnd = self.hwnd()?;
        Ok(hwnd.0 as isize)
    }

    fn process_id(&self) -> Result<u32, LocatorError> {
        self.element
            .0
            .get_process_id()
            .map(|pid| pid as u32)
            .map_err(|e| LocatorError::PlatformError(format!("process id read failed: {e}")))
    }

    fn try_restore(&self) -> Result<(), LocatorError> {
        use windows::Win32::UI::WindowsAndMessaging::{IsIconic, ShowWindow, SW_RESTORE};

        let hwnd = self.hwnd()?;
        unsafe {
            if IsIconic(hwnd).as_bool() {
                debug!("window is minimized, restoring it");
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
        }
        Ok(())
    }

    fn focus(&self) -> Result<(), LocatorError> {
        use windows::Win32::UI::WindowsAndMessaging::{BringWindowToTop, SetForegroundWindow};

        if let Ok(hwnd) = self.hwnd() {
            unsafe {
                let _ = BringWindowToTop(hwnd);
                if !SetForegroundWindow(hwnd).as_bool() {
                    debug!("SetForegroundWindow failed, falling back to set_focus");
                }
            }
        }
        self.element
            .0
            .set_focus()
            .map_err(|e| LocatorError::PlatformError(format!("failed to set focus: {e}")))
    }

    fn clone_box(&self) -> Box<dyn ControlNode> {
        Box::new(WinControl {
            element: self.element.clone(),
            automation: self.automation.clone(),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn and_filters(mut filters: Vec<Box<dyn MatcherFilter>>) -> Option<Box<dyn MatcherFilter>> {
    let first = filters.pop()?;
    Some(filters.into_iter().fold(first, |acc, filter| {
        Box::new(AndFilter {
            left: acc,
            right: filter,
        })
    }))
}

// `"Control"` means "any control type": no constraint at all.
fn map_control_type(name: &str) -> Option<ControlType> {
    let base = name.strip_suffix("Control").unwrap_or(name);
    let control_type = match base {
        "AppBar" => ControlType::AppBar,
        "Button" => ControlType::Button,
        "Calendar" => ControlType::Calendar,
        "CheckBox" => ControlType::CheckBox,
        "ComboBox" => ControlType::ComboBox,
        "Custom" => ControlType::Custom,
        "DataGrid" => ControlType::DataGrid,
        "DataItem" => ControlType::DataItem,
        "Document" => ControlType::Document,
        "Edit" => ControlType::Edit,
        "Group" => ControlType::Group,
        "Header" => ControlType::Header,
        "HeaderItem" => ControlType::HeaderItem,
        "Hyperlink" => ControlType::Hyperlink,
        "Image" => ControlType::Image,
        "List" => ControlType::List,
        "ListItem" => ControlType::ListItem,
        "Menu" => ControlType::Menu,
        "MenuBar" => ControlType::MenuBar,
        "MenuItem" => ControlType::MenuItem,
        "Pane" => ControlType::Pane,
        "ProgressBar" => ControlType::ProgressBar,
        "RadioButton" => ControlType::RadioButton,
        "ScrollBar" => ControlType::ScrollBar,
        "SemanticZoom" => ControlType::SemanticZoom,
        "Separator" => ControlType::Separator,
        "Slider" => ControlType::Slider,
        "Spinner" => ControlType::Spinner,
        "SplitButton" => ControlType::SplitButton,
        "StatusBar" => ControlType::StatusBar,
        "Tab" => ControlType::Tab,
        "TabItem" => ControlType::TabItem,
        "Table" => ControlType::Table,
        "Text" => ControlType::Text,
        "Thumb" => ControlType::Thumb,
        "TitleBar" => ControlType::TitleBar,
        "ToolBar" => ControlType::ToolBar,
        "ToolTip" => ControlType::ToolTip,
        "Tree" => ControlType::Tree,
        "TreeItem" => ControlType::TreeItem,
        "Window" => ControlType::Window,
        _ => return None,
    };
    Some(control_type)
}
