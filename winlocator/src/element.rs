//! Detached element snapshots.
//!
//! A [`WindowsElement`] is built fresh on every resolution and owned solely
//! by the caller. It may reference a control that has since disappeared;
//! callers re-resolve on failure.

use crate::errors::LocatorError;
use crate::locator::Locator;
use crate::platforms::{Control, Rect};
use serde::Serialize;

// Strategy keys compared by `is_sibling`, each against the element attribute
// it constrains. Checked as `"key:"` substrings of the originating locator.
const SIBLING_STRATEGIES: &[(&str, SiblingAttribute)] = &[
    ("automationid", SiblingAttribute::AutomationId),
    ("id", SiblingAttribute::AutomationId),
    ("class", SiblingAttribute::ClassName),
    ("control", SiblingAttribute::ControlType),
    ("type", SiblingAttribute::ControlType),
    ("name", SiblingAttribute::Name),
    ("subname", SiblingAttribute::Name),
];

#[derive(Clone, Copy)]
enum SiblingAttribute {
    Name,
    AutomationId,
    ClassName,
    ControlType,
}

/// Normalized snapshot of one matched control.
#[derive(Debug, Clone, Serialize)]
pub struct WindowsElement {
    /// Live handle for downstream actions. Not serialized; a persisted
    /// snapshot carries identity and geometry only.
    #[serde(skip)]
    pub control: Control,
    /// The locator this element was resolved from, when there was one.
    pub locator: Option<Box<Locator>>,
    pub name: String,
    pub automation_id: String,
    pub class_name: String,
    pub control_type: String,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub width: i32,
    pub height: i32,
    pub xcenter: i32,
    pub ycenter: i32,
    /// Pointer adjustment from `offset:x,y`, applied to the center point.
    pub click_offset: Option<(i32, i32)>,
}

impl WindowsElement {
    /// Project a live control into a snapshot.
    ///
    /// Reading the bounding rectangle doubles as the liveness probe: a
    /// stale-handle error from the provider surfaces as `ElementNotFound`.
    /// Controls without on-screen geometry keep `-1` in every geometry
    /// field.
    pub fn from_control(
        control: Control,
        locator: Option<Locator>,
    ) -> Result<Self, LocatorError> {
        let attributes = map_gone(control.attributes())?;
        let rect = map_gone(control.bounding_rectangle())?;

        let mut element = Self {
            control,
            locator: locator.map(Box::new),
            name: attributes.name,
            automation_id: attributes.automation_id,
            class_name: attributes.class_name,
            control_type: attributes.control_type,
            left: -1,
            top: -1,
            right: -1,
            bottom: -1,
            width: -1,
            height: -1,
            xcenter: -1,
            ycenter: -1,
            click_offset: None,
        };
        if let Some(rect) = rect {
            element.set_rectangle(rect);
        }
        Ok(element)
    }

    fn set_rectangle(&mut self, rect: Rect) {
        self.left = rect.left;
        self.top = rect.top;
        self.right = rect.right;
        self.bottom = rect.bottom;
        self.width = rect.width();
        self.height = rect.height();
        let (x, y) = rect.center();
        self.xcenter = x;
        self.ycenter = y;
    }

    /// The point downstream actions should target: the center, shifted by
    /// any `offset:x,y` from the locator.
    pub fn clickable_point(&self) -> (i32, i32) {
        match self.click_offset {
            Some((dx, dy)) => (self.xcenter + dx, self.ycenter + dy),
            None => (self.xcenter, self.ycenter),
        }
    }

    /// Unwrap nested element backreferences down to a terminal locator
    /// string, when one exists.
    fn terminal_locator(&self) -> Option<&str> {
        let mut current = self.locator.as_deref();
        while let Some(locator) = current {
            match locator {
                Locator::Expression(s) => return Some(s.as_str()),
                Locator::Element(element) => current = element.locator.as_deref(),
            }
        }
        None
    }

    /// Whether `other` shares every locator-constrained attribute with this
    /// element.
    ///
    /// Only strategies actually present in the terminal locator string are
    /// compared; an element with no string locator is trivially a sibling.
    pub fn is_sibling(&self, other: &WindowsElement) -> bool {
        let Some(locator) = other.terminal_locator() else {
            return true;
        };
        for (key, attribute) in SIBLING_STRATEGIES {
            if !locator.contains(&format!("{key}:")) {
                continue;
            }
            let matches = match attribute {
                SiblingAttribute::Name => self.name == other.name,
                SiblingAttribute::AutomationId => self.automation_id == other.automation_id,
                SiblingAttribute::ClassName => self.class_name == other.class_name,
                SiblingAttribute::ControlType => self.control_type == other.control_type,
            };
            if !matches {
                return false;
            }
        }
        true
    }
}

fn map_gone<T>(result: Result<T, LocatorError>) -> Result<T, LocatorError> {
    result.map_err(|e| match e {
        LocatorError::ElementGone(msg) => LocatorError::ElementNotFound(msg),
        other => other,
    })
}
