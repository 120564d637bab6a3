//! Locator resolution.
//!
//! Chain segments resolve strictly left to right: each segment's matched
//! control becomes the search root for the next, with no backtracking. The
//! engine performs no multi-candidate ranking of its own; "exactly one" is
//! enforced only for the window-level `handle:`/`executable:` strategies,
//! everything else is delegated to the provider's attribute search.

use crate::aliases::AliasStore;
use crate::element::WindowsElement;
use crate::errors::LocatorError;
use crate::locator::{Locator, LocatorToken, ParsedLocator, Strategy};
use crate::platforms::{create_provider, Control, ControlProvider, SearchParams, WindowInfo};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, instrument};

/// Search depth used when a segment has no `depth:` token.
pub const DEFAULT_SEARCH_DEPTH: u32 = 8;

// Conservative wait for the window manager to finish transition animations
// before anything interacts with the freshly controlled window.
const WINDOW_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Session-owned root-scope state.
///
/// Replaces process-wide anchor/window slots: each session carries its own
/// context, so concurrent tasks cannot interfere. Precedence when no
/// explicit root is passed: anchor, then controlled window, then desktop.
/// Neither slot is invalidated automatically when the underlying control
/// disappears; liveness is checked lazily at resolution time.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    pub anchor: Option<WindowsElement>,
    pub window: Option<WindowsElement>,
}

/// A high-level API for resolving locators against the live control tree.
///
/// Single-threaded and blocking throughout; every call queries the OS
/// accessibility tree serially.
pub struct Resolver {
    provider: Arc<dyn ControlProvider>,
    context: ResolutionContext,
    aliases: AliasStore,
    search_depth: u32,
}

impl Resolver {
    pub fn new(provider: Arc<dyn ControlProvider>) -> Self {
        Self {
            provider,
            context: ResolutionContext::default(),
            aliases: AliasStore::new(),
            search_depth: DEFAULT_SEARCH_DEPTH,
        }
    }

    /// Create a resolver backed by the current platform's provider.
    pub fn new_default() -> Result<Self, LocatorError> {
        Ok(Self::new(create_provider()?))
    }

    pub fn with_aliases(mut self, aliases: AliasStore) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_search_depth(mut self, depth: u32) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn context(&self) -> &ResolutionContext {
        &self.context
    }

    /// Resolve one locator to a single element.
    #[instrument(level = "debug", skip(self, locator))]
    pub fn resolve(&self, locator: impl Into<Locator>) -> Result<WindowsElement, LocatorError> {
        self.resolve_from(Some(locator.into()), None)
    }

    /// Resolve with an explicit root scope and optional locator.
    ///
    /// A missing or empty locator resolves to the first non-null of anchor,
    /// controlled window, or the desktop root, without running any matching
    /// chain.
    pub fn resolve_from(
        &self,
        locator: Option<Locator>,
        root: Option<&WindowsElement>,
    ) -> Result<WindowsElement, LocatorError> {
        match locator {
            // Already-resolved elements pass through, liveness-checked.
            Some(Locator::Element(element)) => {
                ensure_live(&element)?;
                Ok(element)
            }
            Some(Locator::Expression(raw)) => {
                // Alias lookup; a miss means the string IS the locator.
                let (effective, substituted) = match self.aliases.get(&raw) {
                    Some(stored) => {
                        debug!(alias = %raw, "substituted locator alias");
                        (stored.to_string(), true)
                    }
                    None => (raw, false),
                };
                if effective.trim().is_empty() {
                    return self.default_scope_element();
                }
                let mut parsed = ParsedLocator::parse(&effective)?;
                parsed.was_alias_substituted = substituted;
                self.resolve_parsed(&parsed, &effective, root)
            }
            None => self.default_scope_element(),
        }
    }

    /// Resolve one locator, then gather every adjacent sibling sharing its
    /// locator-constrained attributes. The walk stops at the first break in
    /// the sibling chain, not after a full subtree scan.
    #[instrument(level = "debug", skip(self, locator))]
    pub fn resolve_all(
        &self,
        locator: impl Into<Locator>,
    ) -> Result<Vec<WindowsElement>, LocatorError> {
        let first = self.resolve(locator)?;
        let click_offset = first.click_offset;
        let locator = first.locator.as_deref().cloned();
        let mut elements = vec![first];

        loop {
            let last = elements.last().expect("at least the first match");
            let Some(sibling) = last.control.next_sibling()? else {
                break;
            };
            let mut candidate = WindowsElement::from_control(sibling, locator.clone())?;
            candidate.click_offset = click_offset;
            if elements[0].is_sibling(&candidate) {
                elements.push(candidate);
            } else {
                break;
            }
        }

        debug!(count = elements.len(), "gathered sibling matches");
        Ok(elements)
    }

    /// Resolve a locator and pin it as the session anchor.
    pub fn set_anchor(&mut self, locator: impl Into<Locator>) -> Result<(), LocatorError> {
        let element = self.resolve(locator)?;
        self.context.anchor = Some(element);
        Ok(())
    }

    pub fn clear_anchor(&mut self) {
        self.context.anchor = None;
    }

    /// Resolve a window-level locator and make it the controlled window.
    ///
    /// The locator is forcibly constrained to `type:WindowControl`, with a
    /// `type:PaneControl` retry when no window matches. On success the
    /// window is restored, focused, the pointer is moved to its center, and
    /// a fixed settle delay runs before returning the owning process id.
    #[instrument(level = "debug", skip(self))]
    pub fn control_window(&mut self, locator: &str) -> Result<u32, LocatorError> {
        let element = match self.resolve(format!("{locator} and type:WindowControl")) {
            Ok(element) => element,
            Err(LocatorError::ElementNotFound(_)) => {
                debug!("no window control matched, retrying as pane");
                self.resolve(format!("{locator} and type:PaneControl"))
                    .map_err(|_| {
                        LocatorError::WindowControlError(format!(
                            "no window or pane matches locator {locator:?}"
                        ))
                    })?
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = element.control.try_restore() {
            debug!("window restore failed: {e}");
        }
        element.control.focus()?;
        let (x, y) = element.clickable_point();
        if x >= 0 && y >= 0 {
            self.provider.move_pointer(x, y)?;
        }
        thread::sleep(WINDOW_SETTLE_DELAY);

        let pid = element.control.process_id()?;
        self.context.window = Some(element);
        Ok(pid)
    }

    pub fn clear_controlled_window(&mut self) {
        self.context.window = None;
    }

    /// Enumerate all top-level windows with their owning executables.
    /// Re-read from the OS on every call.
    pub fn list_windows(&self) -> Result<Vec<WindowInfo>, LocatorError> {
        self.provider.list_top_level_windows()
    }

    /// Swap the provider's process-wide search timeout, returning the
    /// previous value.
    pub fn set_global_timeout(&self, seconds: f64) -> f64 {
        self.provider.set_search_timeout(seconds)
    }

    /// Run `f` with a temporary global search timeout, restoring the
    /// previous value afterwards. The timeout is a process-wide setting,
    /// not a per-call parameter; concurrent resolvers would race on it.
    pub fn with_timeout<T>(&self, seconds: f64, f: impl FnOnce(&Self) -> T) -> T {
        let previous = self.provider.set_search_timeout(seconds);
        let result = f(self);
        self.provider.set_search_timeout(previous);
        result
    }

    fn default_scope_element(&self) -> Result<WindowsElement, LocatorError> {
        if let Some(anchor) = &self.context.anchor {
            ensure_live(anchor)?;
            return Ok(anchor.clone());
        }
        if let Some(window) = &self.context.window {
            ensure_live(window)?;
            return Ok(window.clone());
        }
        WindowsElement::from_control(self.provider.root_control(), None)
    }

    fn resolve_parsed(
        &self,
        parsed: &ParsedLocator,
        effective: &str,
        root: Option<&WindowsElement>,
    ) -> Result<WindowsElement, LocatorError> {
        let mut current = match root {
            Some(element) => element.control.clone(),
            None => match (&self.context.anchor, &self.context.window) {
                (Some(anchor), _) => anchor.control.clone(),
                (None, Some(window)) => window.control.clone(),
                (None, None) => self.provider.root_control(),
            },
        };
        let mut click_offset = None;

        for level in 0..=parsed.max_level {
            current = self.resolve_segment(parsed, level, current, &mut click_offset)?;
        }

        let mut element =
            WindowsElement::from_control(current, Some(Locator::Expression(effective.to_string())))?;
        element.click_offset = click_offset;
        Ok(element)
    }

    fn resolve_segment(
        &self,
        parsed: &ParsedLocator,
        level: usize,
        root: Control,
        click_offset: &mut Option<(i32, i32)>,
    ) -> Result<Control, LocatorError> {
        let tokens: Vec<&LocatorToken> = parsed.tokens_at(level).collect();

        for token in &tokens {
            match &token.strategy {
                Strategy::Executable(name) => {
                    let window = self.single_window(
                        |w| w.name == *name,
                        &format!("executable:{name}"),
                    )?;
                    return self.find_window_control(&tokens, window, parsed, click_offset);
                }
                Strategy::Handle(handle) => {
                    let window = self.single_window(
                        |w| w.handle == *handle,
                        &format!("handle:{handle}"),
                    )?;
                    return self.find_window_control(&tokens, window, parsed, click_offset);
                }
                Strategy::Desktop => {
                    // Every other token in the segment is ignored.
                    return Ok(self.provider.root_control());
                }
                _ => {}
            }
        }

        let params = self.build_params(&tokens, parsed, click_offset)?;
        debug!(level, ?params, "searching segment");
        self.provider.find_by_attributes(&root, &params)
    }

    /// Window-level strategies require exactly one match.
    fn single_window(
        &self,
        predicate: impl Fn(&WindowInfo) -> bool,
        description: &str,
    ) -> Result<WindowInfo, LocatorError> {
        let mut matches: Vec<WindowInfo> = self
            .provider
            .list_top_level_windows()?
            .into_iter()
            .filter(|w| predicate(w))
            .collect();
        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(LocatorError::WindowControlError(format!(
                "no window matching {description}"
            ))),
            n => Err(LocatorError::WindowControlError(format!(
                "{n} windows matching {description}, expected exactly one"
            ))),
        }
    }

    /// Search for a matched window's control by its title plus the
    /// segment's remaining tokens, minus any `type:` constraint.
    fn find_window_control(
        &self,
        tokens: &[&LocatorToken],
        window: WindowInfo,
        parsed: &ParsedLocator,
        click_offset: &mut Option<(i32, i32)>,
    ) -> Result<Control, LocatorError> {
        let mut params = self.build_params(tokens, parsed, click_offset)?;
        params.control_type = "Control".to_string();
        params.name = Some(window.title);
        debug!(?params, "searching matched window");
        self.provider
            .find_by_attributes(&self.provider.root_control(), &params)
    }

    fn build_params(
        &self,
        tokens: &[&LocatorToken],
        parsed: &ParsedLocator,
        click_offset: &mut Option<(i32, i32)>,
    ) -> Result<SearchParams, LocatorError> {
        let mut params = SearchParams::new(self.search_depth);
        for token in tokens {
            match &token.strategy {
                Strategy::Name(v) => params.name = Some(v.clone()),
                Strategy::SubName(v) => params.sub_name = Some(v.clone()),
                Strategy::RegexName(v) => params.regex_name = Some(v.clone()),
                Strategy::AutomationId(v) => params.automation_id = Some(v.clone()),
                Strategy::ClassName(v) => params.class_name = Some(v.clone()),
                Strategy::ControlType(v) => params.control_type = v.clone(),
                Strategy::SearchDepth(depth) => params.search_depth = *depth,
                Strategy::FoundIndex(index) => params.found_index = Some(*index),
                Strategy::Offset(v) => *click_offset = Some(parse_offset(v)?),
                // Reserved upstream; accepted but never searched on.
                Strategy::Process(_) => {}
                Strategy::Desktop | Strategy::Handle(_) | Strategy::Executable(_) => {}
            }
        }
        if params.regex_name.is_none() {
            params.regex_name = parsed.regex.clone();
        }
        Ok(params)
    }
}

/// A control is live when its bounding rectangle can be read without the
/// provider raising a stale-handle error.
fn ensure_live(element: &WindowsElement) -> Result<(), LocatorError> {
    match element.control.bounding_rectangle() {
        Ok(_) => Ok(()),
        Err(LocatorError::ElementGone(msg)) => Err(LocatorError::ElementNotFound(msg)),
        Err(other) => Err(other),
    }
}

fn parse_offset(value: &str) -> Result<(i32, i32), LocatorError> {
    let mut parts = value.splitn(2, ',');
    let x = parts.next().unwrap_or_default().trim();
    let y = parts.next().unwrap_or_default().trim();
    let parse = |s: &str| {
        s.parse::<i32>()
            .map_err(|source| LocatorError::InvalidInteger {
                strategy: "offset",
                source,
            })
    };
    Ok((parse(x)?, parse(y)?))
}
