//! End-to-end resolution scenarios against the mock control tree.

use super::mock_provider::{attrs, MockTree};
use crate::aliases::AliasStore;
use crate::errors::LocatorError;
use crate::locator::Locator;
use crate::platforms::Rect;
use crate::resolver::Resolver;

/// Desktop with one Notepad window and one Calculator window.
fn two_window_tree() -> (MockTree, usize, usize) {
    let tree = MockTree::new();
    let notepad = tree.add(
        MockTree::ROOT,
        attrs("Untitled - Notepad", "", "Notepad", "WindowControl"),
    );
    tree.set_window(notepad, 1001, 42);
    tree.set_rect(
        notepad,
        Rect {
            left: 100,
            top: 100,
            right: 500,
            bottom: 400,
        },
    );
    let calc = tree.add(
        MockTree::ROOT,
        attrs("Calculator", "", "ApplicationFrameWindow", "WindowControl"),
    );
    tree.set_window(calc, 1002, 43);
    tree.set_rect(
        calc,
        Rect {
            left: 600,
            top: 100,
            right: 900,
            bottom: 500,
        },
    );
    tree.set_process(42, "notepad.exe");
    tree.set_process(43, "calc.exe");
    (tree, notepad, calc)
}

#[test]
fn resolves_button_by_name_and_type() {
    super::init_tracing();
    let (tree, notepad, _) = two_window_tree();
    let group = tree.add(notepad, attrs("", "", "", "GroupControl"));
    tree.add(group, attrs("OK", "okButton", "Button", "ButtonControl"));

    let resolver = Resolver::new(tree.provider());
    let element = resolver.resolve("name:'OK' and type:Button").unwrap();
    assert_eq!(element.name, "OK");
    assert_eq!(element.control_type, "ButtonControl");
    assert_eq!(element.automation_id, "okButton");
}

#[test]
fn chain_segments_search_sequential_roots() {
    let (tree, notepad, _) = two_window_tree();
    tree.add(notepad, attrs("Text Editor", "editor", "", "DocumentControl"));

    let resolver = Resolver::new(tree.provider());
    let element = resolver
        .resolve("name:'Untitled - Notepad' > id:editor")
        .unwrap();
    assert_eq!(element.automation_id, "editor");
    // First segment searched from the desktop, second from the window it
    // resolved, never from the original root again.
    assert_eq!(tree.find_roots(), vec![MockTree::ROOT, notepad]);
}

#[test]
fn desktop_token_overrides_anchor_and_window() {
    let (tree, _, _) = two_window_tree();
    let mut resolver = Resolver::new(tree.provider());
    resolver.set_anchor("name:Calculator").unwrap();

    let element = resolver.resolve("desktop").unwrap();
    assert_eq!(element.name, "Desktop");
    assert_eq!(element.control_type, "PaneControl");
}

#[test]
fn empty_locator_returns_anchor_without_searching() {
    let (tree, _, _) = two_window_tree();
    let mut resolver = Resolver::new(tree.provider());
    resolver.set_anchor("name:Calculator").unwrap();
    tree.clear_find_roots();

    let element = resolver.resolve_from(None, None).unwrap();
    assert_eq!(element.name, "Calculator");
    assert!(tree.find_roots().is_empty());
}

#[test]
fn empty_locator_precedence_is_anchor_then_window_then_desktop() {
    let (tree, _, _) = two_window_tree();
    let mut resolver = Resolver::new(tree.provider());
    resolver.control_window("name:'Untitled - Notepad'").unwrap();
    // The controlled window is now the default root, so the anchor locator
    // hops back to the desktop explicitly.
    resolver.set_anchor("desktop > name:Calculator").unwrap();

    assert_eq!(resolver.resolve_from(None, None).unwrap().name, "Calculator");
    resolver.clear_anchor();
    assert_eq!(
        resolver.resolve_from(None, None).unwrap().name,
        "Untitled - Notepad"
    );
    resolver.clear_controlled_window();
    assert_eq!(resolver.resolve_from(None, None).unwrap().name, "Desktop");
}

#[test]
fn unknown_handle_raises_window_control_error() {
    let (tree, _, _) = two_window_tree();
    let resolver = Resolver::new(tree.provider());
    match resolver.resolve("handle:999999") {
        Err(LocatorError::WindowControlError(_)) => {}
        other => panic!("expected WindowControlError, got {other:?}"),
    }
}

#[test]
fn handle_resolves_single_window_by_title() {
    let (tree, _, _) = two_window_tree();
    let resolver = Resolver::new(tree.provider());
    let element = resolver.resolve("handle:1002").unwrap();
    assert_eq!(element.name, "Calculator");
    assert_eq!(element.control_type, "WindowControl");
}

#[test]
fn executable_requires_exactly_one_match() {
    let (tree, _, _) = two_window_tree();
    let resolver = Resolver::new(tree.provider());

    let element = resolver.resolve("executable:notepad.exe").unwrap();
    assert_eq!(element.name, "Untitled - Notepad");

    match resolver.resolve("executable:chrome.exe") {
        Err(LocatorError::WindowControlError(msg)) => assert!(msg.contains("no window")),
        other => panic!("expected WindowControlError, got {other:?}"),
    }

    // A second notepad window makes the strategy ambiguous.
    let second = tree.add(
        MockTree::ROOT,
        attrs("notes.txt - Notepad", "", "Notepad", "WindowControl"),
    );
    tree.set_window(second, 1003, 44);
    tree.set_process(44, "notepad.exe");
    match resolver.resolve("executable:notepad.exe") {
        Err(LocatorError::WindowControlError(msg)) => assert!(msg.contains("2 windows")),
        other => panic!("expected WindowControlError, got {other:?}"),
    }
}

#[test]
fn executable_strips_the_type_token() {
    let (tree, _, _) = two_window_tree();
    let resolver = Resolver::new(tree.provider());
    // Without the strip, `type:Edit` would exclude the window control.
    let element = resolver.resolve("executable:calc.exe type:Edit").unwrap();
    assert_eq!(element.name, "Calculator");
    assert_eq!(element.control_type, "WindowControl");
}

#[test]
fn sibling_walk_stops_at_first_mismatch() {
    let (tree, _, calc) = two_window_tree();
    let table = tree.add(calc, attrs("History", "table1", "", "TableControl"));
    tree.add(table, attrs("C1", "", "", "HeaderItemControl"));
    tree.add(table, attrs("C2", "", "", "HeaderItemControl"));
    tree.add(table, attrs("C3", "", "", "HeaderItemControl"));
    tree.add(table, attrs("1 + 1", "", "", "TextControl"));

    let resolver = Resolver::new(tree.provider());
    let elements = resolver.resolve_all("id:table1 > type:HeaderItem").unwrap();
    let names: Vec<&str> = elements.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["C1", "C2", "C3"]);
}

#[test]
fn resolve_all_returns_single_match_without_siblings() {
    let (tree, notepad, _) = two_window_tree();
    tree.add(notepad, attrs("OK", "", "", "ButtonControl"));

    let resolver = Resolver::new(tree.provider());
    let elements = resolver.resolve_all("type:Button").unwrap();
    assert_eq!(elements.len(), 1);
}

#[test]
fn alias_lookup_substitutes_silently() {
    let (tree, notepad, _) = two_window_tree();
    tree.add(notepad, attrs("Save", "saveButton", "", "ButtonControl"));

    let mut aliases = AliasStore::new();
    aliases.insert("save button", "id:saveButton");
    let resolver = Resolver::new(tree.provider()).with_aliases(aliases);

    let element = resolver.resolve("save button").unwrap();
    assert_eq!(element.automation_id, "saveButton");
    // The element remembers the substituted locator, not the alias.
    match element.locator.as_deref() {
        Some(Locator::Expression(s)) => assert_eq!(s, "id:saveButton"),
        other => panic!("expected expression locator, got {other:?}"),
    }

    // A miss is not an error; the string is used verbatim.
    let element = resolver.resolve("name:Save").unwrap();
    assert_eq!(element.automation_id, "saveButton");
}

#[test]
fn found_index_picks_among_matches() {
    let (tree, notepad, _) = two_window_tree();
    tree.add(notepad, attrs("OK", "ok1", "", "ButtonControl"));
    tree.add(notepad, attrs("OK", "ok2", "", "ButtonControl"));

    let resolver = Resolver::new(tree.provider());
    let element = resolver.resolve("name:OK index:2").unwrap();
    assert_eq!(element.automation_id, "ok2");
}

#[test]
fn depth_token_limits_the_search() {
    let (tree, notepad, _) = two_window_tree();
    let pane = tree.add(notepad, attrs("", "", "", "PaneControl"));
    tree.add(pane, attrs("DeepOne", "", "", "TextControl"));

    let resolver = Resolver::new(tree.provider());
    match resolver.resolve("DeepOne depth:1") {
        Err(LocatorError::ElementNotFound(_)) => {}
        other => panic!("expected ElementNotFound, got {other:?}"),
    }
    assert_eq!(resolver.resolve("DeepOne depth:3").unwrap().name, "DeepOne");
}

#[test]
fn regex_override_matches_names() {
    let (tree, notepad, _) = two_window_tree();
    tree.add(notepad, attrs("Save As", "", "", "ButtonControl"));

    let resolver = Resolver::new(tree.provider());
    let element = resolver.resolve("regex:'^Sav' type:Button").unwrap();
    assert_eq!(element.name, "Save As");
}

#[test]
fn subname_matches_partially() {
    let (tree, _, _) = two_window_tree();
    let resolver = Resolver::new(tree.provider());
    let element = resolver.resolve("subname:alculat type:Window").unwrap();
    assert_eq!(element.name, "Calculator");
}

#[test]
fn resolved_element_passes_through_but_checks_liveness() {
    let (tree, _, calc) = two_window_tree();
    let resolver = Resolver::new(tree.provider());
    let element = resolver.resolve("name:Calculator").unwrap();

    let again = resolver.resolve(element.clone()).unwrap();
    assert_eq!(again.name, "Calculator");

    tree.kill(calc);
    match resolver.resolve(element) {
        Err(LocatorError::ElementNotFound(_)) => {}
        other => panic!("expected ElementNotFound for a dead control, got {other:?}"),
    }
}

#[test]
fn stale_anchor_fails_the_no_locator_path() {
    let (tree, _, calc) = two_window_tree();
    let mut resolver = Resolver::new(tree.provider());
    resolver.set_anchor("name:Calculator").unwrap();
    tree.kill(calc);

    match resolver.resolve_from(None, None) {
        Err(LocatorError::ElementNotFound(_)) => {}
        other => panic!("expected ElementNotFound for a stale anchor, got {other:?}"),
    }
}

#[test]
fn control_window_focuses_and_centers_the_pointer() {
    let (tree, _, _) = two_window_tree();
    let mut resolver = Resolver::new(tree.provider());

    let pid = resolver.control_window("subname:Notepad").unwrap();
    assert_eq!(pid, 42);
    assert_eq!(
        resolver.context().window.as_ref().map(|w| w.name.as_str()),
        Some("Untitled - Notepad")
    );
    // Pointer lands on the window center.
    assert_eq!(tree.pointer_moves(), vec![(300, 250)]);
}

#[test]
fn control_window_falls_back_to_pane() {
    let (tree, _, _) = two_window_tree();
    let pane = tree.add(MockTree::ROOT, attrs("Toolbox", "", "", "PaneControl"));
    tree.set_window(pane, 1004, 45);

    let mut resolver = Resolver::new(tree.provider());
    let pid = resolver.control_window("name:Toolbox").unwrap();
    assert_eq!(pid, 45);
}

#[test]
fn control_window_fails_when_nothing_matches() {
    let (tree, _, _) = two_window_tree();
    let mut resolver = Resolver::new(tree.provider());
    match resolver.control_window("name:Nothing") {
        Err(LocatorError::WindowControlError(_)) => {}
        other => panic!("expected WindowControlError, got {other:?}"),
    }
}

#[test]
fn list_windows_reflects_live_state() {
    let (tree, _, _) = two_window_tree();
    let resolver = Resolver::new(tree.provider());

    let windows = resolver.list_windows().unwrap();
    let titles: Vec<&str> = windows.iter().map(|w| w.title.as_str()).collect();
    assert_eq!(titles, vec!["Untitled - Notepad", "Calculator"]);
    assert_eq!(windows[0].name, "notepad.exe");
    assert_eq!(windows[0].handle, 1001);
    assert_eq!(windows[1].pid, 43);

    // New windows show up on the next call; nothing is cached.
    let extra = tree.add(MockTree::ROOT, attrs("Paint", "", "", "WindowControl"));
    tree.set_window(extra, 1005, 46);
    tree.set_process(46, "mspaint.exe");
    assert_eq!(resolver.list_windows().unwrap().len(), 3);
}

#[test]
fn timeout_changes_are_scoped() {
    let (tree, _, _) = two_window_tree();
    let resolver = Resolver::new(tree.provider());

    assert_eq!(resolver.set_global_timeout(3.0), 10.0);
    assert_eq!(tree.timeout(), 3.0);

    let inside = resolver.with_timeout(1.5, |_| tree.timeout());
    assert_eq!(inside, 1.5);
    assert_eq!(tree.timeout(), 3.0);
}

#[test]
fn offset_is_carried_onto_the_element() {
    let (tree, notepad, _) = two_window_tree();
    let button = tree.add(notepad, attrs("OK", "", "", "ButtonControl"));
    tree.set_rect(
        button,
        Rect {
            left: 10,
            top: 10,
            right: 50,
            bottom: 30,
        },
    );

    let resolver = Resolver::new(tree.provider());
    let element = resolver.resolve("name:OK offset:10,-5").unwrap();
    assert_eq!(element.click_offset, Some((10, -5)));
    assert_eq!(element.clickable_point(), (40, 15));
}

#[test]
fn explicit_root_scopes_the_search() {
    let (tree, notepad, calc) = two_window_tree();
    tree.add(notepad, attrs("OK", "inNotepad", "", "ButtonControl"));
    tree.add(calc, attrs("OK", "inCalc", "", "ButtonControl"));

    let resolver = Resolver::new(tree.provider());
    let calc_window = resolver.resolve("name:Calculator").unwrap();
    let element = resolver
        .resolve_from(Some(Locator::from("name:OK")), Some(&calc_window))
        .unwrap();
    assert_eq!(element.automation_id, "inCalc");
}
