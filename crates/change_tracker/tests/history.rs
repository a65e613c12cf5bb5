use anyhow::{Result, anyhow};
use change_tracker::{
    ChangeTracker, EditKind, HistoryStatus, SourceInfo, SourceLocator, TrackerConfig,
};
use html::{Document, NodeKey, parse_html};
use tokio::sync::broadcast::error::TryRecvError;

const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>fixture</title></head>
<body>
  <main id="app">
    <div id="hero" class="visbug-ignore card featured">Welcome</div>
    <div class="box" style="width: 10px;">box</div>
    <p class="copy">Hello</p>
    <span data-x="a">toggle</span>
  </main>
  <vis-bug-toolbar><button class="tool">pick</button></vis-bug-toolbar>
</body></html>"#;

fn setup() -> Result<(Document, ChangeTracker)> {
    let _ = env_logger::builder().is_test(true).try_init();
    Ok((parse_html(PAGE)?, ChangeTracker::new(TrackerConfig::default())))
}

fn select(doc: &Document, selector: &str) -> Result<NodeKey> {
    doc.query_selector(selector)?
        .ok_or_else(|| anyhow!("nothing matches {selector}"))
}

fn first_text(doc: &Document, element: NodeKey) -> Result<NodeKey> {
    doc.children(element)
        .iter()
        .copied()
        .find(|child| !doc.is_element(*child))
        .ok_or_else(|| anyhow!("{element} has no text child"))
}

#[test]
fn style_added_then_undone_removes_attribute() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let hero = select(&doc, "#hero")?;
    tracker.observe(&mut doc, [hero]);

    doc.set_attribute(hero, "style", "color: red;")?;
    assert_eq!(tracker.process_mutations(&mut doc), 1);

    let history = tracker.history(&doc);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, EditKind::Style);
    assert_eq!(history[0].old_value, None);
    assert_eq!(history[0].new_value.as_deref(), Some("color: red;"));

    assert_eq!(tracker.undo(&mut doc), Some(hero));
    assert!(!doc.has_attribute(hero, "style"));
    assert!(!tracker.can_undo());
    assert!(tracker.can_redo());
    Ok(())
}

#[test]
fn undos_restore_earlier_states_in_order() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let main = select(&doc, "#app")?;
    let para = select(&doc, "p")?;
    let text = first_text(&doc, para)?;
    tracker.observe(&mut doc, [main]);

    let mut snapshots = vec![doc.to_string()];
    for step in 0..5 {
        match step {
            0 => doc.set_attribute(para, "style", "color: blue")?,
            1 => doc.set_attribute(para, "title", "first")?,
            2 => doc.set_character_data(text, "Goodbye")?,
            3 => doc.set_attribute(para, "style", "color: green; margin: 0")?,
            _ => doc.set_attribute(para, "class", "copy lead")?,
        }
        assert_eq!(tracker.process_mutations(&mut doc), 1);
        snapshots.push(doc.to_string());
    }
    assert_eq!(tracker.ledger().len(), 5);

    for undone in 1..=5 {
        assert!(tracker.undo(&mut doc).is_some());
        assert_eq!(doc.to_string(), snapshots[5 - undone]);
        assert_eq!(tracker.can_undo(), tracker.ledger().history_index().is_some());
    }
    assert_eq!(tracker.undo(&mut doc), None);
    Ok(())
}

#[test]
fn undo_then_redo_round_trips_each_kind() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    let text = first_text(&doc, para)?;
    tracker.observe(&mut doc, [para]);

    for kind in [EditKind::Style, EditKind::Attribute, EditKind::Text] {
        match kind {
            EditKind::Style => doc.set_attribute(para, "style", "font-size: 20px")?,
            EditKind::Attribute => doc.set_attribute(para, "class", "copy lead")?,
            EditKind::Text => doc.set_character_data(text, "Bye")?,
        }
        tracker.process_mutations(&mut doc);
        let after = doc.outer_html(para);
        assert_eq!(tracker.history(&doc).last().map(|entry| entry.kind), Some(kind));

        assert_eq!(tracker.undo(&mut doc), Some(para));
        assert_ne!(doc.outer_html(para), after);
        assert_eq!(tracker.redo(&mut doc), Some(para));
        assert_eq!(doc.outer_html(para), after);
    }
    Ok(())
}

#[test]
fn new_edit_after_undo_discards_redo_branch() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    for value in ["1", "2", "3", "4"] {
        doc.set_attribute(para, "title", value)?;
        tracker.process_mutations(&mut doc);
    }
    tracker.undo(&mut doc);
    tracker.undo(&mut doc);
    assert!(tracker.can_redo());

    doc.set_attribute(para, "title", "fresh")?;
    tracker.process_mutations(&mut doc);
    assert!(!tracker.can_redo());
    assert_eq!(tracker.ledger().len(), 3);
    assert_eq!(tracker.redo(&mut doc), None);
    let values: Vec<Option<String>> = tracker
        .history(&doc)
        .into_iter()
        .map(|entry| entry.new_value)
        .collect();
    assert_eq!(
        values,
        vec![Some("1".into()), Some("2".into()), Some("fresh".into())]
    );
    Ok(())
}

#[test]
fn ledger_is_capped_and_oldest_record_unreachable() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    for index in 0..=50 {
        doc.set_attribute(para, "title", &format!("v{index}"))?;
        tracker.process_mutations(&mut doc);
    }
    assert_eq!(tracker.ledger().len(), 50);
    assert_eq!(tracker.status().count, 50);

    let mut undone = 0;
    while tracker.undo(&mut doc).is_some() {
        undone += 1;
    }
    assert_eq!(undone, 50);
    assert_eq!(doc.get_attribute(para, "title"), Some("v0"));
    Ok(())
}

#[test]
fn changes_exclude_undone_records() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    let hero = select(&doc, "#hero")?;
    tracker.observe(&mut doc, [para, hero]);

    doc.set_attribute(para, "title", "kept")?;
    tracker.process_mutations(&mut doc);
    doc.set_attribute(hero, "title", "undone")?;
    tracker.process_mutations(&mut doc);
    tracker.undo(&mut doc);

    let changes = tracker.changes(&doc);
    assert_eq!(tracker.ledger().len(), 2);
    assert_eq!(changes.elements.len(), 1);
    assert_eq!(changes.elements[0].element, para);
    assert_eq!(tracker.history(&doc).len(), 1);
    Ok(())
}

#[test]
fn style_table_shows_only_changed_properties() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let boxed = select(&doc, "div.box")?;
    tracker.observe(&mut doc, [boxed]);
    for height in ["5px", "6px", "7px"] {
        doc.set_attribute(boxed, "style", &format!("width: 10px; height: {height};"))?;
        tracker.process_mutations(&mut doc);
    }

    let changes = tracker.changes(&doc);
    let properties: Vec<&str> = changes.elements[0]
        .changes
        .styles
        .iter()
        .map(|change| change.property.as_str())
        .collect();
    assert_eq!(properties, vec!["height", "height", "height"]);

    let text = tracker.changes_as_text(&doc);
    assert!(text.contains("| `height` | `unset` | `5px` |"));
    assert!(text.contains("| `height` | `6px` | `7px` |"));
    assert!(!text.contains("| `width`"));
    assert!(text.contains("```css\nwidth: 10px; height: 7px;\n```"));
    Ok(())
}

#[test]
fn attribute_toggle_undoes_back_to_original() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let span = select(&doc, "span")?;
    tracker.observe(&mut doc, [span]);

    // Both writes land before the handler runs.
    doc.set_attribute(span, "data-x", "b")?;
    doc.set_attribute(span, "data-x", "a")?;
    assert_eq!(tracker.process_mutations(&mut doc), 2);
    let pairs: Vec<(Option<String>, Option<String>)> = tracker
        .history(&doc)
        .into_iter()
        .map(|entry| (entry.old_value, entry.new_value))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (Some("a".into()), Some("b".into())),
            (Some("b".into()), Some("a".into()))
        ]
    );

    assert_eq!(tracker.undo(&mut doc), Some(span));
    assert_eq!(doc.get_attribute(span, "data-x"), Some("b"));
    assert_eq!(tracker.undo(&mut doc), Some(span));
    assert_eq!(doc.get_attribute(span, "data-x"), Some("a"));
    assert_eq!(tracker.undo(&mut doc), None);
    Ok(())
}

#[test]
fn label_skips_internal_classes_and_caps_at_two() -> Result<()> {
    let (doc, tracker) = setup()?;
    let hero = select(&doc, "#hero")?;
    assert_eq!(tracker.resolver().label(&doc, hero), "div#hero.card.featured");
    Ok(())
}

#[test]
fn writebacks_are_not_recorded_even_through_ancestors() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let main = select(&doc, "#app")?;
    let para = select(&doc, "p")?;
    let text = first_text(&doc, para)?;
    tracker.observe(&mut doc, [main, para]);

    doc.set_character_data(text, "Hi there")?;
    assert_eq!(tracker.process_mutations(&mut doc), 1);
    doc.set_attribute(para, "style", "color: red")?;
    assert_eq!(tracker.process_mutations(&mut doc), 1);

    tracker.undo(&mut doc);
    tracker.undo(&mut doc);
    assert_eq!(tracker.process_mutations(&mut doc), 0);
    tracker.redo(&mut doc);
    assert_eq!(tracker.process_mutations(&mut doc), 0);
    assert_eq!(tracker.ledger().len(), 2);
    assert_eq!(doc.text_content(para).as_deref(), Some("Hi there"));

    // Observation is back in place afterwards.
    doc.set_attribute(para, "title", "organic")?;
    assert_eq!(tracker.process_mutations(&mut doc), 1);
    Ok(())
}

#[test]
fn notifications_follow_every_ledger_change() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    let mut receiver = tracker.subscribe();
    tracker.observe(&mut doc, [para]);

    doc.set_attribute(para, "title", "x")?;
    tracker.process_mutations(&mut doc);
    tracker.undo(&mut doc);
    tracker.redo(&mut doc);

    let expected = [
        HistoryStatus {
            can_undo: true,
            can_redo: false,
            count: 1,
        },
        HistoryStatus {
            can_undo: false,
            can_redo: true,
            count: 0,
        },
        HistoryStatus {
            can_undo: true,
            can_redo: false,
            count: 1,
        },
    ];
    for status in expected {
        assert_eq!(receiver.try_recv(), Ok(status));
    }
    assert_eq!(receiver.try_recv(), Err(TryRecvError::Empty));
    Ok(())
}

#[test]
fn off_bounds_elements_are_never_observed() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let button = select(&doc, "vis-bug-toolbar button")?;
    tracker.observe(&mut doc, [button]);
    assert!(!tracker.is_observing(button));
    assert!(tracker.baseline(button).is_none());

    let para = select(&doc, "p")?;
    let mut custom =
        ChangeTracker::default().with_off_bounds(move |_: &Document, element| element == para);
    custom.observe(&mut doc, [para, button]);
    assert_eq!(custom.observed(), &[button]);
    Ok(())
}

#[test]
fn undo_on_now_off_bounds_element_returns_none() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    doc.set_attribute(para, "title", "x")?;
    tracker.process_mutations(&mut doc);

    let toolbar = select(&doc, "vis-bug-toolbar")?;
    doc.append_child(toolbar, para)?;
    assert_eq!(tracker.undo(&mut doc), None);
    assert!(!doc.has_attribute(para, "title"));
    Ok(())
}

#[test]
fn unobserve_keeps_history_and_stops_capture() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    doc.set_attribute(para, "title", "before")?;
    tracker.unobserve(&mut doc, [para]);
    tracker.unobserve(&mut doc, [para]);

    doc.set_attribute(para, "title", "after")?;
    assert_eq!(tracker.process_mutations(&mut doc), 0);
    assert_eq!(tracker.history(&doc).len(), 1);
    assert!(!tracker.is_observing(para));

    tracker.observe(&mut doc, [para]);
    doc.set_attribute(para, "title", "again")?;
    assert_eq!(tracker.process_mutations(&mut doc), 1);
    Ok(())
}

#[test]
fn empty_previous_text_is_not_restored() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    let text = first_text(&doc, para)?;
    tracker.observe(&mut doc, [para]);

    doc.set_character_data(text, "")?;
    tracker.process_mutations(&mut doc);
    doc.set_character_data(text, "typed")?;
    tracker.process_mutations(&mut doc);

    assert_eq!(tracker.undo(&mut doc), Some(para));
    assert_eq!(doc.text_content(para).as_deref(), Some("typed"));
    assert_eq!(tracker.undo(&mut doc), Some(para));
    assert_eq!(doc.text_content(para).as_deref(), Some("Hello"));
    assert_eq!(tracker.redo(&mut doc), Some(para));
    assert_eq!(doc.text_content(para).as_deref(), Some("Hello"));
    Ok(())
}

#[test]
fn detached_target_still_moves_the_cursor() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    doc.set_attribute(para, "title", "x")?;
    tracker.process_mutations(&mut doc);

    doc.remove(para)?;
    assert_eq!(tracker.undo(&mut doc), None);
    assert!(tracker.can_redo());
    assert_eq!(tracker.redo(&mut doc), None);
    assert!(tracker.can_undo());
    Ok(())
}

#[test]
fn reserved_attributes_are_not_recorded() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    doc.set_attribute(para, "data-visbug-selected", "")?;
    doc.set_attribute(para, "style", "")?;
    doc.remove_attribute(para, "style")?;
    assert_eq!(tracker.process_mutations(&mut doc), 2);
    let kinds: Vec<EditKind> = tracker.history(&doc).iter().map(|entry| entry.kind).collect();
    assert_eq!(kinds, vec![EditKind::Style, EditKind::Style]);
    Ok(())
}

#[test]
fn reports_use_identity_cached_at_observe_time() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    doc.set_attribute(para, "class", "renamed")?;
    tracker.process_mutations(&mut doc);

    let changes = tracker.changes(&doc);
    assert_eq!(changes.elements[0].identifier.label, "p.copy");
    assert_eq!(changes.elements[0].identifier.css_selector, "#app > p.copy");
    assert_eq!(tracker.history(&doc)[0].element_label, "p.renamed");

    let json = tracker.changes_as_json(&doc);
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(value["version"], "1.0");
    assert_eq!(value["elements"][0]["changes"]["attributes"][0]["attribute"], "class");
    assert_eq!(value["elements"][0]["finalStyle"], serde_json::Value::Null);
    Ok(())
}

#[test]
fn baselines_are_captured_once() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let boxed = select(&doc, "div.box")?;
    tracker.observe(&mut doc, [boxed]);
    tracker.unobserve(&mut doc, [boxed]);
    doc.set_attribute(boxed, "style", "width: 99px")?;
    tracker.observe(&mut doc, [boxed]);

    let baseline = tracker
        .baseline(boxed)
        .ok_or_else(|| anyhow!("missing baseline"))?;
    assert_eq!(baseline.style("width"), Some("10px"));
    assert_eq!(baseline.text_content, "box");
    Ok(())
}

#[test]
fn clear_empties_history_and_notifies() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    doc.set_attribute(para, "title", "x")?;
    tracker.process_mutations(&mut doc);
    let mut receiver = tracker.subscribe();

    tracker.clear(&mut doc);
    assert_eq!(receiver.try_recv(), Ok(HistoryStatus::default()));
    assert!(tracker.ledger().is_empty());
    assert_eq!(
        tracker.changes_as_text(&doc),
        "# No Changes Tracked\n\nSelect elements and make changes to track them."
    );
    assert!(tracker.identity(para).is_some());
    Ok(())
}

#[test]
fn viewport_is_stamped_on_records() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    doc.set_viewport(html::Viewport::new(375, 812, 3.0));
    doc.set_attribute(para, "title", "x")?;
    tracker.process_mutations(&mut doc);

    let entry = &tracker.history(&doc)[0];
    assert_eq!(entry.viewport.breakpoint.as_str(), "mobile");
    assert!((entry.viewport.device_pixel_ratio - 3.0).abs() < f64::EPSILON);
    assert!(tracker.changes_as_text(&doc).contains("**Viewport:** 375x812 (mobile)"));
    Ok(())
}

#[test]
fn unobserving_a_detached_element_forgets_it() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    let hero = select(&doc, "#hero")?;
    tracker.observe(&mut doc, [para, hero]);
    doc.set_attribute(hero, "title", "edited")?;
    tracker.process_mutations(&mut doc);

    doc.remove(para)?;
    doc.remove(hero)?;
    tracker.unobserve(&mut doc, [para, hero]);
    assert!(tracker.baseline(para).is_none());
    assert!(tracker.identity(para).is_none());
    // Still referenced by the ledger.
    assert!(tracker.baseline(hero).is_some());
    assert!(tracker.identity(hero).is_some());

    tracker.clear(&mut doc);
    assert!(tracker.baseline(hero).is_none());
    assert!(tracker.identity(hero).is_none());
    Ok(())
}

#[test]
fn pruning_keeps_identities_of_redoable_records() -> Result<()> {
    let (mut doc, mut tracker) = setup()?;
    let para = select(&doc, "p")?;
    tracker.observe(&mut doc, [para]);
    doc.set_attribute(para, "title", "x")?;
    tracker.process_mutations(&mut doc);
    tracker.unobserve(&mut doc, [para]);

    doc.remove(para)?;
    assert_eq!(tracker.undo(&mut doc), None);
    tracker.prune_detached(&doc);
    assert_eq!(
        tracker.identity(para).map(|id| id.css_selector.as_str()),
        Some("#app > p.copy")
    );

    assert_eq!(tracker.redo(&mut doc), None);
    let changes = tracker.changes(&doc);
    assert_eq!(changes.elements[0].identifier.css_selector, "#app > p.copy");
    Ok(())
}

const ATTRIBUTED: &str = r#"<html><body>
  <section data-source='{"filePath":"src/Hero.tsx","lineNumber":12,"columnNumber":4,"componentName":"Hero"}'>
    <h1 class="title">Hi</h1>
  </section>
</body></html>"#;

#[test]
fn location_lists_data_source_attribution() -> Result<()> {
    let (_, mut tracker) = setup()?;
    let mut doc = parse_html(ATTRIBUTED)?;
    let heading = select(&doc, "h1")?;
    tracker.observe(&mut doc, [heading]);
    doc.set_attribute(heading, "title", "t")?;
    tracker.process_mutations(&mut doc);

    let text = tracker.changes_as_text(&doc);
    assert!(text.contains(
        "### Location\n\n**React Component:** `Hero`\n**File:** `src/Hero.tsx:12`\n**CSS Selector:**"
    ));
    let json: serde_json::Value = serde_json::from_str(&tracker.changes_as_json(&doc))?;
    assert_eq!(json["elements"][0]["identifier"]["source"]["columnNumber"], 4);
    Ok(())
}

struct FixedLocator;

impl SourceLocator for FixedLocator {
    fn locate(&self, _: &Document, _: NodeKey) -> Option<SourceInfo> {
        Some(SourceInfo {
            file_path: Some("src/App.tsx".to_owned()),
            ..SourceInfo::default()
        })
    }
}

#[test]
fn source_locator_can_be_replaced_or_disabled() -> Result<()> {
    let mut doc = parse_html(ATTRIBUTED)?;
    let heading = select(&doc, "h1")?;

    let mut custom = ChangeTracker::default().with_source_locator(Some(Box::new(FixedLocator)));
    custom.observe(&mut doc, [heading]);
    doc.set_attribute(heading, "title", "a")?;
    custom.process_mutations(&mut doc);
    let text = custom.changes_as_text(&doc);
    assert!(text.contains("**React Component:** `Unknown`\n**File:** `src/App.tsx`\n"));

    let mut plain = ChangeTracker::default().with_source_locator(None);
    plain.observe(&mut doc, [heading]);
    doc.set_attribute(heading, "title", "b")?;
    plain.process_mutations(&mut doc);
    assert_eq!(plain.identity(heading).and_then(|id| id.source.as_ref()), None);
    assert!(!plain.changes_as_text(&doc).contains("**File:**"));
    Ok(())
}
