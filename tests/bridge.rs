//! End-to-end bridge behavior, driven through a recording renderer and a
//! manually-run task queue standing in for the platform's macrotask boundary.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use mooring::{
    ConfigError, Listener, ManagerOptions, MappingDescriptor, Node, Observable, PropValue, Props,
    Runtime, Settings, StyleSheet, StyleSheetSource, TreeRenderer, VirtualQueue, WidgetClass,
    WidgetsManager,
};
use serde_json::json;

// ============================================================================
// Test Infrastructure
// ============================================================================

/// One recorded render pass: the fragment keys in order, plus how it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pass {
    keys: Vec<u64>,
    sync: bool,
    root: u32,
    wrapped_in_provider: bool,
}

#[derive(Default)]
struct RenderLog {
    passes: RefCell<Vec<Pass>>,
    roots_created: Cell<u32>,
    roots_unmounted: Cell<u32>,
    provider_channel: RefCell<Option<Observable<Settings>>>,
}

impl RenderLog {
    fn provider_channel(&self) -> Option<Observable<Settings>> {
        self.provider_channel.borrow().clone()
    }

    fn passes(&self) -> Vec<Pass> {
        self.passes.borrow().clone()
    }

    fn pass_count(&self) -> usize {
        self.passes.borrow().len()
    }

    fn last_keys(&self) -> Vec<u64> {
        self.passes
            .borrow()
            .last()
            .map(|pass| pass.keys.clone())
            .unwrap_or_default()
    }
}

struct RecordingRoot {
    id: u32,
}

/// A mock component-tree renderer that records every pass it is asked for.
struct RecordingRenderer {
    log: Rc<RenderLog>,
}

impl RecordingRenderer {
    fn new(log: Rc<RenderLog>) -> Self {
        Self { log }
    }

    fn record(&self, root: &RecordingRoot, tree: &Node, sync: bool) {
        let mut wrapped_in_provider = false;
        let fragment = match tree {
            Node::Provider {
                settings, children, ..
            } => {
                wrapped_in_provider = true;
                *self.log.provider_channel.borrow_mut() = Some(settings.clone());
                children.as_ref()
            }
            other => other,
        };
        let keys = match fragment {
            Node::Fragment(children) => children.iter().map(|child| child.key.get()).collect(),
            _ => Vec::new(),
        };
        self.log.passes.borrow_mut().push(Pass {
            keys,
            sync,
            root: root.id,
            wrapped_in_provider,
        });
    }
}

impl TreeRenderer for RecordingRenderer {
    type Root = RecordingRoot;

    fn create_root(&mut self) -> RecordingRoot {
        let id = self.log.roots_created.get();
        self.log.roots_created.set(id + 1);
        RecordingRoot { id }
    }

    fn render(&mut self, root: &mut RecordingRoot, tree: Node) {
        self.record(root, &tree, false);
    }

    fn render_sync(&mut self, root: &mut RecordingRoot, tree: Node) {
        self.record(root, &tree, true);
    }

    fn unmount_root(&mut self, _root: RecordingRoot) {
        self.log
            .roots_unmounted
            .set(self.log.roots_unmounted.get() + 1);
    }
}

fn popup_class() -> WidgetClass {
    WidgetClass::builder("wl-movie-pop-up", |props: &Props| {
        props
            .get("text")
            .map(|value| format!("{value:?}"))
            .unwrap_or_default()
    })
    .observe(["text"])
    .mapping(MappingDescriptor::new().attribute("text", "text"))
    .build()
    .expect("valid popup mapping")
}

fn details_class() -> WidgetClass {
    WidgetClass::builder("wl-movie-details", |_: &Props| ())
        .observe(["show-ranking"])
        .mapping(
            MappingDescriptor::new()
                .attribute_with("show-ranking", "showRanking", |raw| {
                    PropValue::Bool(raw == "true")
                })
                .event("on-add-item", "onAddItem"),
        )
        .build()
        .expect("valid details mapping")
}

struct Fixture {
    queue: VirtualQueue,
    runtime: Runtime,
    log: Rc<RenderLog>,
    manager: WidgetsManager<RecordingRenderer>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixture_with(options: ManagerOptions) -> Fixture {
    init_tracing();
    let queue = VirtualQueue::new();
    let runtime = Runtime::new(Rc::new(queue.clone()));
    let log = Rc::new(RenderLog::default());
    let manager = WidgetsManager::new(
        runtime.clone(),
        RecordingRenderer::new(log.clone()),
        options
            .element(popup_class())
            .element(details_class())
            .skip_css_autoload(),
    )
    .expect("first manager on this runtime");
    Fixture {
        queue,
        runtime,
        log,
        manager,
    }
}

fn fixture() -> Fixture {
    fixture_with(ManagerOptions::new())
}

// ============================================================================
// Scheduling and the active-instance sequence
// ============================================================================

#[test]
fn mount_churn_before_initialize_does_not_render() {
    let f = fixture();
    let a = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    a.connected();
    assert_eq!(f.runtime.active_count(), 1);
    assert!(f.queue.is_empty());
    assert_eq!(f.log.pass_count(), 0);
}

#[test]
fn initialize_renders_immediately_without_the_scheduler() {
    let f = fixture();
    let a = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    a.connected();
    f.manager.initialize(None).expect("initialize");
    // Direct render: no queue turn needed.
    assert_eq!(f.log.pass_count(), 1);
    assert_eq!(f.log.last_keys(), vec![1]);
}

#[test]
fn mounts_within_one_turn_coalesce_into_one_render_pass() {
    let f = fixture();
    f.manager.initialize(None).expect("initialize");
    assert_eq!(f.log.pass_count(), 1);

    let a = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    let b = f.runtime.create_element("wl-movie-details").expect("defined");
    a.connected();
    b.connected();
    // Synchronous reads stay accurate before the deferred pass runs.
    assert_eq!(f.runtime.active_count(), 2);
    assert!(f.runtime.is_render_armed());
    assert_eq!(f.log.pass_count(), 1);

    assert_eq!(f.queue.run(), 1);
    assert_eq!(f.log.pass_count(), 2);
    assert_eq!(f.log.last_keys(), vec![1, 2]);
    assert!(!f.runtime.is_render_armed());
}

#[test]
fn unmount_and_remount_follow_the_keyed_scenario() {
    let f = fixture();
    f.manager.initialize(None).expect("initialize");

    let a = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    let b = f.runtime.create_element("wl-movie-details").expect("defined");
    a.connected();
    b.connected();
    f.queue.run();
    assert_eq!(f.log.last_keys(), vec![1, 2]);

    a.disconnected();
    f.queue.run();
    // B keeps its key when a sibling leaves.
    assert_eq!(f.log.last_keys(), vec![2]);

    a.connected();
    f.queue.run();
    // Remounting yields a fresh key, appended in insertion order.
    assert_eq!(f.log.last_keys(), vec![2, 3]);
}

#[test]
fn keys_are_strictly_increasing_and_never_reused() {
    let f = fixture();
    let a = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    for _ in 0..3 {
        a.connected();
        a.disconnected();
    }
    a.connected();
    assert_eq!(
        f.runtime.active_keys().iter().map(|key| key.get()).collect::<Vec<_>>(),
        vec![4]
    );
}

#[test]
fn a_burst_of_mounts_and_unmounts_renders_once() {
    let f = fixture();
    f.manager.initialize(None).expect("initialize");
    let a = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    let b = f.runtime.create_element("wl-movie-details").expect("defined");
    a.connected();
    b.connected();
    f.queue.run();
    let before = f.log.pass_count();

    // A page navigation: everything out, something else in, one turn.
    a.disconnected();
    b.disconnected();
    let c = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    c.connected();
    assert_eq!(f.queue.run(), 1);
    assert_eq!(f.log.pass_count(), before + 1);
    assert_eq!(f.log.last_keys(), vec![3]);
}

// ============================================================================
// Attribute and event projection
// ============================================================================

#[test]
fn mapped_attribute_changes_merge_into_props() {
    let f = fixture();
    let popup = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.connected();
    popup.attribute_changed("text", None, Some("Click me!"));
    assert_eq!(
        popup.data().and_then(|props| props.get("text").cloned()),
        Some(PropValue::Text("Click me!".into()))
    );

    // A removed attribute projects Null.
    popup.attribute_changed("text", Some("Click me!"), None);
    assert_eq!(
        popup.data().and_then(|props| props.get("text").cloned()),
        Some(PropValue::Null)
    );
}

#[test]
fn attribute_converters_run_at_change_time() {
    let f = fixture();
    let details = f.runtime.create_element("wl-movie-details").expect("defined");
    details.connected();
    details.attribute_changed("show-ranking", None, Some("true"));
    assert_eq!(
        details
            .data()
            .and_then(|props| props.get("showRanking").cloned()),
        Some(PropValue::Bool(true))
    );
}

#[test]
fn attribute_removal_projects_null_without_consulting_the_converter() {
    let f = fixture();
    let details = f.runtime.create_element("wl-movie-details").expect("defined");
    details.connected();
    details.attribute_changed("show-ranking", None, Some("true"));
    details.attribute_changed("show-ranking", Some("true"), None);
    assert_eq!(
        details
            .data()
            .and_then(|props| props.get("showRanking").cloned()),
        Some(PropValue::Null)
    );
}

#[test]
fn identical_old_and_new_values_are_a_noop() {
    let f = fixture();
    let popup = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.connected();
    let updates = Rc::new(Cell::new(0));
    let _guard = popup.props().watch({
        let updates = updates.clone();
        move |_: &Props| updates.set(updates.get() + 1)
    });
    popup.attribute_changed("text", Some("same"), Some("same"));
    assert_eq!(updates.get(), 0);
    assert_eq!(popup.data(), None);
}

#[test]
fn unmapped_attributes_are_silently_ignored() {
    let f = fixture();
    let popup = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.connected();
    popup.attribute_changed("data-test-id", None, Some("incidental"));
    assert_eq!(popup.data(), None);
}

#[test]
fn attribute_merge_is_shallow_over_previous_props() {
    let f = fixture();
    let popup = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.set_data(Props::new().with("text", "old").with("extra", 1.0));
    popup.attribute_changed("text", Some("old"), Some("new"));
    let props = popup.data().expect("props set");
    assert_eq!(props.get("text"), Some(&PropValue::Text("new".into())));
    assert_eq!(props.get("extra"), Some(&PropValue::Number(1.0)));
}

#[test]
fn mapped_event_listeners_become_callback_props_and_stay_native() {
    let f = fixture();
    let details = f.runtime.create_element("wl-movie-details").expect("defined");
    details.connected();

    let received = Rc::new(RefCell::new(Vec::new()));
    let listener = Listener::new({
        let received = received.clone();
        move |detail| received.borrow_mut().push(detail.clone())
    });
    details.add_event_listener("on-add-item", listener.clone());

    // Stored as a callback prop for the component...
    let stored = details
        .data()
        .and_then(|props| props.get("onAddItem").cloned());
    assert_eq!(stored, Some(PropValue::Listener(listener.clone())));

    // ...and reachable through a plain custom-event dispatch.
    let reached = details.dispatch_action("add-item", json!({"text": "Click me!"}));
    assert_eq!(reached, 1);
    assert_eq!(*received.borrow(), vec![json!({"text": "Click me!"})]);

    details.remove_event_listener("on-add-item", &listener);
    assert_eq!(details.dispatch_action("add-item", json!(null)), 0);
}

#[test]
fn unmapped_event_listeners_do_not_touch_props() {
    let f = fixture();
    let popup = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.connected();
    popup.add_event_listener("click", Listener::new(|_| {}));
    assert_eq!(popup.data(), None);
    // Still dispatchable natively.
    assert_eq!(popup.dispatch_event("click", json!(null)), 1);
}

#[test]
fn imperative_data_accessor_bypasses_mapping() {
    let f = fixture();
    let popup = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.set_data(Props::new().with("anything", json!([1, 2, 3])));
    assert_eq!(
        popup.data().and_then(|props| props.get("anything").cloned()),
        Some(PropValue::Json(json!([1, 2, 3])))
    );
}

// ============================================================================
// Shared settings channel
// ============================================================================

#[test]
fn initialize_merges_defaults_under_given_settings() {
    let f = fixture_with(
        ManagerOptions::new()
            .context_provider(|settings: &Settings| settings.clone())
            .context_provider_props(Settings::new().with("theme", "system").with("locale", "en")),
    );
    f.manager
        .initialize(Some(Settings::new().with("theme", "light")))
        .expect("initialize");
    let settings = f.manager.settings().expect("initialized");
    assert_eq!(settings.get("theme"), Some(&json!("light")));
    assert_eq!(settings.get("locale"), Some(&json!("en")));
}

#[test]
fn update_is_a_shallow_merge_over_previous_settings() {
    let f = fixture();
    f.manager
        .initialize(Some(Settings::new().with("theme", "light").with("locale", "en")))
        .expect("initialize");
    f.manager.update(Settings::new().with("theme", "dark"));
    let settings = f.manager.settings().expect("initialized");
    assert_eq!(settings.get("theme"), Some(&json!("dark")));
    assert_eq!(settings.get("locale"), Some(&json!("en")));
}

#[test]
fn update_notifies_settings_subscribers_without_a_scheduler_cycle() {
    let f = fixture_with(
        ManagerOptions::new().context_provider(|settings: &Settings| settings.clone()),
    );
    f.manager.initialize(None).expect("initialize");
    let passes_before = f.log.pass_count();

    // Subscribe the way a renderer would for the provider subtree, through
    // the channel carried by the rendered provider node.
    let channel = f.log.provider_channel().expect("provider rendered");
    let notified = Rc::new(Cell::new(0));
    let _guard = channel.watch({
        let notified = notified.clone();
        move |_: &Settings| notified.set(notified.get() + 1)
    });

    f.manager.update(Settings::new().with("theme", "dark"));
    assert_eq!(notified.get(), 1);
    // No full render pass and nothing deferred.
    assert_eq!(f.log.pass_count(), passes_before);
    assert!(f.queue.is_empty());
}

#[test]
fn settings_are_none_before_initialization() {
    let f = fixture();
    assert_eq!(f.manager.settings(), None);
}

// ============================================================================
// Teardown and recovery
// ============================================================================

#[test]
fn a_render_armed_before_unmount_is_silently_skipped() {
    let f = fixture();
    f.manager.initialize(None).expect("initialize");
    let passes_before = f.log.pass_count();

    let a = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    a.connected();
    assert!(f.runtime.is_render_armed());
    f.manager.unmount();
    assert!(!f.runtime.is_initialized());

    // The stale task is gone (cancelled) or a no-op; either way no render.
    f.queue.run();
    assert_eq!(f.log.pass_count(), passes_before);
}

#[test]
fn update_after_unmount_does_not_throw_and_produces_no_output() {
    let f = fixture();
    f.manager
        .initialize(Some(Settings::new().with("theme", "light")))
        .expect("initialize");
    f.manager.unmount();

    let passes_before = f.log.pass_count();
    f.manager.update(Settings::new().with("theme", "dark"));
    assert_eq!(f.log.pass_count(), passes_before);
    assert!(!f.runtime.is_initialized());
}

#[test]
fn unmount_recreates_the_root_and_renews_portals_without_losing_props() {
    let f = fixture();
    f.manager.initialize(None).expect("initialize");
    let popup = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.connected();
    popup.attribute_changed("text", None, Some("kept"));
    f.queue.run();

    let surface_before = popup.surface().expect("attached");
    f.manager.unmount();

    assert_eq!(f.log.roots_unmounted.get(), 1);
    assert_eq!(f.log.roots_created.get(), 2);
    let surface_after = popup.surface().expect("still attached");
    assert_ne!(surface_before, surface_after);
    assert_eq!(
        popup.data().and_then(|props| props.get("text").cloned()),
        Some(PropValue::Text("kept".into()))
    );
}

#[test]
fn a_later_initialize_restores_normal_operation() {
    let f = fixture();
    f.manager.initialize(None).expect("initialize");
    let popup = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.connected();
    f.queue.run();
    f.manager.unmount();

    f.manager
        .initialize(Some(Settings::new().with("theme", "dark")))
        .expect("re-initialize");
    assert!(f.runtime.is_initialized());
    // The still-active instance renders into the fresh root.
    assert_eq!(f.log.last_keys(), vec![1]);
    let last = f.log.passes().last().cloned().expect("rendered");
    assert_eq!(last.root, 1);
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn a_second_manager_on_the_same_runtime_is_rejected() {
    let f = fixture();
    let second = WidgetsManager::new(
        f.runtime.clone(),
        RecordingRenderer::new(f.log.clone()),
        ManagerOptions::new().skip_css_autoload(),
    );
    assert!(matches!(
        second,
        Err(ConfigError::ManagerAlreadyConstructed)
    ));

    // The guard is per runtime, not per process.
    let other_runtime = Runtime::new(Rc::new(VirtualQueue::new()));
    assert!(
        WidgetsManager::new(
            other_runtime,
            RecordingRenderer::new(Rc::new(RenderLog::default())),
            ManagerOptions::new().skip_css_autoload(),
        )
        .is_ok()
    );
}

#[test]
fn the_guard_survives_unmount() {
    let f = fixture();
    f.manager.initialize(None).expect("initialize");
    f.manager.unmount();
    let second = WidgetsManager::new(
        f.runtime.clone(),
        RecordingRenderer::new(f.log.clone()),
        ManagerOptions::new().skip_css_autoload(),
    );
    assert!(matches!(
        second,
        Err(ConfigError::ManagerAlreadyConstructed)
    ));
}

#[test]
fn registering_an_already_defined_tag_is_skipped() {
    let f = fixture();
    assert!(f.runtime.registry().is_defined("wl-movie-pop-up"));
    // The fixture already registered both classes; a colliding definition
    // through a second options list would be skipped the same way.
    assert!(!f.runtime.registry().define(popup_class()));
    assert_eq!(f.runtime.registry().len(), 2);
}

#[test]
fn css_autoload_requires_an_unambiguous_module_url() {
    let runtime = Runtime::new(Rc::new(VirtualQueue::new()));
    let log = Rc::new(RenderLog::default());
    let missing = WidgetsManager::new(
        runtime,
        RecordingRenderer::new(log.clone()),
        ManagerOptions::new(),
    );
    assert!(matches!(missing, Err(ConfigError::MissingModuleUrl)));

    let runtime = Runtime::new(Rc::new(VirtualQueue::new()));
    let ambiguous = WidgetsManager::new(
        runtime,
        RecordingRenderer::new(log),
        ManagerOptions::new().module_url("https://cdn.example.com/.js/widgets.js"),
    );
    assert!(matches!(ambiguous, Err(ConfigError::AmbiguousModuleUrl(_))));
}

#[test]
fn css_autoload_derives_the_companion_href_and_shares_the_stylesheet() {
    let queue = VirtualQueue::new();
    let runtime = Runtime::new(Rc::new(queue));
    let log = Rc::new(RenderLog::default());
    let loaded = Rc::new(RefCell::new(Vec::new()));
    let _manager = WidgetsManager::new(
        runtime.clone(),
        RecordingRenderer::new(log),
        ManagerOptions::new()
            .element(popup_class())
            .module_url("https://cdn.example.com/widgets.js")
            .on_css_load({
                let loaded = loaded.clone();
                move |href: &str| loaded.borrow_mut().push(href.to_owned())
            }),
    )
    .expect("resolvable module url");
    assert_eq!(
        *loaded.borrow(),
        vec!["https://cdn.example.com/widgets.css".to_owned()]
    );

    // Every instance surface adopts the shared sheet.
    let popup = runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.connected();
    let surface = popup.surface().expect("attached");
    let adopted = surface.adopted();
    assert_eq!(adopted.len(), 1);
    assert_eq!(
        adopted[0].source(),
        &StyleSheetSource::Href("https://cdn.example.com/widgets.css".into())
    );
}

#[test]
fn an_explicit_stylesheet_wins_over_the_derived_one() {
    let runtime = Runtime::new(Rc::new(VirtualQueue::new()));
    let sheet = StyleSheet::from_text(":host { display: block }");
    let _manager = WidgetsManager::new(
        runtime.clone(),
        RecordingRenderer::new(Rc::new(RenderLog::default())),
        ManagerOptions::new()
            .element(popup_class())
            .stylesheet(sheet.clone())
            .module_url("https://cdn.example.com/widgets.js"),
    )
    .expect("constructs");
    let popup = runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.connected();
    assert_eq!(popup.surface().expect("attached").adopted(), vec![sheet]);
}

#[test]
fn synchronous_rendering_flushes_every_pass() {
    let f = fixture_with(ManagerOptions::new().synchronous_rendering());
    f.manager.initialize(None).expect("initialize");
    let popup = f.runtime.create_element("wl-movie-pop-up").expect("defined");
    popup.connected();
    f.queue.run();
    assert!(f.log.passes().iter().all(|pass| pass.sync));
}

#[test]
fn the_provider_wraps_the_fragment_when_configured() {
    let f = fixture_with(
        ManagerOptions::new().context_provider(|settings: &Settings| settings.clone()),
    );
    f.manager.initialize(None).expect("initialize");
    assert!(f.log.passes()[0].wrapped_in_provider);

    let bare = fixture();
    bare.manager.initialize(None).expect("initialize");
    assert!(!bare.log.passes()[0].wrapped_in_provider);
}

// ============================================================================
// Host-handle composition
// ============================================================================

#[test]
fn extend_composes_app_specific_methods_onto_the_handle() {
    let f = fixture();
    f.manager
        .initialize(Some(Settings::new().with("theme", "light")))
        .expect("initialize");

    struct AppApi {
        name: &'static str,
    }
    let handle = f.manager.clone().extend(AppApi {
        name: "MovieWidgets",
    });
    // Base operations stay reachable through deref.
    handle.update(Settings::new().with("theme", "dark"));
    assert_eq!(
        handle.settings().and_then(|s| s.get("theme").cloned()),
        Some(json!("dark"))
    );
    assert_eq!(handle.ext().name, "MovieWidgets");
}
