//! The widgets manager — the orchestrator of the shared render root.
//!
//! Exactly one manager exists per runtime. Construction registers the widget
//! classes, claims the runtime, resolves the stylesheet auto-load, creates
//! the shared render root, and installs the render callback the scheduler
//! fires. After that the host drives it through the imperative API:
//! `initialize`, `update`, `settings`, `unmount`, plus whatever app-specific
//! methods are composed on via [`extend`](WidgetsManager::extend).

use core::cell::RefCell;
use core::fmt::{self, Debug};
use core::ops::{Deref, DerefMut};
use std::rc::Rc;

use mooring_core::{
    DynProvider, Keyed, Node, Settings, StyleSheet, TreeRenderer, provider,
};
use tracing::{debug, trace};

use crate::error::{ConfigError, LifecycleError};
use crate::registry::WidgetClass;
use crate::runtime::Runtime;

/// Construction options for [`WidgetsManager::new`].
#[derive(Default)]
pub struct ManagerOptions {
    elements: Vec<WidgetClass>,
    provider: Option<DynProvider>,
    provider_props: Option<Settings>,
    skip_css_autoload: bool,
    synchronous_rendering: bool,
    module_url: Option<String>,
    stylesheet: Option<StyleSheet>,
    css_loader: Option<Rc<dyn Fn(&str)>>,
}

impl ManagerOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one widget class to register.
    #[must_use]
    pub fn element(mut self, class: WidgetClass) -> Self {
        self.elements.push(class);
        self
    }

    /// Adds several widget classes to register.
    #[must_use]
    pub fn elements(mut self, classes: impl IntoIterator<Item = WidgetClass>) -> Self {
        self.elements.extend(classes);
        self
    }

    /// Sets the shared-context provider component wrapping every widget.
    #[must_use]
    pub fn context_provider<F, V>(mut self, component: F) -> Self
    where
        F: Fn(&Settings) -> V + 'static,
        V: 'static,
    {
        self.provider = Some(provider(component));
        self
    }

    /// Sets default settings merged under whatever `initialize` receives.
    #[must_use]
    pub fn context_provider_props(mut self, settings: Settings) -> Self {
        self.provider_props = Some(settings);
        self
    }

    /// Skips the automatic stylesheet load.
    #[must_use]
    pub const fn skip_css_autoload(mut self) -> Self {
        self.skip_css_autoload = true;
        self
    }

    /// Renders with a synchronous flush instead of batched rendering.
    #[must_use]
    pub const fn synchronous_rendering(mut self) -> Self {
        self.synchronous_rendering = true;
        self
    }

    /// The resource location this bundle was loaded from, used to derive the
    /// companion stylesheet location.
    #[must_use]
    pub fn module_url(mut self, url: impl Into<String>) -> Self {
        self.module_url = Some(url.into());
        self
    }

    /// Provides the shared stylesheet instance surfaces adopt, instead of
    /// deriving one from the module url.
    #[must_use]
    pub fn stylesheet(mut self, sheet: StyleSheet) -> Self {
        self.stylesheet = Some(sheet);
        self
    }

    /// Hook invoked with the derived stylesheet location when the automatic
    /// load triggers.
    #[must_use]
    pub fn on_css_load(mut self, loader: impl Fn(&str) + 'static) -> Self {
        self.css_loader = Some(Rc::new(loader));
        self
    }
}

impl Debug for ManagerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerOptions")
            .field("elements", &self.elements.len())
            .field("provider", &self.provider.is_some())
            .field("skip_css_autoload", &self.skip_css_autoload)
            .field("synchronous_rendering", &self.synchronous_rendering)
            .finish()
    }
}

/// Derives the companion `.css` location from the module url.
fn css_companion_href(url: &str) -> Result<String, ConfigError> {
    match url.matches(".js").count() {
        0 => Err(ConfigError::UnresolvableModuleUrl(url.into())),
        1 => Ok(url.replace(".js", ".css")),
        _ => Err(ConfigError::AmbiguousModuleUrl(url.into())),
    }
}

struct Shared<R: TreeRenderer> {
    runtime: Runtime,
    renderer: RefCell<R>,
    root: RefCell<Option<R::Root>>,
    provider: Option<DynProvider>,
    default_settings: Option<Settings>,
    synchronous_rendering: bool,
}

impl<R: TreeRenderer> Shared<R> {
    /// One render pass over the current active-instance sequence.
    fn render_widgets(&self) -> Result<(), LifecycleError> {
        if !self.runtime.is_initialized() {
            return Err(LifecycleError::NotInitialized);
        }

        let mut children = Vec::new();
        for instance in self.runtime.active_snapshot() {
            match instance.element.rendered_portal() {
                // The stable key keeps an instance's state when adjacent
                // siblings are added or removed.
                Ok(node) => children.push(Keyed {
                    key: instance.key,
                    node,
                }),
                Err(error) => {
                    debug!(key = %instance.key, %error, "active instance skipped")
                }
            }
        }
        trace!(instances = children.len(), "rendering active widgets");
        let fragment = Node::Fragment(children);

        let content = match &self.provider {
            Some(provider) => Node::Provider {
                provider: provider.clone(),
                settings: self.runtime.settings(),
                children: Rc::new(fragment),
            },
            None => fragment,
        };

        let mut renderer = self.renderer.borrow_mut();
        let mut root = self.root.borrow_mut();
        let Some(root) = root.as_mut() else {
            return Err(LifecycleError::NotInitialized);
        };
        if self.synchronous_rendering {
            renderer.render_sync(root, content);
        } else {
            renderer.render(root, content);
        }
        Ok(())
    }
}

/// The orchestrator owning the shared render root and settings channel.
pub struct WidgetsManager<R: TreeRenderer> {
    runtime: Runtime,
    shared: Rc<Shared<R>>,
}

impl<R: TreeRenderer> Clone for WidgetsManager<R> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<R: TreeRenderer + 'static> WidgetsManager<R> {
    /// Constructs the manager for `runtime`, rendering through `renderer`.
    ///
    /// Registers every widget class (tags already defined are skipped),
    /// resolves the stylesheet auto-load, creates the shared render root,
    /// and installs the render callback.
    ///
    /// # Errors
    ///
    /// Fails when a manager already exists for this runtime, or when the
    /// stylesheet auto-load is requested but the module url is missing,
    /// carries no `.js` segment, or is ambiguous.
    pub fn new(
        runtime: Runtime,
        mut renderer: R,
        options: ManagerOptions,
    ) -> Result<Self, ConfigError> {
        runtime.claim_manager()?;

        if let Some(sheet) = options.stylesheet {
            runtime.set_stylesheet(sheet);
        }
        if !options.skip_css_autoload {
            let url = options
                .module_url
                .as_deref()
                .ok_or(ConfigError::MissingModuleUrl)?;
            let href = css_companion_href(url)?;
            debug!(href, "loading companion stylesheet");
            if runtime.stylesheet().is_none() {
                runtime.set_stylesheet(StyleSheet::from_href(href.clone()));
            }
            if let Some(loader) = &options.css_loader {
                loader(&href);
            }
        }

        for class in options.elements {
            runtime.registry().define(class);
        }

        let root = renderer.create_root();
        let shared = Rc::new(Shared {
            runtime: runtime.clone(),
            renderer: RefCell::new(renderer),
            root: RefCell::new(Some(root)),
            provider: options.provider,
            default_settings: options.provider_props,
            synchronous_rendering: options.synchronous_rendering,
        });
        runtime.set_render(Rc::new({
            let shared = shared.clone();
            move || shared.render_widgets()
        }));

        Ok(Self { runtime, shared })
    }

    /// Merges the default settings with `settings` into the shared channel,
    /// marks the manager initialized, and renders immediately — directly,
    /// not deferred, since initialization already implies "render now".
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; kept fallible because the render
    /// path reports lifecycle misuse.
    pub fn initialize(&self, settings: Option<Settings>) -> Result<(), LifecycleError> {
        let merged = self
            .shared
            .default_settings
            .clone()
            .unwrap_or_default()
            .merged(settings.unwrap_or_default());
        self.runtime.settings().set(merged);
        self.runtime.set_initialized(true);
        debug!("widgets manager initialized");
        self.shared.render_widgets()
    }

    /// Shallow-merges `patch` into the shared settings.
    ///
    /// Only the settings channel's own subscribers re-render; no scheduler
    /// cycle is triggered. Safe to call after `unmount` — the write lands in
    /// the reset channel and produces no visual output.
    pub fn update(&self, patch: Settings) {
        let channel = self.runtime.settings();
        let merged = channel.get().unwrap_or_default().merged(patch);
        trace!("updating shared settings");
        channel.set(merged);
    }

    /// The current shared settings, or `None` before initialization.
    #[must_use]
    pub fn settings(&self) -> Option<Settings> {
        self.runtime.settings().get()
    }

    /// Tears down the shared render root.
    ///
    /// Detaches all rendered output, recreates a fresh root, renews every
    /// active instance's portal (prop data untouched), resets the settings
    /// channel, and clears the initialized flag. A still-pending deferred
    /// render is cancelled. The manager itself stays constructed; a later
    /// `initialize` restores normal operation.
    pub fn unmount(&self) {
        debug!("unmounting shared render root");
        {
            let mut renderer = self.shared.renderer.borrow_mut();
            let mut root = self.shared.root.borrow_mut();
            if let Some(root) = root.take() {
                renderer.unmount_root(root);
            }
            *root = Some(renderer.create_root());
        }
        for instance in self.runtime.active_snapshot() {
            instance.element.renew_portal();
        }
        self.runtime.reset_settings();
        self.runtime.set_initialized(false);
        self.runtime.cancel_pending_render();
    }

    /// The runtime context this manager owns.
    #[must_use]
    pub const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Composes app-specific extension methods onto the host handle.
    #[must_use]
    pub fn extend<E>(self, ext: E) -> Extended<Self, E> {
        Extended::new(self, ext)
    }
}

impl<R: TreeRenderer> Debug for WidgetsManager<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetsManager")
            .field("runtime", &self.runtime)
            .field("synchronous_rendering", &self.shared.synchronous_rendering)
            .finish()
    }
}

/// A host handle composing app-specific extensions over a base API.
///
/// Derefs to the base, so the manager's own operations stay available next
/// to whatever the extension adds.
#[derive(Debug, Clone)]
pub struct Extended<M, E> {
    base: M,
    ext: E,
}

impl<M, E> Extended<M, E> {
    /// Wraps `base` together with `ext`.
    #[must_use]
    pub const fn new(base: M, ext: E) -> Self {
        Self { base, ext }
    }

    /// The extension value.
    #[must_use]
    pub const fn ext(&self) -> &E {
        &self.ext
    }

    /// Mutable access to the extension value.
    pub const fn ext_mut(&mut self) -> &mut E {
        &mut self.ext
    }

    /// Consumes the handle, returning the base and the extension.
    pub fn into_parts(self) -> (M, E) {
        (self.base, self.ext)
    }
}

impl<M, E> Deref for Extended<M, E> {
    type Target = M;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<M, E> DerefMut for Extended<M, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_href_replaces_the_single_js_segment() {
        assert_eq!(
            css_companion_href("https://cdn.example.com/widgets.js").expect("unambiguous"),
            "https://cdn.example.com/widgets.css"
        );
    }

    #[test]
    fn css_href_rejects_urls_without_a_js_segment() {
        assert!(matches!(
            css_companion_href("https://cdn.example.com/widgets.mjs2"),
            Err(ConfigError::UnresolvableModuleUrl(_))
        ));
    }

    #[test]
    fn css_href_rejects_ambiguous_urls() {
        assert!(matches!(
            css_companion_href("https://cdn.example.com/.js/widgets.js"),
            Err(ConfigError::AmbiguousModuleUrl(_))
        ));
    }
}
