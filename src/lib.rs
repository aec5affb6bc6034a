#![doc = include_str!("../README.md")]

pub mod element;
pub mod error;
pub mod manager;
pub mod registry;
pub mod runtime;
mod scheduler;

#[doc(inline)]
pub use element::BridgeElement;
#[doc(inline)]
pub use error::{ConfigError, LifecycleError};
#[doc(inline)]
pub use manager::{Extended, ManagerOptions, WidgetsManager};
#[doc(inline)]
pub use registry::{Registry, WidgetClass, WidgetClassBuilder};
#[doc(inline)]
pub use runtime::Runtime;

pub use mooring_core as core;
#[doc(inline)]
pub use mooring_core::{
    InstanceKey, Keyed, Listener, MappingDescriptor, Node, PropValue, Props, Settings, StyleSheet,
    StyleSheetSource, Surface, TreeRenderer, VirtualQueue,
};
pub use mooring_reactive as reactive;
#[doc(inline)]
pub use mooring_reactive::{Observable, WatcherGuard};

pub use tracing as log;
