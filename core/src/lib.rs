#![doc = include_str!("../README.md")]

pub mod event;
pub mod mapping;
pub mod props;
pub mod renderer;
pub mod schedule;
pub mod settings;
pub mod surface;
pub mod tree;

#[doc(inline)]
pub use event::{ListenerTable, action_event_name};
#[doc(inline)]
pub use mapping::{AttributeSpec, Mapping, MappingDescriptor, MappingError};
#[doc(inline)]
pub use props::{Listener, PropValue, Props};
#[doc(inline)]
pub use renderer::TreeRenderer;
#[doc(inline)]
pub use schedule::{Task, TaskHandle, TaskQueue, VirtualQueue};
#[doc(inline)]
pub use settings::Settings;
#[doc(inline)]
pub use surface::{StyleSheet, StyleSheetSource, Surface};
#[doc(inline)]
pub use tree::{
    AnyVisual, Component, DynComponent, DynProvider, InstanceKey, Keyed, Node, component, provider,
};
