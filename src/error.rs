//! Error taxonomy of the bridge core.
//!
//! Failures split into two families. [`ConfigError`]s are construction-time
//! misconfiguration: fatal, raised synchronously, never retried.
//! [`LifecycleError`]s signal operations invoked in the wrong order, which is
//! programmer misuse rather than a recoverable runtime condition. Everything
//! else — unmapped attribute or event names, a stale scheduled render firing
//! after teardown — is an intentionally silent no-op, not an error.

use mooring_core::MappingError;

/// A construction-time configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A widgets manager was already constructed on this runtime.
    #[error("cannot create multiple widgets managers on one runtime")]
    ManagerAlreadyConstructed,
    /// Stylesheet auto-load was requested without a module url to derive the
    /// stylesheet location from.
    #[error(
        "stylesheet auto-load needs the module url; provide one or skip css loading"
    )]
    MissingModuleUrl,
    /// The module url contains no `.js` segment to derive a `.css` companion
    /// from.
    #[error("cannot derive a css location from module url `{0}`")]
    UnresolvableModuleUrl(String),
    /// The module url contains more than one `.js` occurrence, making the
    /// `.css` companion ambiguous.
    #[error("module url `{0}` is ambiguous: expected exactly one `.js` occurrence")]
    AmbiguousModuleUrl(String),
    /// A widget class carries a malformed mapping descriptor.
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// An operation was invoked in the wrong lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// A render was attempted before `initialize` was called.
    #[error("the widgets manager is not initialized yet")]
    NotInitialized,
    /// An instance's portal was read before its mount hook built it.
    #[error("the portal has not been built yet")]
    PortalNotBuilt,
}
