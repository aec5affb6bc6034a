//! Isolated per-instance render surfaces.
//!
//! Every mounted bridge element gets its own [`Surface`]: an independent
//! attach point giving the instance an isolated style and output boundary
//! while still being driven from the one shared render pass. Surfaces adopt
//! the manager's shared [`StyleSheet`] when they are allocated.

use core::cell::RefCell;
use core::fmt::{self, Debug};
use std::rc::Rc;

/// A shared stylesheet adopted by instance surfaces.
#[derive(Clone)]
pub struct StyleSheet(Rc<StyleSheetInner>);

struct StyleSheetInner {
    source: StyleSheetSource,
}

/// Where a stylesheet's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSheetSource {
    /// A stylesheet loaded from an external location.
    Href(String),
    /// A stylesheet constructed from inline text.
    Text(String),
}

impl StyleSheet {
    /// Creates a stylesheet referencing an external location.
    #[must_use]
    pub fn from_href(href: impl Into<String>) -> Self {
        Self(Rc::new(StyleSheetInner {
            source: StyleSheetSource::Href(href.into()),
        }))
    }

    /// Creates a constructed stylesheet from inline text.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(Rc::new(StyleSheetInner {
            source: StyleSheetSource::Text(text.into()),
        }))
    }

    /// The stylesheet's content source.
    #[must_use]
    pub fn source(&self) -> &StyleSheetSource {
        &self.0.source
    }
}

impl Debug for StyleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StyleSheet").field(&self.0.source).finish()
    }
}

impl PartialEq for StyleSheet {
    /// Identity comparison: the same shared sheet, not equal content.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// An isolated render target owned by a single bridge element instance.
#[derive(Clone)]
pub struct Surface(Rc<SurfaceInner>);

struct SurfaceInner {
    id: u64,
    sheets: RefCell<Vec<StyleSheet>>,
}

impl Surface {
    /// Creates a surface with the given runtime-assigned number.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(Rc::new(SurfaceInner {
            id,
            sheets: RefCell::new(Vec::new()),
        }))
    }

    /// The runtime-assigned surface number.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Adopts a shared stylesheet into this surface's style boundary.
    pub fn adopt(&self, sheet: StyleSheet) {
        self.0.sheets.borrow_mut().push(sheet);
    }

    /// The stylesheets adopted by this surface, in adoption order.
    #[must_use]
    pub fn adopted(&self) -> Vec<StyleSheet> {
        self.0.sheets.borrow().clone()
    }
}

impl Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface").field("id", &self.0.id).finish()
    }
}

impl PartialEq for Surface {
    /// Identity comparison: two handles to the same attach point.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
