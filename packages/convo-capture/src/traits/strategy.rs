//! Custom strategies a provider descriptor can plug in.
//!
//! Each capability has a declarative built-in form on the descriptor
//! (selector chains, attribute tables, class-hint tables). When a provider
//! needs logic the declarative form cannot express, an implementation of
//! one of these traits is registered in-process under a name and wrapped
//! in [`Custom`].

use chrono::{DateTime, Utc};
use scraper::ElementRef;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::dom::Page;
use crate::types::conversation::Role;

/// Common supertrait for all custom strategies.
pub trait Strategy: Send + Sync {
    /// Name used for registration and logging.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Resolves the stable conversation id of a page.
pub trait IdResolver: Strategy {
    fn resolve(&self, page: &Page) -> Option<String>;
}

/// Resolves the conversation title of a page.
pub trait TitleResolver: Strategy {
    fn resolve(&self, page: &Page) -> Option<String>;
}

/// Finds message elements in document order.
pub trait MessageFinder: Strategy {
    fn find<'a>(&self, page: &'a Page) -> Vec<ElementRef<'a>>;
}

/// Decides whether a discovered element is a message at all.
pub trait MessageFilter: Strategy {
    fn keep(&self, element: &ElementRef<'_>) -> bool;
}

/// Last-resort role detection for one message element.
pub trait RoleDetector: Strategy {
    fn detect(&self, element: &ElementRef<'_>) -> Option<Role>;
}

/// Extracts the text content of one message element.
pub trait ContentExtractor: Strategy {
    fn extract(&self, element: &ElementRef<'_>) -> String;
}

/// Parses a raw timestamp value read from the page.
pub trait TimestampParser: Strategy {
    fn parse(&self, value: &str) -> Option<DateTime<Utc>>;
}

/// Shared handle to a custom strategy.
pub struct Custom<T: ?Sized + Strategy>(Arc<T>);

impl<T: ?Sized + Strategy> Custom<T> {
    pub fn from_arc(inner: Arc<T>) -> Self {
        Self(inner)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl<T: ?Sized + Strategy> Clone for Custom<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized + Strategy> Deref for Custom<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized + Strategy> fmt::Debug for Custom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Custom({})", self.0.name())
    }
}

macro_rules! custom_from {
    ($($trait:ident),* $(,)?) => {
        $(
            impl<S: $trait + 'static> From<S> for Custom<dyn $trait> {
                fn from(strategy: S) -> Self {
                    let inner: Arc<dyn $trait> = Arc::new(strategy);
                    Custom(inner)
                }
            }
        )*
    };
}

custom_from!(
    IdResolver,
    TitleResolver,
    MessageFinder,
    MessageFilter,
    RoleDetector,
    ContentExtractor,
    TimestampParser,
);
