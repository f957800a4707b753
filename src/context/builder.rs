//! Context builder: turns a declarative description into a context tree.
//!
//! A description is an ordered mapping of names to items. Reserved names
//! declare hooks and support requirements; every other work or text item is a
//! test and every nested mapping is a child context. Name prefixes mark
//! entries as deferred (`//`) or focused (`=>`); markers are stripped from the
//! stored names.

use crate::context::model::{Context, ContextHooks, Test};
use crate::context::requirements::{Requirement, RequirementMap, SupportRequirements};
use crate::error::ConfigurationError;
use crate::runner::work::Body;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tokio::sync::oneshot;
use tracing::{debug, instrument, trace};

const SET_UP: &str = "setUp";
const TEAR_DOWN: &str = "tearDown";
const CONTEXT_SET_UP: [&str; 2] = ["contextSetUp", "prepare"];
const CONTEXT_TEAR_DOWN: [&str; 2] = ["contextTearDown", "conclude"];
const REQUIRES_ALL: [&str; 2] = ["requiresSupportFor", "requiresSupportForAll"];
const REQUIRES_ANY: &str = "requiresSupportForAny";

/// Value stored under a name in a [`Description`].
#[derive(Clone, Debug)]
pub enum Item {
    /// A test body, or a hook body under a hook name.
    Work(Body),
    /// A deferred test; the text is kept as its comment.
    Text(String),
    /// A child context.
    Nested(Description),
    /// Support requirements, meaningful under a requirement name.
    Requirements(RequirementMap),
    /// Anything else. Ignored inside a mapping.
    Value(serde_json::Value),
}

impl From<Body> for Item {
    fn from(body: Body) -> Self {
        Item::Work(body)
    }
}

impl From<Description> for Item {
    fn from(description: Description) -> Self {
        Item::Nested(description)
    }
}

impl From<&str> for Item {
    fn from(text: &str) -> Self {
        Item::Text(text.to_string())
    }
}

impl From<String> for Item {
    fn from(text: String) -> Self {
        Item::Text(text)
    }
}

impl From<serde_json::Value> for Item {
    fn from(value: serde_json::Value) -> Self {
        Item::Value(value)
    }
}

/// Ordered mapping of names to items.
#[derive(Clone, Debug, Default)]
pub struct Description {
    entries: Vec<(String, Item)>,
}

impl Description {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, name: impl Into<String>, item: impl Into<Item>) -> Self {
        self.entries.push((name.into(), item.into()));
        self
    }

    pub fn test(self, name: impl Into<String>, body: Body) -> Self {
        self.entry(name, body)
    }

    pub fn context(self, name: impl Into<String>, description: Description) -> Self {
        self.entry(name, description)
    }

    pub fn set_up(self, body: Body) -> Self {
        self.entry(SET_UP, body)
    }

    pub fn tear_down(self, body: Body) -> Self {
        self.entry(TEAR_DOWN, body)
    }

    pub fn context_set_up(self, body: Body) -> Self {
        self.entry(CONTEXT_SET_UP[0], body)
    }

    pub fn context_tear_down(self, body: Body) -> Self {
        self.entry(CONTEXT_TEAR_DOWN[0], body)
    }

    pub fn requires_support_for_all<I, K, R>(self, requirements: I) -> Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<Requirement>,
    {
        self.entry(REQUIRES_ALL[1], Item::Requirements(collect(requirements)))
    }

    pub fn requires_support_for_any<I, K, R>(self, requirements: I) -> Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<Requirement>,
    {
        self.entry(REQUIRES_ANY, Item::Requirements(collect(requirements)))
    }

    pub fn entries(&self) -> &[(String, Item)] {
        &self.entries
    }
}

fn collect<I, K, R>(requirements: I) -> RequirementMap
where
    I: IntoIterator<Item = (K, R)>,
    K: Into<String>,
    R: Into<Requirement>,
{
    requirements
        .into_iter()
        .map(|(name, requirement)| (name.into(), requirement.into()))
        .collect()
}

/// Passed to a description callback; hands the finished description back.
pub struct Finish {
    sender: oneshot::Sender<Description>,
}

impl Finish {
    pub fn finish(self, description: Description) {
        let _ = self.sender.send(description);
    }
}

/// Pending tree from an asynchronous description.
pub struct BuildHandle {
    inner: BoxFuture<'static, Result<Context, ConfigurationError>>,
}

impl Future for BuildHandle {
    type Output = Result<Context, ConfigurationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

/// Builds context trees from descriptions.
#[derive(Clone, Debug)]
pub struct ContextBuilder {
    deferred_marker: String,
    focus_marker: String,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            deferred_marker: "//".to_string(),
            focus_marker: "=>".to_string(),
        }
    }
}

/// Parsed name with its markers removed.
struct Marked {
    name: String,
    deferred: bool,
    focused: bool,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markers(deferred: impl Into<String>, focus: impl Into<String>) -> Self {
        Self {
            deferred_marker: deferred.into(),
            focus_marker: focus.into(),
        }
    }

    /// Build a context tree from a synchronous description.
    #[instrument(skip(self, description))]
    pub fn build(
        &self,
        name: &str,
        description: impl Into<Item>,
    ) -> Result<Context, ConfigurationError> {
        if name.is_empty() {
            return Err(ConfigurationError::EmptyContextName);
        }
        let description = match description.into() {
            Item::Nested(description) => description,
            _ => return Err(ConfigurationError::InvalidDescription(name.to_string())),
        };

        let context = self.build_context(name, &description, false, false)?;
        debug!(
            context = %context.name,
            tests = context.test_count(),
            focused = context.focused,
            deferred = context.deferred,
            "Context tree built"
        );
        Ok(context)
    }

    /// Build once `description` resolves.
    pub fn build_async<F>(&self, name: &str, description: F) -> Result<BuildHandle, ConfigurationError>
    where
        F: Future<Output = Description> + Send + 'static,
    {
        if name.is_empty() {
            return Err(ConfigurationError::EmptyContextName);
        }
        let builder = self.clone();
        let name = name.to_string();
        Ok(BuildHandle {
            inner: async move {
                let description = description.await;
                builder.build(&name, description)
            }
            .boxed(),
        })
    }

    /// Build once the callback calls [`Finish::finish`].
    pub fn build_with<F>(&self, name: &str, describe: F) -> Result<BuildHandle, ConfigurationError>
    where
        F: FnOnce(Finish),
    {
        if name.is_empty() {
            return Err(ConfigurationError::EmptyContextName);
        }
        let (sender, receiver) = oneshot::channel();
        describe(Finish { sender });

        let builder = self.clone();
        let name = name.to_string();
        Ok(BuildHandle {
            inner: async move {
                let description = receiver
                    .await
                    .map_err(|_| ConfigurationError::Unfinished(name.clone()))?;
                builder.build(&name, description)
            }
            .boxed(),
        })
    }

    fn build_context(
        &self,
        raw_name: &str,
        description: &Description,
        parent_deferred: bool,
        parent_forced: bool,
    ) -> Result<Context, ConfigurationError> {
        let marked = self.strip_markers(raw_name);
        if marked.name.is_empty() {
            return Err(ConfigurationError::EmptyContextName);
        }
        let deferred = parent_deferred || marked.deferred;
        let forced = parent_forced || marked.focused;

        let mut hooks = ContextHooks::default();
        let mut requirements = SupportRequirements::default();
        let mut tests = Vec::new();
        let mut contexts = Vec::new();

        for (key, item) in &description.entries {
            let key = key.as_str();
            if key == SET_UP {
                hooks.set_up = Some(self.hook(&marked.name, key, item)?);
            } else if key == TEAR_DOWN {
                hooks.tear_down = Some(self.hook(&marked.name, key, item)?);
            } else if CONTEXT_SET_UP.contains(&key) {
                hooks.context_set_up = Some(self.hook(&marked.name, key, item)?);
            } else if CONTEXT_TEAR_DOWN.contains(&key) {
                hooks.context_tear_down = Some(self.hook(&marked.name, key, item)?);
            } else if REQUIRES_ALL.contains(&key) {
                requirements
                    .all
                    .extend(self.requirements(&marked.name, key, item)?);
            } else if key == REQUIRES_ANY {
                requirements
                    .any
                    .extend(self.requirements(&marked.name, key, item)?);
            } else {
                match item {
                    Item::Work(body) => {
                        tests.push(self.test(&marked.name, key, Some(body), None, deferred, forced)?)
                    }
                    Item::Text(comment) => tests.push(self.test(
                        &marked.name,
                        key,
                        None,
                        Some(comment),
                        deferred,
                        forced,
                    )?),
                    Item::Nested(nested) => {
                        contexts.push(self.build_context(key, nested, deferred, forced)?)
                    }
                    Item::Requirements(_) | Item::Value(_) => {
                        trace!(context = %marked.name, key, "Ignoring non-test entry");
                    }
                }
            }
        }

        let mut context = Context {
            name: marked.name,
            tests,
            contexts,
            hooks,
            requirements,
            deferred,
            focus_marked: forced,
            focused: false,
        };
        context.refresh_focus();
        Ok(context)
    }

    fn test(
        &self,
        context: &str,
        raw_name: &str,
        body: Option<&Body>,
        comment: Option<&String>,
        context_deferred: bool,
        forced: bool,
    ) -> Result<Arc<Test>, ConfigurationError> {
        let marked = self.strip_markers(raw_name);
        if marked.name.is_empty() {
            return Err(ConfigurationError::EmptyTestName(context.to_string()));
        }
        let deferred = context_deferred || marked.deferred || comment.is_some();
        Ok(Arc::new(Test {
            name: marked.name,
            body: if deferred { None } else { body.cloned() },
            deferred,
            focused: forced || marked.focused,
            comment: comment.cloned(),
        }))
    }

    fn hook(&self, context: &str, key: &str, item: &Item) -> Result<Body, ConfigurationError> {
        match item {
            Item::Work(body) => Ok(body.clone()),
            _ => Err(ConfigurationError::InvalidHook {
                context: context.to_string(),
                hook: key.to_string(),
            }),
        }
    }

    fn requirements(
        &self,
        context: &str,
        key: &str,
        item: &Item,
    ) -> Result<RequirementMap, ConfigurationError> {
        match item {
            Item::Requirements(map) => Ok(map.clone()),
            _ => Err(ConfigurationError::InvalidRequirements {
                context: context.to_string(),
                key: key.to_string(),
            }),
        }
    }

    fn strip_markers(&self, raw: &str) -> Marked {
        let mut rest = raw;
        let mut deferred = false;
        let mut focused = false;
        loop {
            if !self.deferred_marker.is_empty() && rest.starts_with(&self.deferred_marker) {
                deferred = true;
                rest = rest[self.deferred_marker.len()..].trim_start();
            } else if !self.focus_marker.is_empty() && rest.starts_with(&self.focus_marker) {
                focused = true;
                rest = rest[self.focus_marker.len()..].trim_start();
            } else {
                break;
            }
        }
        Marked {
            name: rest.to_string(),
            deferred,
            focused,
        }
    }
}
