//! Element resolution
//!
//! Turns a descriptor into live element handles through a [`BrowserSession`].
//! The compiled query is retried until it finds something or the configured
//! timeout passes; text and attribute-text kinds are then narrowed by a
//! post-filter the query language cannot express.
//!
//! `resolve` insists on exactly one structural match. Callers that expect
//! several use `resolve_nth` or `resolve_all`.

use selector::{
    compile, MatchMode, PostFilter, QueryExpression, SelectorDescriptor, SelectorDescriptorSet,
};
use serde_json::Value;

use crate::capability::{BrowserSession, ElementHandle, ScriptEvaluator};
use crate::config::ResolverConfig;
use crate::error::{Result, SessionError, WebAutomationError};
use crate::wait::{poll_until, WaitConfig};

/// Collects `{name: value}` for every attribute of `arguments[0]`
pub const ATTRIBUTE_MAP_SCRIPT: &str = "const attributes = {}; \
     for (const attribute of arguments[0].attributes) { attributes[attribute.name] = attribute.value; } \
     return attributes;";

#[derive(Debug, Clone, Copy)]
enum Scope<'a> {
    Document,
    Within(&'a ElementHandle),
}

#[derive(Debug, Clone, Default)]
pub struct ElementResolver {
    config: ResolverConfig,
}

impl ElementResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The single element `descriptor` names
    ///
    /// Fails with `ElementTimeout` when nothing turns up in time,
    /// `AmbiguousMatch` when a structural query finds several elements and
    /// `ElementNotFound` when text/attribute filtering rejects every candidate.
    pub async fn resolve<S>(
        &self,
        descriptor: &SelectorDescriptor,
        session: &S,
    ) -> Result<ElementHandle>
    where
        S: BrowserSession + ?Sized,
    {
        self.resolve_in(Scope::Document, descriptor, session).await
    }

    /// Like `resolve`, restricted to descendants of `parent`
    pub async fn resolve_within<S>(
        &self,
        parent: &ElementHandle,
        descriptor: &SelectorDescriptor,
        session: &S,
    ) -> Result<ElementHandle>
    where
        S: BrowserSession + ?Sized,
    {
        self.resolve_in(Scope::Within(parent), descriptor, session)
            .await
    }

    /// Resolve a descriptor of `set` by name
    pub async fn resolve_from_set<S>(
        &self,
        set: &SelectorDescriptorSet,
        name: &str,
        session: &S,
    ) -> Result<ElementHandle>
    where
        S: BrowserSession + ?Sized,
    {
        let descriptor = set.get(name)?;
        self.resolve(descriptor, session).await
    }

    /// The `index`-th match in document order, without the ambiguity check
    pub async fn resolve_nth<S>(
        &self,
        descriptor: &SelectorDescriptor,
        index: usize,
        session: &S,
    ) -> Result<ElementHandle>
    where
        S: BrowserSession + ?Sized,
    {
        let label = descriptor.display_name();
        let candidates = self
            .candidates(Scope::Document, descriptor, session, self.config.wait_config())
            .await?;
        if candidates.is_empty() {
            return Err(self.timeout_error(label));
        }

        let filter = descriptor.attribute_kind().post_filter();
        let mut matches = match filter {
            Some(filter) => {
                let found =
                    narrow(session, descriptor, filter, candidates, index.saturating_add(1))
                        .await?;
                if found.is_empty() {
                    return Err(WebAutomationError::ElementNotFound(label));
                }
                found
            }
            None => candidates,
        };

        let count = matches.len();
        if index >= count {
            tracing::debug!("{} has {} matches, index {} requested", label, count, index);
            return Err(WebAutomationError::IndexOutOfRange {
                descriptor: label,
                index,
                count,
            });
        }
        Ok(matches.swap_remove(index))
    }

    /// Every match in document order; empty if nothing appeared in time
    pub async fn resolve_all<S>(
        &self,
        descriptor: &SelectorDescriptor,
        session: &S,
    ) -> Result<Vec<ElementHandle>>
    where
        S: BrowserSession + ?Sized,
    {
        let candidates = self
            .candidates(Scope::Document, descriptor, session, self.config.wait_config())
            .await?;

        match descriptor.attribute_kind().post_filter() {
            Some(filter) if !candidates.is_empty() => {
                narrow(session, descriptor, filter, candidates, usize::MAX).await
            }
            _ => Ok(candidates),
        }
    }

    /// Look once, without waiting
    pub async fn exists<S>(&self, descriptor: &SelectorDescriptor, session: &S) -> Result<bool>
    where
        S: BrowserSession + ?Sized,
    {
        self.lookup_once(Scope::Document, descriptor, session).await
    }

    /// Look at descendants of `parent` once, without waiting
    pub async fn child_exists<S>(
        &self,
        parent: &ElementHandle,
        descriptor: &SelectorDescriptor,
        session: &S,
    ) -> Result<bool>
    where
        S: BrowserSession + ?Sized,
    {
        self.lookup_once(Scope::Within(parent), descriptor, session).await
    }

    async fn resolve_in<S>(
        &self,
        scope: Scope<'_>,
        descriptor: &SelectorDescriptor,
        session: &S,
    ) -> Result<ElementHandle>
    where
        S: BrowserSession + ?Sized,
    {
        let label = descriptor.display_name();
        let mut candidates = self
            .candidates(scope, descriptor, session, self.config.wait_config())
            .await?;

        if candidates.is_empty() {
            tracing::debug!("{} timed out after {:?}", label, self.config.timeout());
            return Err(self.timeout_error(label));
        }

        match descriptor.attribute_kind().post_filter() {
            Some(filter) => narrow(session, descriptor, filter, candidates, 1)
                .await?
                .pop()
                .ok_or(WebAutomationError::ElementNotFound(label)),
            None if candidates.len() > 1 => {
                tracing::warn!("{} is ambiguous: {} matches", label, candidates.len());
                Err(WebAutomationError::AmbiguousMatch {
                    descriptor: label,
                    count: candidates.len(),
                })
            }
            None => Ok(candidates.remove(0)),
        }
    }

    async fn lookup_once<S>(
        &self,
        scope: Scope<'_>,
        descriptor: &SelectorDescriptor,
        session: &S,
    ) -> Result<bool>
    where
        S: BrowserSession + ?Sized,
    {
        let candidates = self
            .candidates(scope, descriptor, session, WaitConfig::immediate())
            .await?;

        match descriptor.attribute_kind().post_filter() {
            Some(filter) if !candidates.is_empty() => {
                Ok(!narrow(session, descriptor, filter, candidates, 1)
                    .await?
                    .is_empty())
            }
            _ => Ok(!candidates.is_empty()),
        }
    }

    /// Poll the compiled query until it matches something
    ///
    /// Attribute-text kinds need scripting; that is checked before the first
    /// query goes out.
    async fn candidates<S>(
        &self,
        scope: Scope<'_>,
        descriptor: &SelectorDescriptor,
        session: &S,
        wait: WaitConfig,
    ) -> Result<Vec<ElementHandle>>
    where
        S: BrowserSession + ?Sized,
    {
        if let Some(PostFilter::AttributeText(_)) = descriptor.attribute_kind().post_filter() {
            if session.scripting().is_none() {
                return Err(WebAutomationError::ScriptingUnavailable(
                    descriptor.display_name(),
                ));
            }
        }

        let query = compile(descriptor);
        tracing::debug!("Resolving {} with `{}`", descriptor.display_name(), query);

        let query = &query;
        let found = poll_until(
            move || async move {
                let found = find(session, scope, query).await?;
                Ok::<_, SessionError>((!found.is_empty()).then_some(found))
            },
            wait,
        )
        .await?;

        Ok(found.unwrap_or_default())
    }

    fn timeout_error(&self, descriptor: String) -> WebAutomationError {
        WebAutomationError::ElementTimeout {
            descriptor,
            timeout: self.config.timeout(),
        }
    }
}

async fn find<S>(
    session: &S,
    scope: Scope<'_>,
    query: &QueryExpression,
) -> std::result::Result<Vec<ElementHandle>, SessionError>
where
    S: BrowserSession + ?Sized,
{
    match scope {
        Scope::Document => session.find_elements(query).await,
        Scope::Within(parent) => session.find_elements_within(parent, query).await,
    }
}

/// Keep candidates passing `filter`, in order, stopping after `limit` hits
async fn narrow<S>(
    session: &S,
    descriptor: &SelectorDescriptor,
    filter: PostFilter,
    candidates: Vec<ElementHandle>,
    limit: usize,
) -> Result<Vec<ElementHandle>>
where
    S: BrowserSession + ?Sized,
{
    let target = descriptor.attribute_value();
    let mut kept = Vec::new();

    for candidate in candidates {
        if kept.len() >= limit {
            break;
        }

        let keep = match filter {
            PostFilter::InnerText(mode) => {
                let text = session.get_text(&candidate).await?;
                mode.matches(&text, target)
            }
            PostFilter::AttributeText(mode) => {
                let scripting = session.scripting().ok_or_else(|| {
                    WebAutomationError::ScriptingUnavailable(descriptor.display_name())
                })?;
                any_attribute_matches(scripting, &candidate, mode, target).await?
            }
        };

        if keep {
            kept.push(candidate);
        }
    }

    tracing::debug!("{}: {} candidate(s) passed the filter", descriptor.display_name(), kept.len());
    Ok(kept)
}

async fn any_attribute_matches(
    scripting: &dyn ScriptEvaluator,
    candidate: &ElementHandle,
    mode: MatchMode,
    target: &str,
) -> std::result::Result<bool, SessionError> {
    let attributes = scripting
        .evaluate_script(ATTRIBUTE_MAP_SCRIPT, std::slice::from_ref(candidate))
        .await?;

    let Value::Object(attributes) = attributes else {
        return Err(SessionError::InvalidResponse(format!(
            "attribute map for {} was {}",
            candidate, attributes
        )));
    };

    Ok(attributes
        .values()
        .filter_map(Value::as_str)
        .any(|value| mode.matches_ignore_case(value, target)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::DocumentSession;
    use async_trait::async_trait;
    use selector::{AttributeKind, SelectorError};
    use serde_json::{json, Map};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tokio_test::{assert_err, assert_ok};

    const PAGE: &str = r#"
        <ul>
            <li class="row">Alpha</li>
            <li class="row">Beta</li>
            <li class="row">Gamma</li>
        </ul>
        <div id="panel"><button name="save">Save changes</button></div>
        <div id="other"><button name="save-as">Save as</button></div>
    "#;

    fn resolver() -> ElementResolver {
        ElementResolver::new(ResolverConfig::new(
            Duration::from_millis(50),
            Duration::from_millis(10),
        ))
    }

    fn row() -> SelectorDescriptor {
        SelectorDescriptor::new("li", AttributeKind::Class, "row")
    }

    struct MockElement {
        tag: &'static str,
        attributes: Vec<(&'static str, &'static str)>,
        text: &'static str,
    }

    impl MockElement {
        fn attr(&self, name: &str) -> Option<&'static str> {
            self.attributes
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
        }

        fn matches(&self, query: &QueryExpression) -> bool {
            match query {
                QueryExpression::Id(id) => self.attr("id") == Some(id.as_str()),
                QueryExpression::Tag(tag) => self.tag == tag.as_str(),
                QueryExpression::TagAttribute {
                    tag,
                    attribute,
                    value,
                } => self.tag == tag.as_str() && self.attr(attribute) == Some(value.as_str()),
            }
        }
    }

    /// In-memory session with optional scripting and a delayed page
    struct MockSession {
        elements: Vec<MockElement>,
        scripting: bool,
        empty_polls: AtomicUsize,
        queries: AtomicUsize,
    }

    impl MockSession {
        fn new(elements: Vec<MockElement>, scripting: bool) -> Self {
            Self {
                elements,
                scripting,
                empty_polls: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
            }
        }

        fn element(&self, handle: &ElementHandle) -> std::result::Result<&MockElement, SessionError> {
            handle
                .id()
                .parse::<usize>()
                .ok()
                .and_then(|i| self.elements.get(i))
                .ok_or_else(|| SessionError::StaleElement(handle.to_string()))
        }
    }

    #[async_trait]
    impl BrowserSession for MockSession {
        async fn find_elements(
            &self,
            query: &QueryExpression,
        ) -> std::result::Result<Vec<ElementHandle>, SessionError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self
                .empty_polls
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Ok(Vec::new());
            }

            Ok(self
                .elements
                .iter()
                .enumerate()
                .filter(|(_, e)| e.matches(query))
                .map(|(i, _)| ElementHandle::new(i.to_string()))
                .collect())
        }

        async fn find_elements_within(
            &self,
            _scope: &ElementHandle,
            _query: &QueryExpression,
        ) -> std::result::Result<Vec<ElementHandle>, SessionError> {
            Ok(Vec::new())
        }

        async fn get_attribute(
            &self,
            element: &ElementHandle,
            name: &str,
        ) -> std::result::Result<Option<String>, SessionError> {
            Ok(self.element(element)?.attr(name).map(str::to_string))
        }

        async fn get_text(&self, element: &ElementHandle) -> std::result::Result<String, SessionError> {
            Ok(self.element(element)?.text.to_string())
        }

        fn scripting(&self) -> Option<&dyn ScriptEvaluator> {
            if self.scripting {
                Some(self)
            } else {
                None
            }
        }
    }

    #[async_trait]
    impl ScriptEvaluator for MockSession {
        async fn evaluate_script(
            &self,
            code: &str,
            args: &[ElementHandle],
        ) -> std::result::Result<Value, SessionError> {
            assert_eq!(code, ATTRIBUTE_MAP_SCRIPT);
            let element = self.element(&args[0])?;
            let map: Map<String, Value> = element
                .attributes
                .iter()
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect();
            Ok(Value::Object(map))
        }
    }

    fn inputs() -> Vec<MockElement> {
        vec![
            MockElement {
                tag: "input",
                attributes: vec![("name", "user"), ("data-test", "Login-Field")],
                text: "",
            },
            MockElement {
                tag: "input",
                attributes: vec![("name", "pass"), ("aria-label", "Password")],
                text: "",
            },
        ]
    }

    #[tokio::test]
    async fn test_resolve_single_match() {
        let session = DocumentSession::from_markup(PAGE);
        let descriptor = SelectorDescriptor::new("button", AttributeKind::Name, "save");

        let button = assert_ok!(resolver().resolve(&descriptor, &session).await);
        assert_eq!(assert_ok!(session.get_text(&button).await), "Save changes");
    }

    #[tokio::test]
    async fn test_resolve_times_out() {
        let session = DocumentSession::from_markup(PAGE);
        let descriptor = SelectorDescriptor::new("li", AttributeKind::Class, "missing");

        let started = Instant::now();
        let err = assert_err!(resolver().resolve(&descriptor, &session).await);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(matches!(
            err,
            WebAutomationError::ElementTimeout { timeout, .. } if timeout == Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn test_resolve_is_strict_about_ambiguity() {
        let session = DocumentSession::from_markup(PAGE);
        let err = assert_err!(resolver().resolve(&row(), &session).await);
        assert!(matches!(err, WebAutomationError::AmbiguousMatch { count: 3, .. }));
    }

    #[tokio::test]
    async fn test_resolve_nth() {
        let session = DocumentSession::from_markup(PAGE);
        let resolver = resolver();

        let first = assert_ok!(resolver.resolve_nth(&row(), 0, &session).await);
        assert_eq!(assert_ok!(session.get_text(&first).await), "Alpha");

        let last = assert_ok!(resolver.resolve_nth(&row(), 2, &session).await);
        assert_eq!(assert_ok!(session.get_text(&last).await), "Gamma");

        let err = assert_err!(resolver.resolve_nth(&row(), 3, &session).await);
        assert!(matches!(
            err,
            WebAutomationError::IndexOutOfRange { index: 3, count: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_resolve_nth_with_text_filter() {
        let session = DocumentSession::from_markup(PAGE);
        let descriptor = SelectorDescriptor::new("li", AttributeKind::InnerTextContains, "a");

        // Alpha, Beta, Gamma all contain "a"
        let second = assert_ok!(resolver().resolve_nth(&descriptor, 1, &session).await);
        assert_eq!(assert_ok!(session.get_text(&second).await), "Beta");

        let none = SelectorDescriptor::new("li", AttributeKind::InnerTextExact, "Delta");
        let err = assert_err!(resolver().resolve_nth(&none, 0, &session).await);
        assert!(matches!(err, WebAutomationError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn test_inner_text_kinds() {
        let session = DocumentSession::from_markup(PAGE);
        let resolver = resolver();

        let contains = SelectorDescriptor::new("button", AttributeKind::InnerTextContains, "as");
        let found = assert_ok!(resolver.resolve(&contains, &session).await);
        assert_eq!(
            assert_ok!(session.get_attribute(&found, "name").await).as_deref(),
            Some("save-as")
        );

        // First match wins, no ambiguity check
        let exact = SelectorDescriptor::new("li", AttributeKind::InnerTextExact, "Beta");
        let found = assert_ok!(resolver.resolve(&exact, &session).await);
        assert_eq!(assert_ok!(session.get_text(&found).await), "Beta");

        let missing = SelectorDescriptor::new("li", AttributeKind::InnerTextExact, "beta");
        let err = assert_err!(resolver.resolve(&missing, &session).await);
        assert!(matches!(err, WebAutomationError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn test_attribute_text_requires_scripting() {
        let session = MockSession::new(inputs(), false);
        let descriptor = SelectorDescriptor::new("input", AttributeKind::AttributeTextContains, "login");

        let err = assert_err!(resolver().resolve(&descriptor, &session).await);
        assert!(matches!(err, WebAutomationError::ScriptingUnavailable(_)));
        assert_eq!(session.queries.load(Ordering::SeqCst), 0);

        let offline = DocumentSession::from_markup(PAGE);
        let err = assert_err!(resolver().resolve_all(&descriptor, &offline).await);
        assert!(matches!(err, WebAutomationError::ScriptingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_attribute_text_kinds() {
        let session = MockSession::new(inputs(), true);
        let resolver = resolver();

        let contains = SelectorDescriptor::new("input", AttributeKind::AttributeTextContains, "login");
        let found = assert_ok!(resolver.resolve(&contains, &session).await);
        assert_eq!(found.id(), "0");

        let exact = SelectorDescriptor::new("input", AttributeKind::AttributeTextExact, "PASSWORD");
        let found = assert_ok!(resolver.resolve(&exact, &session).await);
        assert_eq!(found.id(), "1");

        let partial = SelectorDescriptor::new("input", AttributeKind::AttributeTextExact, "pass");
        // "pass" equals the name attribute of the second input
        assert_eq!(assert_ok!(resolver.resolve(&partial, &session).await).id(), "1");

        let none = SelectorDescriptor::new("input", AttributeKind::AttributeTextExact, "Login");
        let err = assert_err!(resolver.resolve(&none, &session).await);
        assert!(matches!(err, WebAutomationError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn test_waits_for_late_elements() {
        let session = MockSession::new(inputs(), false);
        session.empty_polls.store(3, Ordering::SeqCst);

        let resolver = ElementResolver::new(ResolverConfig::new(
            Duration::from_secs(2),
            Duration::from_millis(5),
        ));
        let descriptor = SelectorDescriptor::new("input", AttributeKind::Name, "pass");

        let found = assert_ok!(resolver.resolve(&descriptor, &session).await);
        assert_eq!(found.id(), "1");
        assert_eq!(session.queries.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_resolve_all() {
        let session = DocumentSession::from_markup(PAGE);
        let resolver = resolver();

        let rows = assert_ok!(resolver.resolve_all(&row(), &session).await);
        assert_eq!(rows.len(), 3);

        let with_m = SelectorDescriptor::new("li", AttributeKind::InnerTextContains, "mm");
        let rows = assert_ok!(resolver.resolve_all(&with_m, &session).await);
        assert_eq!(rows.len(), 1);

        let nothing = SelectorDescriptor::tag_only("table");
        assert!(assert_ok!(resolver.resolve_all(&nothing, &session).await).is_empty());
    }

    #[tokio::test]
    async fn test_scoped_lookups() {
        let session = DocumentSession::from_markup(PAGE);
        let resolver = resolver();

        let panel = assert_ok!(
            resolver
                .resolve(&SelectorDescriptor::new("div", AttributeKind::Id, "panel"), &session)
                .await
        );
        let button = SelectorDescriptor::tag_only("button");

        // Two buttons on the page, one inside the panel
        assert_err!(resolver.resolve(&button, &session).await);
        let inside = assert_ok!(resolver.resolve_within(&panel, &button, &session).await);
        assert_eq!(assert_ok!(session.get_text(&inside).await), "Save changes");

        assert!(assert_ok!(resolver.child_exists(&panel, &button, &session).await));
        assert!(!assert_ok!(
            resolver
                .child_exists(&panel, &SelectorDescriptor::tag_only("li"), &session)
                .await
        ));
    }

    #[tokio::test]
    async fn test_exists_does_not_wait() {
        let session = DocumentSession::from_markup(PAGE);
        let slow = ElementResolver::new(ResolverConfig::new(
            Duration::from_secs(30),
            Duration::from_millis(100),
        ));

        let started = Instant::now();
        assert!(!assert_ok!(slow.exists(&SelectorDescriptor::tag_only("table"), &session).await));
        assert!(assert_ok!(slow.exists(&row(), &session).await));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_resolve_from_set() {
        let session = DocumentSession::from_markup(PAGE);
        let mut buttons = SelectorDescriptorSet::new("button");
        buttons
            .insert(SelectorDescriptor::named("Save", "", AttributeKind::Name, "save"))
            .unwrap();

        let found = assert_ok!(resolver().resolve_from_set(&buttons, "SAVE", &session).await);
        assert_eq!(assert_ok!(session.get_text(&found).await), "Save changes");

        let err = assert_err!(resolver().resolve_from_set(&buttons, "cancel", &session).await);
        assert!(matches!(
            err,
            WebAutomationError::Selector(SelectorError::DescriptorNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_session_errors_propagate() {
        let session = DocumentSession::from_markup(PAGE);
        let stale = ElementHandle::new("does-not-exist");

        let err = assert_err!(
            resolver()
                .resolve_within(&stale, &SelectorDescriptor::tag_only("li"), &session)
                .await
        );
        assert!(matches!(
            err,
            WebAutomationError::Session(SessionError::StaleElement(_))
        ));
    }
}
