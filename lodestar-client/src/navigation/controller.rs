//! Navigation controller
//!
//! Drives one view's navigations: resolves the identity to present, asks
//! the fetcher, classifies the response and follows up (redirect, input,
//! certificate selection or repair) until a page is displayed or the
//! navigation ends.
//!
//! # Supersession
//!
//! Every navigation (and every move through history) takes a new
//! generation number. Results are applied while holding the view lock and
//! only if the generation is still current, so a navigation that was
//! overtaken leaves no trace in history, the session cache, the identity
//! store or the displayed page. Prompts race the generation channel and are
//! dropped as soon as a newer navigation starts; fetches run to completion
//! and their result is discarded.
//!
//! Lock order is view, then identities, then session. No std lock is held
//! across an await.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use lodestar_common::protocol::{Response, StatusClass};
use lodestar_common::url::{authority_prefix, host, normalize_input_url, resolve, with_query};
use lodestar_common::validators::{
    RequestUrlError, remaining_query_bytes, validate_request_url,
};
use tokio::sync::watch;
use uuid::Uuid;

use super::locks::{AuthorityLocks, lock_unpoisoned};
use super::options::NavigateOptions;
use super::outcome::{Failure, NavigationOutcome, Notice, Page, PersistedFile};
use super::state::NavState;
use crate::config::{IdentityPrompt, Settings};
use crate::history::{HistoryEntry, HistoryStack, Viewport};
use crate::identity::{Identity, IdentityError, IdentityStore, SessionChoice, SessionIdentityCache};
use crate::network::{FetchRequest, Fetcher};
use crate::prompt::{
    InputRequest, Prompter, RepairAction, RepairKind, RepairRequest, Selection, SelectionChoice,
    SelectionReason, SelectionRequest,
};
use crate::storage::StorageError;

// =============================================================================
// View State
// =============================================================================

/// Everything owned by one view, guarded by a single lock
#[derive(Debug)]
struct View {
    history: HistoryStack,
    page: Option<Page>,
    state: NavState,
    notices: Vec<Notice>,
}

/// Identifies one navigation and lets it notice when it is overtaken
struct Ticket {
    generation: u64,
    cancel: watch::Receiver<u64>,
}

impl Ticket {
    /// Run `future` unless a newer navigation starts first
    async fn race<F: Future>(&self, future: F) -> Option<F::Output> {
        let mut cancel = self.cancel.clone();
        let generation = self.generation;
        let superseded = async move {
            if cancel.wait_for(|current| *current != generation).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            biased;
            () = superseded => None,
            output = future => Some(output),
        }
    }
}

/// Result of a follow-up step inside a navigation
enum Step<T> {
    Continue(T),
    Cancelled,
    Superseded,
    Failed(Failure),
}

// =============================================================================
// Controller
// =============================================================================

/// Navigation state machine for one view
pub struct NavigationController {
    settings: Settings,
    identities: Arc<Mutex<IdentityStore>>,
    session: Arc<Mutex<SessionIdentityCache>>,
    authority_locks: AuthorityLocks,
    fetcher: Arc<dyn Fetcher>,
    prompter: Arc<dyn Prompter>,
    view: Mutex<View>,
    generation: watch::Sender<u64>,
}

impl std::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationController")
            .field("settings", &self.settings)
            .field("view", &self.view)
            .field("generation", &*self.generation.borrow())
            .finish()
    }
}

impl NavigationController {
    /// Create a controller for a new view
    ///
    /// The identity store and session cache are shared with any other views
    /// created from the same handles.
    pub fn new(
        settings: Settings,
        identities: Arc<Mutex<IdentityStore>>,
        session: Arc<Mutex<SessionIdentityCache>>,
        fetcher: Arc<dyn Fetcher>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        let settings = settings.sanitized();
        let (generation, _) = watch::channel(0);

        Self {
            view: Mutex::new(View {
                history: HistoryStack::new(settings.history_limit),
                page: None,
                state: NavState::Idle,
                notices: Vec::new(),
            }),
            settings,
            identities,
            session,
            authority_locks: AuthorityLocks::new(),
            fetcher,
            prompter,
            generation,
        }
    }

    /// Share authority locks with other controllers
    ///
    /// Controllers sharing a session cache should share these too.
    #[must_use]
    pub fn with_authority_locks(mut self, locks: AuthorityLocks) -> Self {
        self.authority_locks = locks;
        self
    }

    /// Another view sharing stores, collaborators and locks, with empty history
    pub fn new_view(&self) -> Self {
        Self::new(
            self.settings.clone(),
            self.identities.clone(),
            self.session.clone(),
            self.fetcher.clone(),
            self.prompter.clone(),
        )
        .with_authority_locks(self.authority_locks.clone())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Active settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current state of this view
    pub fn state(&self) -> NavState {
        self.view().state
    }

    /// Page currently displayed
    pub fn current_page(&self) -> Option<Page> {
        self.view().page.clone()
    }

    /// Copy of this view's history
    pub fn history(&self) -> HistoryStack {
        self.view().history.clone()
    }

    /// Number of history entries
    pub fn history_len(&self) -> usize {
        self.view().history.len()
    }

    /// True if `go_back` would move
    pub fn can_go_back(&self) -> bool {
        self.view().history.can_go_back()
    }

    /// True if `go_forward` would move
    pub fn can_go_forward(&self) -> bool {
        self.view().history.can_go_forward()
    }

    /// Drain pending notifications
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.view().notices)
    }

    // =========================================================================
    // Navigation Entry Points
    // =========================================================================

    /// Navigate to `url`
    ///
    /// User-typed addresses without a scheme are treated as `gemini://`.
    pub async fn navigate(&self, url: &str, options: NavigateOptions) -> NavigationOutcome {
        let url = normalize_input_url(url);
        let ticket = self.begin(options.viewport);
        log::debug!("[nav {}] navigate {url}", ticket.generation);

        let outcome = self.run(&ticket, url, options).await;
        if matches!(outcome, NavigationOutcome::Superseded) {
            log::debug!("[nav {}] superseded", ticket.generation);
        }
        outcome
    }

    /// Re-fetch the current page without touching history
    ///
    /// Returns None if nothing is displayed.
    pub async fn refresh(&self) -> Option<NavigationOutcome> {
        let url = self.current_page()?.url;
        Some(self.navigate(&url, NavigateOptions::refresh()).await)
    }

    /// Navigate to the configured home page
    ///
    /// Returns None if no home page is set.
    pub async fn go_home(&self, viewport: Option<Viewport>) -> Option<NavigationOutcome> {
        let home = self.settings.home_page.clone()?;
        let options = NavigateOptions {
            viewport,
            ..NavigateOptions::default()
        };
        Some(self.navigate(&home, options).await)
    }

    /// Show the previous history entry
    ///
    /// Records `viewport` on the page being left and supersedes any
    /// navigation in flight. Returns None at the oldest entry, without
    /// superseding anything.
    pub fn go_back(&self, viewport: Viewport) -> Option<Page> {
        self.step_history(viewport, HistoryStack::can_go_back, HistoryStack::go_back)
    }

    /// Show the next history entry
    ///
    /// Returns None at the newest entry, without superseding anything.
    pub fn go_forward(&self, viewport: Viewport) -> Option<Page> {
        self.step_history(viewport, HistoryStack::can_go_forward, HistoryStack::go_forward)
    }

    fn step_history(
        &self,
        viewport: Viewport,
        can_step: fn(&HistoryStack) -> bool,
        step: fn(&mut HistoryStack) -> Option<HistoryEntry>,
    ) -> Option<Page> {
        let mut view = self.view();
        if !can_step(&view.history) {
            return None;
        }

        view.history.snapshot_current(viewport);
        let entry = step(&mut view.history)?;

        self.generation.send_modify(|generation| *generation += 1);
        let page = Page::from_entry(&entry);
        view.page = Some(page.clone());
        view.state = NavState::Displaying;
        Some(page)
    }

    // =========================================================================
    // State Machine
    // =========================================================================

    async fn run(&self, ticket: &Ticket, mut url: String, options: NavigateOptions) -> NavigationOutcome {
        let mut explicit = options.identity;
        let mut redirects = 0u32;

        loop {
            self.set_state(ticket, NavState::ResolvingIdentity);
            let identity = match explicit.take() {
                Some(id) => match self.usable_identity(id) {
                    Some(identity) => Some(identity),
                    None => {
                        let failure = Failure::Identity(format!("identity {id} is unknown or not valid"));
                        return self.fail(ticket, failure);
                    }
                },
                None => match self.resolve_identity(ticket, &url).await {
                    Step::Continue(identity) => identity,
                    Step::Cancelled => return self.cancel(ticket),
                    Step::Superseded => return NavigationOutcome::Superseded,
                    Step::Failed(failure) => return self.fail(ticket, failure),
                },
            };

            if let Err(e) = validate_request_url(&url) {
                return self.fail(ticket, invalid_url(&url, e));
            }

            self.set_state(ticket, NavState::Fetching);
            let request = FetchRequest {
                url: url.clone(),
                identity: identity.as_ref().map(Identity::material),
                timeout: self.settings.timeout(),
                max_redirects: self.settings.max_redirects,
            };
            let result = self.fetcher.fetch(request).await;

            if !self.is_current(ticket) {
                return NavigationOutcome::Superseded;
            }
            self.set_state(ticket, NavState::Interpreting);

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    log::debug!("[nav {}] transport failure for {url}: {e}", ticket.generation);
                    return self.fail(ticket, Failure::Transport(e));
                }
            };
            log::debug!(
                "[nav {}] {url} -> {} {}",
                ticket.generation,
                response.status,
                response.meta
            );

            match response.class() {
                StatusClass::Success => {
                    let identity = identity.map(|identity| identity.id);
                    return self.display(ticket, url, response, identity, options.add_to_history);
                }
                StatusClass::Redirect { .. } => {
                    redirects += 1;
                    let Some(target) = response.redirect_target() else {
                        return self.fail(ticket, status_failure(&response));
                    };
                    let next = match resolve(&url, target) {
                        Ok(next) => next,
                        Err(e) => return self.fail(ticket, invalid_url(target, e)),
                    };
                    if redirects > self.settings.max_redirects {
                        let failure = Failure::TooManyRedirects {
                            limit: self.settings.max_redirects,
                            url: next,
                        };
                        return self.fail(ticket, failure);
                    }
                    self.set_state(ticket, NavState::FollowingRedirect);
                    url = next;
                }
                StatusClass::Input { sensitive } => {
                    match self.collect_input(ticket, &url, &response.meta, sensitive).await {
                        Step::Continue(next) => url = next,
                        Step::Cancelled => return self.cancel(ticket),
                        Step::Superseded => return NavigationOutcome::Superseded,
                        Step::Failed(failure) => return self.fail(ticket, failure),
                    }
                }
                StatusClass::CertificateRequired => {
                    match self.require_certificate(ticket, &url, &response.meta).await {
                        Step::Continue(id) => explicit = Some(id),
                        Step::Cancelled => return self.cancel(ticket),
                        Step::Superseded => return NavigationOutcome::Superseded,
                        Step::Failed(failure) => return self.fail(ticket, failure),
                    }
                }
                class @ (StatusClass::CertificateNotAuthorized | StatusClass::CertificateNotValid) => {
                    let kind = if class == StatusClass::CertificateNotAuthorized {
                        RepairKind::NotAuthorized
                    } else {
                        RepairKind::NotValid
                    };
                    match self
                        .repair_certificate(ticket, &url, kind, &response.meta, identity)
                        .await
                    {
                        Step::Continue(id) => explicit = Some(id),
                        Step::Cancelled => return self.cancel(ticket),
                        Step::Superseded => return NavigationOutcome::Superseded,
                        Step::Failed(failure) => return self.fail(ticket, failure),
                    }
                }
                StatusClass::TemporaryFailure
                | StatusClass::PermanentFailure
                | StatusClass::Unknown => {
                    return self.fail(ticket, status_failure(&response));
                }
            }
        }
    }

    /// Decide which identity to present for `url`
    async fn resolve_identity(&self, ticket: &Ticket, url: &str) -> Step<Option<Identity>> {
        let prefix = match authority_prefix(url) {
            Ok(prefix) => prefix,
            Err(e) => return Step::Failed(invalid_url(url, e)),
        };

        let Some(_guard) = ticket.race(self.authority_locks.acquire(&prefix)).await else {
            return Step::Superseded;
        };

        let (choice, candidates) = self.lookup(url);
        let must_prompt = match (self.settings.identity_prompt, choice) {
            (IdentityPrompt::EveryTime, _) if !candidates.is_empty() => true,
            (_, SessionChoice::Identity(identity)) => return Step::Continue(Some(identity)),
            (_, SessionChoice::Anonymous) => return Step::Continue(None),
            (IdentityPrompt::EveryTime | IdentityPrompt::RememberChoice, SessionChoice::Undecided) => {
                false
            }
            (IdentityPrompt::WhenAmbiguous, SessionChoice::Undecided) => candidates.len() > 1,
        };

        if !must_prompt {
            // Candidates are ranked, so the first is the best valid match
            return Step::Continue(candidates.into_iter().next());
        }

        self.set_state(ticket, NavState::AwaitingIdentitySelection);
        let request = SelectionRequest {
            url: url.to_string(),
            reason: SelectionReason::Ambiguous,
            candidates,
            allow_create: false,
        };
        let Some(answer) = ticket
            .race(self.prompter.ask_identity_selection(request))
            .await
        else {
            return Step::Superseded;
        };

        match answer {
            Some(choice) => self.commit_selection(ticket, url, &prefix, choice).map(Some),
            None => self.commit_anonymous(ticket, &prefix),
        }
    }

    /// Status 1x: ask for input and build the follow-up URL
    async fn collect_input(
        &self,
        ticket: &Ticket,
        url: &str,
        prompt: &str,
        sensitive: bool,
    ) -> Step<String> {
        self.set_state(ticket, NavState::AwaitingInput);
        let mut rejected_bytes = None;

        loop {
            let request = InputRequest {
                url: url.to_string(),
                prompt: prompt.to_string(),
                sensitive,
                max_encoded_bytes: remaining_query_bytes(url),
                rejected_bytes,
            };
            let answer = match ticket.race(self.prompter.ask_input(request)).await {
                None => return Step::Superseded,
                Some(None) => return Step::Cancelled,
                Some(Some(answer)) => answer,
            };

            let next = with_query(url, &answer);
            match validate_request_url(&next) {
                Ok(()) => return Step::Continue(next),
                Err(RequestUrlError::TooLong { length }) => {
                    let encoded = next.find('?').map_or(length, |index| length - index - 1);
                    log::debug!("[nav {}] input rejected: {length} byte URL", ticket.generation);
                    rejected_bytes = Some(encoded);
                }
                Err(e) => return Step::Failed(invalid_url(&next, e)),
            }
        }
    }

    /// Status 60: pick or create an identity, then retry with it
    async fn require_certificate(&self, ticket: &Ticket, url: &str, message: &str) -> Step<Uuid> {
        let prefix = match authority_prefix(url) {
            Ok(prefix) => prefix,
            Err(e) => return Step::Failed(invalid_url(url, e)),
        };

        self.set_state(ticket, NavState::AwaitingIdentitySelection);
        let Some(_guard) = ticket.race(self.authority_locks.acquire(&prefix)).await else {
            return Step::Superseded;
        };

        let request = SelectionRequest {
            url: url.to_string(),
            reason: SelectionReason::Required {
                message: message.to_string(),
            },
            candidates: self.certificate_candidates(url, None),
            allow_create: true,
        };
        let choice = match ticket
            .race(self.prompter.ask_identity_selection(request))
            .await
        {
            None => return Step::Superseded,
            Some(None) => return Step::Cancelled,
            Some(Some(choice)) => choice,
        };

        self.commit_selection(ticket, url, &prefix, choice)
            .map(|identity| identity.id)
    }

    /// Status 61/62: switch identity or regenerate the current one
    async fn repair_certificate(
        &self,
        ticket: &Ticket,
        url: &str,
        kind: RepairKind,
        message: &str,
        current: Option<Identity>,
    ) -> Step<Uuid> {
        let prefix = match authority_prefix(url) {
            Ok(prefix) => prefix,
            Err(e) => return Step::Failed(invalid_url(url, e)),
        };

        self.set_state(ticket, NavState::AwaitingCertificateRetry);
        let Some(_guard) = ticket.race(self.authority_locks.acquire(&prefix)).await else {
            return Step::Superseded;
        };

        let current_id = current.as_ref().map(|identity| identity.id);
        let request = RepairRequest {
            url: url.to_string(),
            kind,
            message: message.to_string(),
            candidates: self.certificate_candidates(url, current_id),
            current,
        };
        let action = match ticket
            .race(self.prompter.ask_identity_repair(request))
            .await
        {
            None => return Step::Superseded,
            Some(None) => return Step::Cancelled,
            Some(Some(action)) => action,
        };

        match action {
            RepairAction::Switch(id) => self
                .commit_selection(ticket, url, &prefix, SelectionChoice::existing(id))
                .map(|identity| identity.id),
            RepairAction::Regenerate => match current_id {
                Some(id) => self.commit_regeneration(ticket, url, id),
                None => Step::Failed(Failure::Identity(
                    "no certificate was presented, nothing to regenerate".to_string(),
                )),
            },
        }
    }

    // =========================================================================
    // Applying Results
    // =========================================================================

    /// Show a success response, recording it in history if requested
    fn display(
        &self,
        ticket: &Ticket,
        url: String,
        response: Response,
        identity: Option<Uuid>,
        add_to_history: bool,
    ) -> NavigationOutcome {
        let mime_type = response.mime_type().to_string();
        let page = Page {
            url,
            status: response.status,
            meta: response.meta,
            mime_type,
            body: response.body.unwrap_or_default(),
            identity,
            viewport: Viewport::default(),
        };

        let applied = self.apply(ticket, |view| {
            if add_to_history {
                view.history.push(HistoryEntry::new(
                    page.url.clone(),
                    page.body.clone(),
                    page.status,
                    page.meta.clone(),
                    page.mime_type.clone(),
                ));
            }
            view.page = Some(page.clone());
            view.state = NavState::Displaying;
        });

        match applied {
            Some(()) => NavigationOutcome::Displayed(page),
            None => NavigationOutcome::Superseded,
        }
    }

    fn fail(&self, ticket: &Ticket, failure: Failure) -> NavigationOutcome {
        match self.apply(ticket, |view| view.state = NavState::ReportingError) {
            Some(()) => {
                log::debug!("[nav {}] failed: {failure}", ticket.generation);
                NavigationOutcome::Failed(failure)
            }
            None => NavigationOutcome::Superseded,
        }
    }

    fn cancel(&self, ticket: &Ticket) -> NavigationOutcome {
        let applied = self.apply(ticket, |view| {
            view.state = if view.page.is_some() {
                NavState::Displaying
            } else {
                NavState::Idle
            };
        });

        match applied {
            Some(()) => NavigationOutcome::Cancelled,
            None => NavigationOutcome::Superseded,
        }
    }

    /// Use the chosen identity: create it if asked, bind the authority if
    /// `remember` is set, and record it as the session choice
    fn commit_selection(
        &self,
        ticket: &Ticket,
        url: &str,
        prefix: &str,
        choice: SelectionChoice,
    ) -> Step<Identity> {
        let applied = self.apply(ticket, |view| -> Result<Identity, Failure> {
            let mut identities = lock_unpoisoned(&self.identities);

            let identity = match choice.selection {
                Selection::Existing(id) => match identities.get(id) {
                    Some(identity) if identities.is_valid(id) => identity.clone(),
                    _ => {
                        return Err(Failure::Identity(format!(
                            "identity {id} is unknown or not valid"
                        )));
                    }
                },
                Selection::Create { name } => {
                    let host = host(url).map_err(|e| invalid_url(url, e))?;
                    let created = identities.create(
                        &name,
                        &host,
                        self.settings.key_size,
                        self.settings.valid_days,
                    );
                    let identity = settle(&identities, created, &mut view.notices)
                        .map_err(|e| Failure::Identity(e.to_string()))?;
                    view.notices.push(Notice::IdentityCreated {
                        id: identity.id,
                        name: identity.name.clone(),
                    });
                    identity
                }
            };

            if choice.remember
                && let Err(e) = identities.add_prefix(identity.id, prefix)
            {
                report_identity_error(&e, &mut view.notices);
            }
            drop(identities);

            let mut session = lock_unpoisoned(&self.session);
            if let Err(e) = session.record_choice(prefix, Some(identity.id)) {
                report_session_error(&e, &mut view.notices);
            }

            Ok(identity)
        });

        match applied {
            None => Step::Superseded,
            Some(Ok(identity)) => Step::Continue(identity),
            Some(Err(failure)) => Step::Failed(failure),
        }
    }

    /// Record "no identity" for the authority
    fn commit_anonymous(&self, ticket: &Ticket, prefix: &str) -> Step<Option<Identity>> {
        let applied = self.apply(ticket, |view| {
            let mut session = lock_unpoisoned(&self.session);
            if let Err(e) = session.record_choice(prefix, None) {
                report_session_error(&e, &mut view.notices);
            }
        });

        match applied {
            Some(()) => Step::Continue(None),
            None => Step::Superseded,
        }
    }

    /// Replace the certificate of `id` in place
    fn commit_regeneration(&self, ticket: &Ticket, url: &str, id: Uuid) -> Step<Uuid> {
        let applied = self.apply(ticket, |view| -> Result<Uuid, Failure> {
            let host = host(url).map_err(|e| invalid_url(url, e))?;
            let mut identities = lock_unpoisoned(&self.identities);

            match identities.regenerate(id, &host, self.settings.key_size, self.settings.valid_days)
            {
                Ok(true) => {}
                Ok(false) => return Err(Failure::Identity(format!("identity {id} no longer exists"))),
                Err(e) if e.applied_to().is_some() => report_identity_error(&e, &mut view.notices),
                Err(e) => return Err(Failure::Identity(e.to_string())),
            }

            view.notices.push(Notice::CertificateRegenerated { id });
            Ok(id)
        });

        match applied {
            None => Step::Superseded,
            Some(Ok(id)) => Step::Continue(id),
            Some(Err(failure)) => Step::Failed(failure),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn view(&self) -> MutexGuard<'_, View> {
        lock_unpoisoned(&self.view)
    }

    /// Start a navigation, superseding any in flight
    fn begin(&self, viewport: Option<Viewport>) -> Ticket {
        let mut view = self.view();
        if let Some(viewport) = viewport {
            view.history.snapshot_current(viewport);
        }

        self.generation.send_modify(|generation| *generation += 1);
        let generation = *self.generation.borrow();
        view.state = NavState::ResolvingIdentity;

        Ticket {
            generation,
            cancel: self.generation.subscribe(),
        }
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        *self.generation.borrow() == ticket.generation
    }

    /// Run `f` on the view if `ticket` is still the current navigation
    ///
    /// Generations are only bumped under the view lock, so the check and
    /// the update are atomic.
    fn apply<R>(&self, ticket: &Ticket, f: impl FnOnce(&mut View) -> R) -> Option<R> {
        let mut view = self.view();
        if !self.is_current(ticket) {
            return None;
        }
        Some(f(&mut view))
    }

    fn set_state(&self, ticket: &Ticket, state: NavState) {
        self.apply(ticket, |view| {
            if view.state != state {
                log::debug!("[nav {}] {} -> {}", ticket.generation, view.state, state);
                view.state = state;
            }
        });
    }

    fn usable_identity(&self, id: Uuid) -> Option<Identity> {
        let identities = lock_unpoisoned(&self.identities);
        identities
            .get(id)
            .filter(|_| identities.is_valid(id))
            .cloned()
    }

    /// Session choice for `url` plus valid bound identities, best first
    fn lookup(&self, url: &str) -> (SessionChoice, Vec<Identity>) {
        let (choice, candidates, save_error) = {
            let identities = lock_unpoisoned(&self.identities);
            let mut session = lock_unpoisoned(&self.session);

            let choice = session.choice_for(url, &identities);
            let save_error = session.save_if_dirty().err();
            let candidates: Vec<Identity> = identities
                .all_matches(url)
                .into_iter()
                .filter(|identity| identities.is_valid(identity.id))
                .cloned()
                .collect();
            (choice, candidates, save_error)
        };

        if let Some(e) = save_error {
            report_session_error(&e, &mut self.view().notices);
        }

        (choice, candidates)
    }

    /// All valid identities except `exclude`, those bound to `url` first
    fn certificate_candidates(&self, url: &str, exclude: Option<Uuid>) -> Vec<Identity> {
        let identities = lock_unpoisoned(&self.identities);
        let matched = identities.all_matches(url);
        let rest = identities
            .all()
            .iter()
            .filter(|identity| !matched.iter().any(|m| m.id == identity.id));

        matched
            .iter()
            .copied()
            .chain(rest)
            .filter(|identity| Some(identity.id) != exclude && identities.is_valid(identity.id))
            .cloned()
            .collect()
    }
}

impl<T> Step<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Step<U> {
        match self {
            Self::Continue(value) => Step::Continue(f(value)),
            Self::Cancelled => Step::Cancelled,
            Self::Superseded => Step::Superseded,
            Self::Failed(failure) => Step::Failed(failure),
        }
    }
}

// =============================================================================
// Free Helpers
// =============================================================================

/// Identity produced by a store mutation, even if saving the store failed
fn settle(
    identities: &IdentityStore,
    result: Result<Identity, IdentityError>,
    notices: &mut Vec<Notice>,
) -> Result<Identity, IdentityError> {
    match result {
        Ok(identity) => Ok(identity),
        Err(e) => match e.applied_to().and_then(|id| identities.get(id)) {
            Some(identity) => {
                report_identity_error(&e, notices);
                Ok(identity.clone())
            }
            None => Err(e),
        },
    }
}

fn report_identity_error(error: &IdentityError, notices: &mut Vec<Notice>) {
    log::warn!("Identity change not saved: {error}");
    if error.applied_to().is_some() {
        notices.push(Notice::PersistenceFailed {
            file: PersistedFile::Identities,
            message: error.to_string(),
        });
    }
}

fn report_session_error(error: &StorageError, notices: &mut Vec<Notice>) {
    log::warn!("Failed to save session identities: {error}");
    notices.push(Notice::PersistenceFailed {
        file: PersistedFile::SessionChoices,
        message: error.to_string(),
    });
}

fn status_failure(response: &Response) -> Failure {
    Failure::Status {
        status: response.status,
        meta: response.meta.clone(),
    }
}

fn invalid_url(url: &str, reason: impl std::fmt::Display) -> Failure {
    Failure::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}
