//! The homework deck: slides, section controllers, identity, persistence,
//! record compilation, export and reset behind one owner.
//!
//! Time only moves through the injected `Clock`; the host calls `tick` when
//! `next_deadline` passes.

use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use std::rc::Rc;

use crate::autosave::SyncedBucket;
use crate::bucket::{BucketStore, LAST_UPDATED};
use crate::clock::{local_date, local_datetime, Clock, SystemClock};
use crate::config::DeckConfig;
use crate::deck::{default_progress, key_action, percent_of, Deck, KeyAction, ProgressInfo, SlideDef, SLIDES};
use crate::error::{KitError, KitResult};
use crate::export::sink::ExportSink;
use crate::export::{self, ExportFormat, ExportInput, ExportReceipt};
use crate::identity::{IdentityLock, LockState, SessionIdentity};
use crate::migrate::{self, CURRENT_VERSION};
use crate::persist::{LegacyFields, Persister, RootDocument};
use crate::record::{Record, RecordCompiler};
use crate::sections::analyze::{self, AnalyzeState, Flag, FlatTable};
use crate::sections::apply_design::{self, ApplyDesignState, DesignTable};
use crate::sections::explore::{self, derive_views, ExploreState};
use crate::sections::m2m::{self, M2mState};
use crate::sections::propose::{self, ProposeGroup, ProposeState, REGISTRATION_OPTIONS, WORKSHOP_OPTIONS};
use crate::sections::welcome::{self, WelcomeState};
use crate::storage::{MemoryStorage, SqliteStorage, Storage};
use crate::table::Table;

/// The section whose slide is active, if that slide has one.
#[derive(Debug)]
enum Mounted {
    None,
    Welcome(SyncedBucket<WelcomeState>),
    Explore(SyncedBucket<ExploreState>),
    Analyze(SyncedBucket<AnalyzeState>),
    Propose(SyncedBucket<ProposeState>),
    ApplyDesign(SyncedBucket<ApplyDesignState>),
    M2m(SyncedBucket<M2mState>),
}

impl Mounted {
    fn deadline(&self) -> Option<i64> {
        match self {
            Mounted::None => None,
            Mounted::Welcome(b) => b.deadline(),
            Mounted::Explore(b) => b.deadline(),
            Mounted::Analyze(b) => b.deadline(),
            Mounted::Propose(b) => b.deadline(),
            Mounted::ApplyDesign(b) => b.deadline(),
            Mounted::M2m(b) => b.deadline(),
        }
    }

    fn tick(&mut self, now_ms: i64, store: &mut BucketStore) -> KitResult<bool> {
        match self {
            Mounted::None => Ok(false),
            Mounted::Welcome(b) => b.tick(now_ms, store),
            Mounted::Explore(b) => b.tick(now_ms, store),
            Mounted::Analyze(b) => b.tick(now_ms, store),
            Mounted::Propose(b) => b.tick(now_ms, store),
            Mounted::ApplyDesign(b) => b.tick(now_ms, store),
            Mounted::M2m(b) => b.tick(now_ms, store),
        }
    }

    fn flush(&mut self, now_ms: i64, store: &mut BucketStore) -> KitResult<()> {
        match self {
            Mounted::None => Ok(()),
            Mounted::Welcome(b) => b.flush(now_ms, store),
            Mounted::Explore(b) => b.flush(now_ms, store),
            Mounted::Analyze(b) => b.flush(now_ms, store),
            Mounted::Propose(b) => b.flush(now_ms, store),
            Mounted::ApplyDesign(b) => b.flush(now_ms, store),
            Mounted::M2m(b) => b.flush(now_ms, store),
        }
    }

    fn discard(self) {
        match self {
            Mounted::None => {}
            Mounted::Welcome(b) => b.discard(),
            Mounted::Explore(b) => b.discard(),
            Mounted::Analyze(b) => b.discard(),
            Mounted::Propose(b) => b.discard(),
            Mounted::ApplyDesign(b) => b.discard(),
            Mounted::M2m(b) => b.discard(),
        }
    }

    fn state_json(&self) -> Value {
        let v = match self {
            Mounted::None => return Value::Null,
            Mounted::Welcome(b) => serde_json::to_value(b.state()),
            Mounted::Explore(b) => serde_json::to_value(b.state()),
            Mounted::Analyze(b) => serde_json::to_value(b.state()),
            Mounted::Propose(b) => serde_json::to_value(b.state()),
            Mounted::ApplyDesign(b) => serde_json::to_value(b.state()),
            Mounted::M2m(b) => serde_json::to_value(b.state()),
        };
        v.unwrap_or(Value::Null)
    }
}

fn not_active(deck: &Deck, expected: &'static str) -> KitError {
    KitError::SectionNotActive {
        expected,
        active: deck.active_key().to_string(),
    }
}

/// Two random u32 values in base 36, concatenated.
pub fn new_session_salt() -> String {
    let mut rng = rand::thread_rng();
    let a: u32 = rng.gen();
    let b: u32 = rng.gen();
    format!("{}{}", to_base36(a), to_base36(b))
}

// Lowercase base 36 per word: the salt shape already found in stored documents.
fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
pub struct StepStatus {
    pub step: &'static str,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeworkProgress {
    pub steps: Vec<StepStatus>,
    pub done: usize,
    pub total: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub name: String,
    pub section: String,
    pub state: LockState,
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSnapshot {
    pub active: usize,
    pub key: &'static str,
    pub title: &'static str,
    pub slides: &'static [SlideDef],
    pub progress: ProgressInfo,
    pub homework: HomeworkProgress,
    pub identity: IdentitySummary,
    pub fullscreen: bool,
    pub footer: String,
    pub storage_key: String,
    pub pending_writes: bool,
}

pub struct Homework {
    config: DeckConfig,
    clock: Box<dyn Clock>,
    storage: Box<dyn Storage>,
    session: Box<dyn Storage>,
    store: BucketStore,
    legacy: LegacyFields,
    salt: String,
    identity: IdentityLock,
    deck: Deck,
    mounted: Mounted,
    persister: Persister,
    compiler: RecordCompiler,
    initial: Option<RootDocument>,
}

impl Homework {
    /// Load whatever the storage holds (migrating older shapes), seed the
    /// buckets, and capture the initial snapshot used by reset-to-initial.
    pub fn open(
        config: DeckConfig,
        storage: Box<dyn Storage>,
        session: Box<dyn Storage>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let persister = Persister::new(
            config.storage_key(),
            config.legacy_keys.clone(),
            config.persist_delay_ms,
        );
        let mut hw = Self {
            config,
            clock,
            storage,
            session,
            store: BucketStore::new(),
            legacy: LegacyFields::default(),
            salt: String::new(),
            identity: IdentityLock::new(),
            deck: Deck::new(&SLIDES),
            mounted: Mounted::None,
            persister,
            compiler: RecordCompiler::new(),
            initial: None,
        };
        hw.hydrate();
        hw
    }

    /// Workspace-backed deck: `slidekit.sqlite3` for durable storage, an
    /// in-process map for the session identity.
    pub fn open_workspace(workspace: &Path, overrides: Option<&Value>) -> anyhow::Result<Self> {
        let config = DeckConfig::load(workspace, overrides);
        let storage = SqliteStorage::open(workspace)?;
        Ok(Self::open(
            config,
            Box::new(storage),
            Box::new(MemoryStorage::new()),
            Box::new(SystemClock),
        ))
    }

    fn hydrate(&mut self) {
        let key = self.config.storage_key();
        let loaded = migrate::load(self.storage.as_ref(), &key, &self.config.legacy_keys);
        let from_elsewhere = loaded.source_key.as_deref().is_some_and(|k| k != key);
        let migrated = !loaded.applied.is_empty();
        let doc = loaded
            .doc
            .map(RootDocument::from_migrated)
            .unwrap_or_default();
        self.apply_document(doc);
        if self.initial.is_none() {
            self.initial = Some(self.document());
        }
        let now = self.clock.now_ms();
        if self.salt.is_empty() {
            self.salt = new_session_salt();
            self.persister.schedule(now);
        }
        if from_elsewhere || migrated {
            self.persister.schedule(now);
        }
        tracing::info!(
            key = %key,
            source = ?loaded.source_key,
            buckets = self.store.buckets().len(),
            locked = self.identity.is_locked(),
            "deck hydrated"
        );
    }

    fn apply_document(&mut self, doc: RootDocument) {
        self.store = BucketStore::from_buckets(doc.buckets);
        self.legacy = doc.legacy;
        self.salt = doc.session_salt;
        self.compiler.invalidate();

        let w = self.store.get(welcome::KEY);
        let text = |field: &str| -> Option<String> {
            w.and_then(|b| b.get(field))
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        let name = text("studentName").unwrap_or_else(|| self.legacy.student_name.clone());
        let section = text("classSection").unwrap_or_else(|| self.legacy.class_section.clone());
        let locked = self.legacy.identity_locked
            || w.and_then(|b| b.get("identityLocked"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
        self.identity = IdentityLock::restored(&name, &section, locked);
        if self.identity.is_locked() {
            self.write_session_identity();
        }
    }

    /// The persisted shape of everything in memory right now.
    pub fn document(&self) -> RootDocument {
        RootDocument {
            version: CURRENT_VERSION,
            buckets: self.store.buckets().clone(),
            legacy: self.legacy.clone(),
            session_salt: self.salt.clone(),
        }
    }

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    pub fn identity(&self) -> &IdentityLock {
        &self.identity
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn active(&self) -> usize {
        self.deck.active()
    }

    pub fn active_key(&self) -> &'static str {
        self.deck.active_key()
    }

    // ---------------------------------------------------------------------
    // timers

    /// Earliest moment `tick` has work to do.
    pub fn next_deadline(&self) -> Option<i64> {
        match (self.mounted.deadline(), self.persister.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn has_pending_writes(&self) -> bool {
        self.next_deadline().is_some()
    }

    /// Fire every timer whose deadline has passed.
    pub fn tick(&mut self) -> KitResult<()> {
        let now = self.clock.now_ms();
        self.mounted.tick(now, &mut self.store)?;
        self.note_store_change(now);
        if self.persister.take_due(now) {
            self.persist_now()?;
        }
        Ok(())
    }

    /// Write the mounted section, then the document if a write is queued.
    pub fn flush_all(&mut self) -> KitResult<()> {
        let now = self.clock.now_ms();
        self.mounted.flush(now, &mut self.store)?;
        self.note_store_change(now);
        if self.persister.is_pending() {
            self.persist_now()?;
        }
        Ok(())
    }

    fn note_store_change(&mut self, now: i64) {
        if self.store.is_dirty() {
            self.store.mark_clean();
            self.persister.schedule(now);
        }
    }

    fn persist_now(&mut self) -> KitResult<()> {
        let doc = self.document();
        self.persister.write(self.storage.as_mut(), &doc)?;
        Ok(())
    }

    fn schedule_persist(&mut self) {
        let now = self.clock.now_ms();
        self.persister.schedule(now);
    }

    // ---------------------------------------------------------------------
    // navigation

    /// Flush and unmount the current section, then mount the target slide's.
    pub fn navigate(&mut self, to: i64) -> KitResult<usize> {
        let target = self.deck.clamp(to);
        if target == self.deck.active() {
            return Ok(target);
        }
        let now = self.clock.now_ms();
        self.mounted.flush(now, &mut self.store)?;
        self.mounted = Mounted::None;
        self.note_store_change(now);
        self.deck.goto(target as i64);
        self.mount_active();
        tracing::debug!(slide = self.deck.active_key(), "navigated");
        Ok(target)
    }

    pub fn next(&mut self) -> KitResult<usize> {
        let to = self.deck.next_index();
        self.navigate(to as i64)
    }

    pub fn prev(&mut self) -> KitResult<usize> {
        let to = self.deck.prev_index();
        self.navigate(to as i64)
    }

    /// Returns the action taken, if any.
    pub fn key(&mut self, key: &str, in_input: bool) -> KitResult<Option<KeyAction>> {
        let action = key_action(key, in_input);
        match action {
            Some(KeyAction::Prev) => {
                self.prev()?;
            }
            Some(KeyAction::Next) => {
                self.next()?;
            }
            Some(KeyAction::ToggleFullscreen) => {
                self.deck.toggle_fullscreen();
            }
            None => {}
        }
        Ok(action)
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.deck.toggle_fullscreen()
    }

    fn mount_active(&mut self) {
        let now = self.clock.now_ms();
        let bucket_delay = self.config.bucket_delay_ms;
        self.mounted = match self.deck.active_key() {
            welcome::KEY => {
                let mut b = SyncedBucket::mount(welcome::KEY, WelcomeState::default(), &self.store, bucket_delay);
                let identity = &self.identity;
                b.update(now, |s| s.mirror(identity));
                Mounted::Welcome(b)
            }
            explore::KEY => {
                let mut b = SyncedBucket::mount(explore::KEY, ExploreState::default(), &self.store, bucket_delay);
                b.update(now, ExploreState::ensure_preview);
                Mounted::Explore(b)
            }
            analyze::KEY => Mounted::Analyze(SyncedBucket::mount(
                analyze::KEY,
                AnalyzeState::default(),
                &self.store,
                bucket_delay,
            )),
            propose::KEY => Mounted::Propose(SyncedBucket::mount(
                propose::KEY,
                ProposeState::default(),
                &self.store,
                bucket_delay,
            )),
            apply_design::KEY => {
                let mut b = SyncedBucket::mount(
                    apply_design::KEY,
                    ApplyDesignState::default(),
                    &self.store,
                    self.config.design_delay_ms,
                );
                b.update(now, ApplyDesignState::normalize);
                Mounted::ApplyDesign(b)
            }
            m2m::KEY => {
                let mut b = SyncedBucket::mount(m2m::KEY, M2mState::default(), &self.store, bucket_delay);
                b.update(now, M2mState::normalize);
                Mounted::M2m(b)
            }
            _ => Mounted::None,
        };
    }

    // ---------------------------------------------------------------------
    // welcome

    /// False when the identity is locked (nothing changes).
    pub fn welcome_set_name(&mut self, first: &str, last: &str) -> KitResult<bool> {
        let now = self.clock.now_ms();
        let b = match &mut self.mounted {
            Mounted::Welcome(b) => b,
            _ => return Err(not_active(&self.deck, welcome::KEY)),
        };
        if !self.identity.set_name(first, last) {
            return Ok(false);
        }
        let identity = &self.identity;
        b.update(now, |s| s.mirror(identity));
        self.legacy.student_name = self.identity.full_name();
        self.schedule_persist();
        Ok(true)
    }

    pub fn welcome_set_section(&mut self, section: &str) -> KitResult<bool> {
        let now = self.clock.now_ms();
        let b = match &mut self.mounted {
            Mounted::Welcome(b) => b,
            _ => return Err(not_active(&self.deck, welcome::KEY)),
        };
        if !self.identity.set_section(section) {
            return Ok(false);
        }
        let identity = &self.identity;
        b.update(now, |s| s.mirror(identity));
        self.legacy.class_section = self.identity.section().to_string();
        self.schedule_persist();
        Ok(true)
    }

    /// Lock name and section. Saved to the bucket at once, not debounced.
    pub fn welcome_record(&mut self) -> KitResult<()> {
        let now = self.clock.now_ms();
        let b = match &mut self.mounted {
            Mounted::Welcome(b) => b,
            _ => return Err(not_active(&self.deck, welcome::KEY)),
        };
        self.identity.record(&self.config.sections)?;
        let identity = &self.identity;
        b.update(now, |s| s.mirror(identity));
        b.flush(now, &mut self.store)?;
        self.legacy.student_name = self.identity.full_name();
        self.legacy.class_section = self.identity.section().to_string();
        self.legacy.identity_locked = true;
        self.write_session_identity();
        self.note_store_change(now);
        Ok(())
    }

    fn write_session_identity(&mut self) {
        let key = self.config.identity_session_key.clone();
        let result = serde_json::to_string(&self.identity.session_identity())
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.session.set_item(&key, &raw));
        if let Err(e) = result {
            tracing::warn!(error = %e, "could not write session identity");
        }
    }

    pub fn session_identity(&self) -> Option<SessionIdentity> {
        let raw = self
            .session
            .get_item(&self.config.identity_session_key)
            .ok()
            .flatten()?;
        serde_json::from_str(&raw).ok()
    }

    // ---------------------------------------------------------------------
    // explore

    fn explore_bucket(&mut self) -> KitResult<&mut SyncedBucket<ExploreState>> {
        match &mut self.mounted {
            Mounted::Explore(b) => Ok(b),
            _ => Err(not_active(&self.deck, explore::KEY)),
        }
    }

    pub fn explore_set_csv(&mut self, text: &str) -> KitResult<()> {
        let now = self.clock.now_ms();
        self.explore_bucket()?
            .update(now, |s| s.csv_text = text.to_string());
        Ok(())
    }

    pub fn explore_load_preview(&mut self) -> KitResult<usize> {
        let now = self.clock.now_ms();
        let b = self.explore_bucket()?;
        b.update(now, ExploreState::load_preview);
        Ok(b.state().csv_preview.len())
    }

    pub fn explore_set_notes(&mut self, notes: &str) -> KitResult<()> {
        let now = self.clock.now_ms();
        self.explore_bucket()?
            .update(now, |s| s.exp_notes = notes.to_string());
        Ok(())
    }

    // ---------------------------------------------------------------------
    // analyze / propose

    pub fn analyze_set(&mut self, table: FlatTable, flag: Flag, value: bool) -> KitResult<()> {
        let now = self.clock.now_ms();
        let b = match &mut self.mounted {
            Mounted::Analyze(b) => b,
            _ => return Err(not_active(&self.deck, analyze::KEY)),
        };
        b.update(now, |s| s.set(table, flag, value));
        let observations = b.state().observations();
        if self.legacy.observations != observations {
            self.legacy.observations = observations;
            self.schedule_persist();
        }
        Ok(())
    }

    pub fn propose_toggle(&mut self, group: ProposeGroup, option: &str) -> KitResult<bool> {
        let now = self.clock.now_ms();
        let b = match &mut self.mounted {
            Mounted::Propose(b) => b,
            _ => return Err(not_active(&self.deck, propose::KEY)),
        };
        let selected = b.update(now, |s| s.toggle(group, option))?;
        self.legacy.solutions = b.state().solutions.clone();
        self.schedule_persist();
        Ok(selected)
    }

    // ---------------------------------------------------------------------
    // table editing

    /// Run an edit against one Apply-Design table and mirror the summaries.
    pub fn design_edit<R>(
        &mut self,
        which: DesignTable,
        f: impl FnOnce(&mut Table) -> KitResult<R>,
    ) -> KitResult<R> {
        let now = self.clock.now_ms();
        let b = match &mut self.mounted {
            Mounted::ApplyDesign(b) => b,
            _ => return Err(not_active(&self.deck, apply_design::KEY)),
        };
        let out = b.update(now, |s| s.edit(which, f))?;
        if self.legacy.summaries != b.state().summaries {
            self.legacy.summaries = b.state().summaries.clone();
            self.schedule_persist();
        }
        Ok(out)
    }

    pub fn m2m_edit<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Table) -> KitResult<R>,
    ) -> KitResult<R> {
        let now = self.clock.now_ms();
        let b = match &mut self.mounted {
            Mounted::M2m(b) => b,
            _ => return Err(not_active(&self.deck, m2m::KEY)),
        };
        b.update(now, |s| s.edit(index, f))
    }

    // ---------------------------------------------------------------------
    // derived views

    pub fn record(&mut self) -> Rc<Record> {
        let today = local_date(self.clock.now_ms());
        self.compiler.compile(&self.store, &self.legacy, &today)
    }

    /// The active slide's editable state plus whatever it derives.
    pub fn section_state(&mut self) -> Value {
        let key = self.deck.active_key();
        let record = self.record();
        let state = self.mounted.state_json();
        match &self.mounted {
            Mounted::Welcome(_) => json!({
                "key": key,
                "state": state,
                "identity": self.identity_summary(),
                "sections": self.config.sections,
            }),
            Mounted::Explore(b) => json!({
                "key": key,
                "state": state,
                "views": derive_views(&b.state().csv_preview),
            }),
            Mounted::Analyze(b) => json!({
                "key": key,
                "state": state,
                "observations": b.state().observations(),
                "views": derive_views(&record.explore.csv_preview),
            }),
            Mounted::Propose(_) => json!({
                "key": key,
                "state": state,
                "options": {
                    "workshops": WORKSHOP_OPTIONS,
                    "registrations": REGISTRATION_OPTIONS,
                },
            }),
            Mounted::ApplyDesign(_) | Mounted::M2m(_) => json!({ "key": key, "state": state }),
            Mounted::None => json!({
                "key": key,
                "state": Value::Null,
                "record": crate::record::to_json(&record),
            }),
        }
    }

    pub fn identity_summary(&self) -> IdentitySummary {
        IdentitySummary {
            name: self.identity.full_name(),
            section: self.identity.section().to_string(),
            state: self.identity.state(),
            locked: self.identity.is_locked(),
        }
    }

    /// Seven-step completion map shown in the progress bar.
    pub fn homework_progress(&mut self) -> HomeworkProgress {
        let record = self.record();
        let welcome = !self.identity.full_name().is_empty() && !self.identity.section().is_empty();
        let explore = !record.explore.csv_preview.is_empty() || !record.explore.exp_notes.is_empty();
        let analyze = record.analyze.any();
        let propose = !record.propose.solutions.is_empty();
        let apply = record.apply.summaries.has_answers();
        let m2m = record.m2m.tables.iter().any(Table::is_touched);
        let review = welcome && (analyze || apply || m2m);
        let steps = vec![
            StepStatus { step: "Welcome", done: welcome },
            StepStatus { step: "Explore", done: explore },
            StepStatus { step: "Analyze", done: analyze },
            StepStatus { step: "Propose", done: propose },
            StepStatus { step: "Apply", done: apply },
            StepStatus { step: "M2M", done: m2m },
            StepStatus { step: "Review", done: review },
        ];
        let done = steps.iter().filter(|s| s.done).count();
        let total = steps.len();
        HomeworkProgress {
            steps,
            done,
            total,
            percent: percent_of(done, total),
        }
    }

    /// `slide title • name • date`; the name comes from the session identity.
    pub fn footer(&self) -> String {
        let title = self.deck.active_slide().map(|s| s.title).unwrap_or_default();
        let date = local_date(self.clock.now_ms());
        let name = self
            .session_identity()
            .map(|s| s.full_name())
            .unwrap_or_default();
        if name.is_empty() {
            format!("{title} • {date}")
        } else {
            format!("{title} • {name} • {date}")
        }
    }

    pub fn snapshot(&mut self) -> DeckSnapshot {
        let slide = self.deck.active_slide();
        DeckSnapshot {
            active: self.deck.active(),
            key: self.deck.active_key(),
            title: slide.map(|s| s.title).unwrap_or_default(),
            slides: self.deck.slides(),
            progress: default_progress(self.deck.active(), self.deck.slides().len()),
            homework: self.homework_progress(),
            identity: self.identity_summary(),
            fullscreen: self.deck.fullscreen(),
            footer: self.footer(),
            storage_key: self.persister.key().to_string(),
            pending_writes: self.has_pending_writes(),
        }
    }

    // ---------------------------------------------------------------------
    // export / reset

    /// Flush the mounted section so the record sees the latest edits, then
    /// hand the compiled record to the export engine.
    pub fn export(
        &mut self,
        format: ExportFormat,
        device: Option<&str>,
        sink: &mut dyn ExportSink,
    ) -> KitResult<ExportReceipt> {
        let now = self.clock.now_ms();
        self.mounted.flush(now, &mut self.store)?;
        self.note_store_change(now);
        let record = self.record();
        let device = device
            .map(str::to_string)
            .unwrap_or_else(export::device_info);
        let time = local_datetime(now);
        let buckets = self.store.buckets().clone();
        let input = ExportInput {
            format,
            config: &self.config,
            locked: self.identity.is_locked(),
            salt: &self.salt,
            device: &device,
            time: &time,
            timestamp_ms: now,
            order: self.deck.slides().iter().map(|s| s.key).collect(),
            buckets: &buckets,
        };
        export::run_export(&record, &input, sink)
    }

    /// Clear the durable keys, drop unsaved edits, and go back to the first
    /// slide. With `to_initial` the first-hydrate snapshot is restored and
    /// written under the current key. `on_reset` receives the session storage
    /// for host-specific state.
    pub fn reset(
        &mut self,
        to_initial: bool,
        on_reset: impl FnOnce(&mut dyn Storage) -> anyhow::Result<()>,
    ) -> KitResult<()> {
        std::mem::replace(&mut self.mounted, Mounted::None).discard();
        self.persister.clear_all(self.storage.as_mut())?;

        let restore = if to_initial { self.initial.clone() } else { None };
        let restored = restore.is_some();
        match restore {
            Some(initial) => self.apply_document(initial),
            None => {
                self.apply_document(RootDocument::default());
                self.identity = IdentityLock::new();
            }
        }
        self.salt = new_session_salt();
        self.deck.reset();
        self.mount_active();
        // A restored snapshot is durable at once; a blank reset leaves no key.
        if restored {
            self.persist_now()?;
        }

        if let Err(e) = on_reset(self.session.as_mut()) {
            tracing::warn!(error = %e, "reset hook failed");
        }
        tracing::info!(to_initial, "deck reset");
        Ok(())
    }

    /// Bucket timestamps, for hosts that display "last saved".
    pub fn last_updated(&self, bucket: &str) -> Option<i64> {
        self.store
            .get(bucket)
            .and_then(|b| b.get(LAST_UPDATED))
            .and_then(Value::as_i64)
    }
}
