//! Per-page orchestration of staged, independently triggered loads.
//!
//! A [`ProgressiveController`] owns the page's stage registry, filter
//! criteria and loaded data. The `list` stage fires on mount; `enums` and
//! `modalDetail` fire only when the editor that consumes them opens.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::anyhow;
use futures::{future::join_all, FutureExt};
use shared::{
    domain::{EnumKind, PlanId},
    protocol::{EnumOption, ListItem, Mutation, PlanDetail},
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    debounce::DebouncedTrigger,
    error::LoadError,
    filter::{FilterCriteria, FilteredView, SortOrder},
    notice::Notice,
    request_gate::RequestGate,
    service::AssetService,
    stage::{EnumCatalog, LoadContext, StageLoader, StagePayload, StageRegistry, StageState},
    validation::validate_mutation,
};

pub const STAGE_LIST: &str = "list";
pub const STAGE_ENUMS: &str = "enums";
pub const STAGE_MODAL_DETAIL: &str = "modalDetail";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Skip when the stage is already loading or loaded.
    Normal,
    /// Supersede any in-flight request and reload.
    Force,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Skipped,
    Loaded,
    Failed(LoadError),
    /// A newer request or an unmount took over; nothing was written.
    Superseded,
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    StageLoaded { stage: String },
    StageFailed { stage: String, error: LoadError },
    Notice(Notice),
    MutationApplied { op: &'static str },
}

struct PageState {
    registry: StageRegistry,
    items: Arc<Vec<ListItem>>,
    enums: EnumCatalog,
    detail: Option<PlanDetail>,
    custom: HashMap<String, serde_json::Value>,
    criteria: FilterCriteria,
    selected: Option<PlanId>,
    notice: Option<Notice>,
    unmounted: bool,
}

impl PageState {
    fn apply(&mut self, stage: &str, payload: StagePayload) {
        match payload {
            StagePayload::List(items) => self.items = Arc::new(items),
            StagePayload::Enums(catalog) => self.enums = catalog,
            StagePayload::Detail(detail) => self.detail = Some(detail),
            StagePayload::Custom(value) => {
                self.custom.insert(stage.to_string(), value);
            }
        }
    }
}

pub struct ProgressiveController {
    service: Arc<dyn AssetService>,
    gate: RequestGate,
    debouncer: DebouncedTrigger,
    search_delay: Duration,
    state: Mutex<PageState>,
    view: Mutex<FilteredView<ListItem>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ProgressiveController {
    pub fn new(service: Arc<dyn AssetService>, search_delay: Duration) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        let mut registry = StageRegistry::new();
        for (name, loader) in builtin_stages(&service) {
            if let Err(err) = registry.register(name, loader) {
                warn!(%err, "built-in stage registration failed");
            }
        }

        Arc::new(Self {
            service,
            gate: RequestGate::new(),
            debouncer: DebouncedTrigger::new(),
            search_delay,
            state: Mutex::new(PageState {
                registry,
                items: Arc::new(Vec::new()),
                enums: EnumCatalog::new(),
                detail: None,
                custom: HashMap::new(),
                criteria: FilterCriteria::default(),
                selected: None,
                notice: None,
                unmounted: false,
            }),
            view: Mutex::new(FilteredView::new()),
            events,
        })
    }

    pub fn register_stage(&self, name: &str, loader: StageLoader) -> Result<(), LoadError> {
        self.lock_state().registry.register(name, loader)
    }

    pub async fn mount(&self) -> TriggerOutcome {
        self.trigger_stage(STAGE_LIST, TriggerMode::Normal).await
    }

    pub async fn trigger_stage(&self, name: &str, mode: TriggerMode) -> TriggerOutcome {
        let (handle, loader, context) = {
            let mut state = self.lock_state();
            if state.unmounted {
                return TriggerOutcome::Failed(LoadError::Unmounted);
            }
            let Some(stage) = state.registry.get(name) else {
                return TriggerOutcome::Failed(LoadError::UnknownStage(name.to_string()));
            };
            if mode == TriggerMode::Normal
                && matches!(stage.state(), StageState::Loading | StageState::Loaded)
            {
                debug!(stage = name, state = ?stage.state(), "trigger skipped");
                return TriggerOutcome::Skipped;
            }
            let loader = stage.loader();
            let context = LoadContext {
                criteria: state.criteria.clone(),
                selected: state.selected,
            };
            if let Err(err) = state.registry.mark_loading(name) {
                return TriggerOutcome::Failed(err);
            }
            (self.gate.begin(name), loader, context)
        };

        let result = handle.run(loader(context)).await;

        let mut state = self.lock_state();
        if !self.gate.finish(&handle) || state.unmounted {
            debug!(stage = name, generation = handle.generation(), "discarding superseded result");
            return TriggerOutcome::Superseded;
        }

        match result {
            Ok(payload) => {
                state.apply(name, payload);
                if let Err(err) = state.registry.mark_loaded(name) {
                    return TriggerOutcome::Failed(err);
                }
                drop(state);
                info!(stage = name, "stage loaded");
                let _ = self.events.send(ControllerEvent::StageLoaded {
                    stage: name.to_string(),
                });
                TriggerOutcome::Loaded
            }
            Err(err) if err.is_aborted() => {
                debug!(stage = name, "request aborted");
                TriggerOutcome::Superseded
            }
            Err(err) => {
                warn!(stage = name, %err, "stage failed");
                if let Err(mark_err) = state.registry.mark_error(name, err.clone()) {
                    return TriggerOutcome::Failed(mark_err);
                }
                let notice = Notice::from_error(name, &err);
                state.notice = notice.clone();
                drop(state);
                let _ = self.events.send(ControllerEvent::StageFailed {
                    stage: name.to_string(),
                    error: err.clone(),
                });
                if let Some(notice) = notice {
                    let _ = self.events.send(ControllerEvent::Notice(notice));
                }
                TriggerOutcome::Failed(err)
            }
        }
    }

    /// Selects `id` and loads the editor's reference data and detail record
    /// concurrently.
    pub async fn open_modal(&self, id: PlanId) -> (TriggerOutcome, TriggerOutcome) {
        let detail_mode = {
            let mut state = self.lock_state();
            if state.unmounted {
                return (
                    TriggerOutcome::Failed(LoadError::Unmounted),
                    TriggerOutcome::Failed(LoadError::Unmounted),
                );
            }
            if state.selected == Some(id) {
                TriggerMode::Normal
            } else {
                state.selected = Some(id);
                state.detail = None;
                TriggerMode::Force
            }
        };

        tokio::join!(
            self.trigger_stage(STAGE_ENUMS, TriggerMode::Normal),
            self.trigger_stage(STAGE_MODAL_DETAIL, detail_mode),
        )
    }

    pub fn close_modal(&self) {
        let mut state = self.lock_state();
        state.selected = None;
        state.detail = None;
        self.gate.cancel(STAGE_MODAL_DETAIL);
        if let Err(err) = state.registry.reset(STAGE_MODAL_DETAIL) {
            warn!(%err, "failed to reset detail stage");
        }
    }

    pub fn set_search(self: &Arc<Self>, search: impl Into<String>) {
        let search = search.into();
        if self.update_criteria(|criteria| criteria.search = search) {
            self.schedule_list_refresh();
        }
    }

    pub fn set_status(self: &Arc<Self>, status: Option<String>) {
        if self.update_criteria(|criteria| criteria.status = status) {
            self.schedule_list_refresh();
        }
    }

    pub fn set_filter(self: &Arc<Self>, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        let updated = self.update_criteria(|criteria| match value {
            Some(value) => {
                criteria.filters.insert(key, value);
            }
            None => {
                criteria.filters.remove(&key);
            }
        });
        if updated {
            self.schedule_list_refresh();
        }
    }

    /// Ordering is applied client side and never refetches.
    pub fn set_sort(&self, sort: Option<SortOrder>) {
        self.update_criteria(|criteria| criteria.sort = sort);
    }

    /// Whether a debounced list refresh is waiting to fire.
    pub fn is_refresh_pending(&self) -> bool {
        self.debouncer.is_pending(STAGE_LIST)
    }

    /// Replaces the criteria and reloads the list right away, dropping any
    /// pending debounced refresh.
    pub async fn search_now(&self, criteria: FilterCriteria) -> TriggerOutcome {
        self.debouncer.cancel(STAGE_LIST);
        self.update_criteria(|current| *current = criteria);
        self.trigger_stage(STAGE_LIST, TriggerMode::Force).await
    }

    /// Validates and submits `mutation`, then reloads the list.
    ///
    /// Failures are returned to the caller and leave page data untouched.
    pub async fn submit(&self, mutation: Mutation) -> Result<(), LoadError> {
        if self.lock_state().unmounted {
            return Err(LoadError::Unmounted);
        }
        validate_mutation(&mutation)?;

        let op = mutation.name();
        if let Err(err) = self.service.mutate(mutation).await {
            let err = LoadError::network(&err);
            warn!(op, %err, "mutation failed");
            if let Some(notice) = Notice::from_error(op, &err) {
                let _ = self.events.send(ControllerEvent::Notice(notice));
            }
            return Err(err);
        }

        info!(op, "mutation applied");
        let _ = self.events.send(ControllerEvent::MutationApplied { op });
        self.trigger_stage(STAGE_LIST, TriggerMode::Force).await;
        Ok(())
    }

    /// Cancels in-flight requests and pending timers. Stages that were
    /// loading go back to their previous state and later results are
    /// discarded.
    pub fn on_unmount(&self) {
        let mut state = self.lock_state();
        state.unmounted = true;
        let aborted = self.gate.cancel_all();
        let timers = self.debouncer.cancel_all();
        let rolled_back = state.registry.abandon_loading();
        info!(aborted, timers, rolled_back, "controller unmounted");
    }

    pub fn is_any_loading(&self) -> bool {
        self.lock_state().registry.any_loading()
    }

    pub fn is_stage_loading(&self, name: &str) -> bool {
        self.lock_state()
            .registry
            .get(name)
            .is_some_and(|stage| stage.is_loading())
    }

    pub fn is_stage_loaded(&self, name: &str) -> bool {
        self.lock_state()
            .registry
            .get(name)
            .is_some_and(|stage| stage.is_loaded())
    }

    pub fn stage_state(&self, name: &str) -> Option<StageState> {
        self.lock_state().registry.get(name).map(|stage| stage.state())
    }

    pub fn stage_error(&self, name: &str) -> Option<LoadError> {
        self.lock_state()
            .registry
            .get(name)
            .and_then(|stage| stage.last_error().cloned())
    }

    pub fn items(&self) -> Arc<Vec<ListItem>> {
        Arc::clone(&self.lock_state().items)
    }

    /// Loaded rows filtered and ordered by the current criteria.
    pub fn visible_rows(&self) -> Arc<Vec<ListItem>> {
        let (items, criteria) = {
            let state = self.lock_state();
            (Arc::clone(&state.items), state.criteria.clone())
        };
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rows(&items, &criteria)
    }

    pub fn view_recomputations(&self) -> u64 {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recomputations()
    }

    pub fn enum_options(&self, kind: EnumKind) -> Vec<EnumOption> {
        self.lock_state()
            .enums
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn detail(&self) -> Option<PlanDetail> {
        self.lock_state().detail.clone()
    }

    pub fn custom_payload(&self, stage: &str) -> Option<serde_json::Value> {
        self.lock_state().custom.get(stage).cloned()
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.lock_state().criteria.clone()
    }

    pub fn selected(&self) -> Option<PlanId> {
        self.lock_state().selected
    }

    pub fn notice(&self) -> Option<Notice> {
        self.lock_state().notice.clone()
    }

    pub fn dismiss_notice(&self) {
        self.lock_state().notice = None;
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Returns false once unmounted, leaving the criteria unchanged.
    fn update_criteria(&self, update: impl FnOnce(&mut FilterCriteria)) -> bool {
        let mut state = self.lock_state();
        if state.unmounted {
            return false;
        }
        update(&mut state.criteria);
        true
    }

    fn schedule_list_refresh(self: &Arc<Self>) {
        let controller = Arc::downgrade(self);
        self.debouncer.schedule(STAGE_LIST, self.search_delay, async move {
            if let Some(controller) = controller.upgrade() {
                controller.trigger_stage(STAGE_LIST, TriggerMode::Force).await;
            }
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn builtin_stages(service: &Arc<dyn AssetService>) -> [(&'static str, StageLoader); 3] {
    [
        (STAGE_LIST, list_loader(Arc::clone(service))),
        (STAGE_ENUMS, enums_loader(Arc::clone(service))),
        (STAGE_MODAL_DETAIL, detail_loader(Arc::clone(service))),
    ]
}

fn list_loader(service: Arc<dyn AssetService>) -> StageLoader {
    Arc::new(move |context: LoadContext| load_list(Arc::clone(&service), context).boxed())
}

fn enums_loader(service: Arc<dyn AssetService>) -> StageLoader {
    Arc::new(move |_context: LoadContext| load_enums(Arc::clone(&service)).boxed())
}

fn detail_loader(service: Arc<dyn AssetService>) -> StageLoader {
    Arc::new(move |context: LoadContext| load_detail(Arc::clone(&service), context).boxed())
}

async fn load_list(
    service: Arc<dyn AssetService>,
    context: LoadContext,
) -> anyhow::Result<StagePayload> {
    let items = service.fetch_list(&context.criteria).await?;
    Ok(StagePayload::List(items))
}

async fn load_enums(service: Arc<dyn AssetService>) -> anyhow::Result<StagePayload> {
    Ok(StagePayload::Enums(load_enum_catalog(service.as_ref()).await))
}

async fn load_detail(
    service: Arc<dyn AssetService>,
    context: LoadContext,
) -> anyhow::Result<StagePayload> {
    let id = context
        .selected
        .ok_or_else(|| anyhow!("no plan selected for detail view"))?;
    Ok(StagePayload::Detail(service.fetch_detail(id).await?))
}

/// Fetches every enum kind independently; a failed kind falls back to its
/// built-in options.
async fn load_enum_catalog(service: &dyn AssetService) -> EnumCatalog {
    let fetched = join_all(EnumKind::ALL.map(|kind| async move {
        let options = match service.fetch_enum(kind).await {
            Ok(options) => options,
            Err(err) => {
                warn!(
                    kind = kind.as_path(),
                    error = %format!("{err:#}"),
                    "enum fetch failed; using defaults"
                );
                default_enum_options(kind)
            }
        };
        (kind, options)
    }))
    .await;
    fetched.into_iter().collect()
}

pub fn default_enum_options(kind: EnumKind) -> Vec<EnumOption> {
    let pairs: &[(&str, &str)] = match kind {
        EnumKind::PlanStatus => &[
            ("draft", "Draft"),
            ("pending", "Pending"),
            ("in_progress", "In progress"),
            ("completed", "Completed"),
            ("cancelled", "Cancelled"),
        ],
        EnumKind::ComponentType => &[
            ("cpu", "CPU"),
            ("memory", "Memory"),
            ("storage", "Storage"),
            ("motherboard", "Motherboard"),
            ("power_supply", "Power supply"),
            ("other", "Other"),
        ],
        EnumKind::ComponentCondition => &[
            ("good", "Good"),
            ("damaged", "Damaged"),
            ("scrapped", "Scrapped"),
        ],
        EnumKind::Department => &[],
    };
    pairs
        .iter()
        .map(|(value, label)| EnumOption::new(*value, *label))
        .collect()
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
