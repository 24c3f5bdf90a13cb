//! Declarative stage definitions and their load status.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use futures::future::BoxFuture;
use shared::{
    domain::{EnumKind, PlanId},
    protocol::{EnumOption, ListItem, PlanDetail},
};

use crate::{error::LoadError, filter::FilterCriteria};

pub type EnumCatalog = BTreeMap<EnumKind, Vec<EnumOption>>;

/// Snapshot of page inputs handed to a loader when its stage fires.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadContext {
    pub criteria: FilterCriteria,
    pub selected: Option<PlanId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StagePayload {
    List(Vec<ListItem>),
    Enums(EnumCatalog),
    Detail(PlanDetail),
    Custom(serde_json::Value),
}

pub type StageLoader =
    Arc<dyn Fn(LoadContext) -> BoxFuture<'static, anyhow::Result<StagePayload>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Unstarted,
    Loading,
    Loaded,
    Failed,
}

pub struct Stage {
    name: String,
    loader: StageLoader,
    state: StageState,
    last_error: Option<LoadError>,
    before_load: Option<(StageState, Option<LoadError>)>,
}

impl Stage {
    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == StageState::Loading
    }

    pub fn is_loaded(&self) -> bool {
        self.state == StageState::Loaded
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        self.last_error.as_ref()
    }

    pub fn loader(&self) -> StageLoader {
        Arc::clone(&self.loader)
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct StageRegistry {
    stages: HashMap<String, Stage>,
    order: Vec<String>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        loader: StageLoader,
    ) -> Result<(), LoadError> {
        let name = name.into();
        if self.stages.contains_key(&name) {
            return Err(LoadError::DuplicateStage(name));
        }
        self.order.push(name.clone());
        self.stages.insert(
            name.clone(),
            Stage {
                name,
                loader,
                state: StageState::Unstarted,
                last_error: None,
                before_load: None,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Stage names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn any_loading(&self) -> bool {
        self.stages.values().any(Stage::is_loading)
    }

    pub fn mark_loading(&mut self, name: &str) -> Result<(), LoadError> {
        let stage = self.stage_mut(name)?;
        if stage.state != StageState::Loading {
            stage.before_load = Some((stage.state, stage.last_error.take()));
        }
        stage.state = StageState::Loading;
        stage.last_error = None;
        Ok(())
    }

    pub fn mark_loaded(&mut self, name: &str) -> Result<(), LoadError> {
        let stage = self.stage_mut(name)?;
        stage.state = StageState::Loaded;
        stage.last_error = None;
        stage.before_load = None;
        Ok(())
    }

    pub fn mark_error(&mut self, name: &str, err: LoadError) -> Result<(), LoadError> {
        let stage = self.stage_mut(name)?;
        stage.state = StageState::Failed;
        stage.last_error = Some(err);
        stage.before_load = None;
        Ok(())
    }

    pub fn reset(&mut self, name: &str) -> Result<(), LoadError> {
        let stage = self.stage_mut(name)?;
        stage.state = StageState::Unstarted;
        stage.last_error = None;
        stage.before_load = None;
        Ok(())
    }

    /// Puts every loading stage back to the state it had before its load
    /// began. Returns how many stages were rolled back.
    pub fn abandon_loading(&mut self) -> usize {
        let mut abandoned = 0;
        for stage in self.stages.values_mut().filter(|stage| stage.is_loading()) {
            let (state, last_error) = stage
                .before_load
                .take()
                .unwrap_or((StageState::Unstarted, None));
            stage.state = state;
            stage.last_error = last_error;
            abandoned += 1;
        }
        abandoned
    }

    fn stage_mut(&mut self, name: &str) -> Result<&mut Stage, LoadError> {
        self.stages
            .get_mut(name)
            .ok_or_else(|| LoadError::UnknownStage(name.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/stage_tests.rs"]
mod tests;
