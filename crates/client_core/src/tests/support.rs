//! Scripted `AssetService` double and fixtures shared by controller tests.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{AssetId, EnumKind, PlanId, PlanStatus},
    protocol::{ComponentLine, DecompositionPlan, EnumOption, ListItem, Mutation, PlanDetail},
};
use tokio::sync::{oneshot, Mutex};

use crate::{filter::FilterCriteria, service::AssetService};

pub(crate) type Reply<T> = std::result::Result<T, String>;

enum Scripted<T> {
    Ready(Reply<T>),
    Deferred(oneshot::Receiver<Reply<T>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Result<T> {
        let reply = match self {
            Scripted::Ready(reply) => reply,
            Scripted::Deferred(rx) => rx.await.map_err(|_| anyhow!("reply dropped"))?,
        };
        reply.map_err(|message| anyhow!(message))
    }
}

pub(crate) struct ScriptedService {
    lists: Mutex<VecDeque<Scripted<Vec<ListItem>>>>,
    details: Mutex<VecDeque<Scripted<PlanDetail>>>,
    failing_enums: HashSet<EnumKind>,
    mutate_failure: Option<String>,
    pub list_calls: Arc<Mutex<Vec<FilterCriteria>>>,
    pub detail_calls: Arc<Mutex<Vec<PlanId>>>,
    pub enum_calls: Arc<Mutex<Vec<EnumKind>>>,
    pub mutations: Arc<Mutex<Vec<Mutation>>>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self {
            lists: Mutex::new(VecDeque::new()),
            details: Mutex::new(VecDeque::new()),
            failing_enums: HashSet::new(),
            mutate_failure: None,
            list_calls: Arc::new(Mutex::new(Vec::new())),
            detail_calls: Arc::new(Mutex::new(Vec::new())),
            enum_calls: Arc::new(Mutex::new(Vec::new())),
            mutations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn with_failing_enum(mut self, kind: EnumKind) -> Self {
        self.failing_enums.insert(kind);
        self
    }

    pub(crate) fn with_mutate_failure(mut self, message: impl Into<String>) -> Self {
        self.mutate_failure = Some(message.into());
        self
    }

    pub(crate) async fn push_list(&self, reply: Reply<Vec<ListItem>>) {
        self.lists.lock().await.push_back(Scripted::Ready(reply));
    }

    pub(crate) async fn defer_list(&self) -> oneshot::Sender<Reply<Vec<ListItem>>> {
        let (tx, rx) = oneshot::channel();
        self.lists.lock().await.push_back(Scripted::Deferred(rx));
        tx
    }

    pub(crate) async fn defer_detail(&self) -> oneshot::Sender<Reply<PlanDetail>> {
        let (tx, rx) = oneshot::channel();
        self.details.lock().await.push_back(Scripted::Deferred(rx));
        tx
    }

    pub(crate) async fn list_call_count(&self) -> usize {
        self.list_calls.lock().await.len()
    }
}

#[async_trait]
impl AssetService for ScriptedService {
    async fn fetch_list(&self, criteria: &FilterCriteria) -> Result<Vec<ListItem>> {
        self.list_calls.lock().await.push(criteria.clone());
        let next = self.lists.lock().await.pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_enum(&self, kind: EnumKind) -> Result<Vec<EnumOption>> {
        self.enum_calls.lock().await.push(kind);
        if self.failing_enums.contains(&kind) {
            return Err(anyhow!("enum endpoint unavailable"));
        }
        Ok(vec![EnumOption::new(
            format!("{}-remote", kind.as_path()),
            "Remote",
        )])
    }

    async fn fetch_detail(&self, id: PlanId) -> Result<PlanDetail> {
        self.detail_calls.lock().await.push(id);
        let next = self.details.lock().await.pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Ok(detail(id)),
        }
    }

    async fn mutate(&self, mutation: Mutation) -> Result<()> {
        self.mutations.lock().await.push(mutation);
        match &self.mutate_failure {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

pub(crate) fn plan(id: i64, asset_name: &str, status: PlanStatus) -> DecompositionPlan {
    DecompositionPlan {
        id: PlanId(id),
        plan_no: format!("DP-2024-{id:04}"),
        asset_id: AssetId(100 + id),
        asset_code: format!("PC-{id:03}"),
        asset_name: asset_name.to_string(),
        status,
        department: Some("IT Operations".to_string()),
        operator: Some("chen".to_string()),
        remark: None,
        created_at: Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
            + chrono::Duration::hours(id),
    }
}

pub(crate) fn detail(id: PlanId) -> PlanDetail {
    PlanDetail {
        plan: plan(id.0, "Dell OptiPlex 7080", PlanStatus::InProgress),
        components: vec![ComponentLine {
            component_type: "memory".to_string(),
            name: "16GB DDR4 RAM".to_string(),
            serial_no: Some(format!("RAM-{}", id.0)),
            condition: "good".to_string(),
            quantity: 2,
        }],
    }
}
