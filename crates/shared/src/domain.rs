use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);
    };
}

id_newtype!(PlanId);
id_newtype!(AssetId);
id_newtype!(DepartmentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Reference-data families served by the enum endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumKind {
    PlanStatus,
    ComponentType,
    ComponentCondition,
    Department,
}

impl EnumKind {
    pub const ALL: [EnumKind; 4] = [
        EnumKind::PlanStatus,
        EnumKind::ComponentType,
        EnumKind::ComponentCondition,
        EnumKind::Department,
    ];

    pub fn as_path(self) -> &'static str {
        match self {
            Self::PlanStatus => "plan_status",
            Self::ComponentType => "component_type",
            Self::ComponentCondition => "component_condition",
            Self::Department => "department",
        }
    }
}
