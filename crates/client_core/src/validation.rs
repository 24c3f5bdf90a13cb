//! Form-level checks run before a mutation reaches the network.

use shared::{
    domain::PlanId,
    protocol::{Mutation, PlanDraft},
};

use crate::error::LoadError;

pub fn validate_mutation(mutation: &Mutation) -> Result<(), LoadError> {
    match mutation {
        Mutation::Create(draft) => validate_draft(draft),
        Mutation::Update(id, draft) => {
            validate_plan_id(*id)?;
            validate_draft(draft)
        }
        Mutation::Delete(id) => validate_plan_id(*id),
    }
}

pub fn validate_draft(draft: &PlanDraft) -> Result<(), LoadError> {
    if draft.asset_id.is_none() {
        return Err(LoadError::validation("asset_id", "an asset must be selected"));
    }
    if draft
        .operator
        .as_deref()
        .map_or(true, |operator| operator.trim().is_empty())
    {
        return Err(LoadError::validation("operator", "operator is required"));
    }
    if draft.components.is_empty() {
        return Err(LoadError::validation(
            "components",
            "at least one component is required",
        ));
    }
    for (index, component) in draft.components.iter().enumerate() {
        if component.name.trim().is_empty() {
            return Err(LoadError::validation(
                "components",
                format!("component {} is missing a name", index + 1),
            ));
        }
        if component.component_type.trim().is_empty() {
            return Err(LoadError::validation(
                "components",
                format!("component {} is missing a type", index + 1),
            ));
        }
        if component.quantity == 0 {
            return Err(LoadError::validation(
                "components",
                format!("component {} must have a quantity of at least 1", index + 1),
            ));
        }
    }
    Ok(())
}

fn validate_plan_id(id: PlanId) -> Result<(), LoadError> {
    if id.0 <= 0 {
        return Err(LoadError::validation("id", format!("invalid plan id {}", id.0)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use shared::{domain::AssetId, protocol::ComponentLine};

    use super::*;

    fn valid_draft() -> PlanDraft {
        PlanDraft {
            asset_id: Some(AssetId(4)),
            department_id: None,
            operator: Some("chen".into()),
            remark: None,
            components: vec![ComponentLine {
                component_type: "memory".into(),
                name: "16GB DDR4 RAM".into(),
                serial_no: None,
                condition: "good".into(),
                quantity: 2,
            }],
        }
    }

    #[test]
    fn accepts_complete_draft() {
        assert_eq!(validate_mutation(&Mutation::Create(valid_draft())), Ok(()));
    }

    #[test]
    fn rejects_missing_asset() {
        let mut draft = valid_draft();
        draft.asset_id = None;
        let err = validate_mutation(&Mutation::Create(draft)).expect_err("must fail");
        assert!(matches!(err, LoadError::Validation { field: "asset_id", .. }));
    }

    #[test]
    fn rejects_blank_operator_and_empty_components() {
        let mut draft = valid_draft();
        draft.operator = Some("   ".into());
        assert!(matches!(
            validate_draft(&draft),
            Err(LoadError::Validation { field: "operator", .. })
        ));

        let mut draft = valid_draft();
        draft.components.clear();
        assert!(matches!(
            validate_draft(&draft),
            Err(LoadError::Validation { field: "components", .. })
        ));
    }

    #[test]
    fn rejects_zero_quantity_component() {
        let mut draft = valid_draft();
        draft.components[0].quantity = 0;
        let err = validate_draft(&draft).expect_err("must fail");
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn rejects_non_positive_ids() {
        assert!(validate_mutation(&Mutation::Delete(PlanId(0))).is_err());
        assert!(validate_mutation(&Mutation::Update(PlanId(-3), valid_draft())).is_err());
        assert_eq!(validate_mutation(&Mutation::Delete(PlanId(9))), Ok(()));
    }
}
