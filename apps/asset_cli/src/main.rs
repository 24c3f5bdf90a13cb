use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use client_core::{
    config::load_settings, FilterCriteria, HttpAssetService, ProgressiveController, SortOrder,
    TriggerOutcome,
};
use shared::{
    domain::{EnumKind, PlanId},
    protocol::{ListItem, Mutation},
};
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides the configured API base url.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    department: Option<String>,
    /// Sort field, prefix with '-' for descending (e.g. -created_at).
    #[arg(long)]
    sort: Option<String>,
    /// Opens the plan editor for this id and prints its detail.
    #[arg(long)]
    open: Option<i64>,
    #[arg(long)]
    delete: Option<i64>,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.server_url.clone() {
        settings.api_base_url = url;
    }
    info!(api = %settings.api_base_url, "starting asset client");

    let service = Arc::new(HttpAssetService::new(&settings)?);
    let controller = ProgressiveController::new(service, settings.search_debounce());

    let result = run(&controller, &args).await;
    controller.on_unmount();
    result
}

async fn run(controller: &Arc<ProgressiveController>, args: &Args) -> Result<()> {
    let mut criteria = FilterCriteria::default().with_search(args.search.clone());
    criteria.status = args.status.clone();
    if let Some(department) = &args.department {
        criteria = criteria.with_filter("department", department.clone());
    }
    criteria.sort = args.sort.as_deref().map(parse_sort);

    if let TriggerOutcome::Failed(err) = controller.search_now(criteria).await {
        bail!("failed to load decomposition plans: {err}");
    }
    print_rows(&controller.visible_rows(), args.json)?;

    if let Some(id) = args.open {
        let (_, detail) = controller.open_modal(PlanId(id)).await;
        if let TriggerOutcome::Failed(err) = detail {
            bail!("failed to load plan {id}: {err}");
        }
        if let Some(detail) = controller.detail() {
            let conditions = controller.enum_options(EnumKind::ComponentCondition);
            println!("plan {} ({})", detail.plan.plan_no, detail.plan.asset_name);
            for component in &detail.components {
                let condition = conditions
                    .iter()
                    .find(|option| option.value == component.condition)
                    .map_or(component.condition.as_str(), |option| option.label.as_str());
                println!(
                    "  {:<12} {:<28} x{:<3} {}",
                    component.component_type, component.name, component.quantity, condition
                );
            }
        }
        controller.close_modal();
    }

    if let Some(id) = args.delete {
        controller.submit(Mutation::Delete(PlanId(id))).await?;
        println!("deleted plan {id}");
        print_rows(&controller.visible_rows(), args.json)?;
    }

    Ok(())
}

fn parse_sort(raw: &str) -> SortOrder {
    match raw.strip_prefix('-') {
        Some(field) => SortOrder::descending(field),
        None => SortOrder::ascending(raw),
    }
}

fn print_rows(rows: &[ListItem], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    println!("{} plan(s)", rows.len());
    for row in rows {
        println!(
            "{:>6}  {:<14} {:<10} {:<28} {}",
            row.id.0,
            row.plan_no,
            row.status.as_str(),
            row.asset_name,
            row.department.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
