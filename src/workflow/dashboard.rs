use crate::errors::AppError;
use crate::models::dashboard::{Dashboard, DashboardQuery};
use crate::store::sqlite::SqliteStore;

/// Filtered request list plus counts over the whole table. The counts and
/// the project/unit choice lists never depend on the filters.
pub async fn load(db: &SqliteStore, query: DashboardQuery) -> Result<Dashboard, AppError> {
    let stats = db.status_counts().await?;
    let requests = db.list_requests(&query).await?;
    let projects = db.distinct_projects().await?;
    let units = db.distinct_units().await?;

    tracing::debug!(
        filter = ?query.filter,
        sort = ?query.sort,
        matched = requests.len(),
        total = stats.total,
        "dashboard loaded"
    );

    Ok(Dashboard {
        stats,
        requests,
        projects,
        units,
        active: query,
    })
}
