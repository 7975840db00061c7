use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::api::{AggregateResult, TabulationRequest},
    service::CvrService,
};

pub fn routes() -> Vec<Route> {
    routes![tabulate]
}

/// Tally the records matching the filter, split into the requested groups.
#[post("/tabulation", data = "<request>", format = "json")]
async fn tabulate(
    service: &State<CvrService>,
    request: Json<TabulationRequest>,
) -> Result<Json<AggregateResult>> {
    let TabulationRequest { filter, group_by } = request.into_inner();
    let results = service.tabulate(filter, group_by).await?;
    Ok(Json((*results).clone()))
}
