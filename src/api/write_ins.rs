use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{api::WriteInSummary, common::WriteInAdjudication, mongodb::Id},
    service::CvrService,
};

pub fn routes() -> Vec<Route> {
    routes![list_write_ins, adjudicate_write_in]
}

#[get("/write-ins")]
async fn list_write_ins(service: &State<CvrService>) -> Result<Json<Vec<WriteInSummary>>> {
    Ok(Json(service.list_write_ins().await?))
}

#[post("/write-ins/<write_in_id>/adjudication", data = "<adjudication>", format = "json")]
async fn adjudicate_write_in(
    service: &State<CvrService>,
    write_in_id: Id,
    adjudication: Json<WriteInAdjudication>,
) -> Result<()> {
    service
        .adjudicate_write_in(write_in_id, adjudication.into_inner())
        .await?;
    Ok(())
}
