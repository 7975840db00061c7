use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::{ImportRequest, ImportSummary},
        cvr::CvrExportMetadata,
    },
    service::CvrService,
};

pub fn routes() -> Vec<Route> {
    routes![list_exports, import_export]
}

/// Exports for the current election on the inserted media, newest first.
#[get("/cvr-exports")]
async fn list_exports(service: &State<CvrService>) -> Result<Json<Vec<CvrExportMetadata>>> {
    Ok(Json(service.list_exports().await?))
}

#[post("/cvr-exports/import", data = "<request>", format = "json")]
async fn import_export(
    service: &State<CvrService>,
    request: Json<ImportRequest>,
) -> Result<Json<ImportSummary>> {
    let summary = service.import_export(&request.path).await?;
    Ok(Json(summary))
}

#[cfg(test)]
pub(crate) mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
    };
    use serde_json::{json, Value};

    use super::*;

    /// Import the single example export offered to test clients.
    pub(crate) async fn import_example(client: &Client) -> ImportSummary {
        let exports: Vec<CvrExportMetadata> = client
            .get(uri!(list_exports))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        client
            .post(uri!(import_export))
            .header(ContentType::JSON)
            .body(json!({ "path": exports[0].path }).to_string())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap()
    }

    #[backend_test]
    async fn list_and_import(client: Client) {
        let response = client.get(uri!(list_exports)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let exports: Vec<CvrExportMetadata> = response.into_json().await.unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].cvr_count, 3);

        let request = json!({ "path": exports[0].path });
        let response = client
            .post(uri!(import_export))
            .header(ContentType::JSON)
            .body(request.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let summary: ImportSummary = response.into_json().await.unwrap();
        assert_eq!(summary.newly_added, 3);
        assert!(!summary.was_existing_file);

        let response = client
            .post(uri!(import_export))
            .header(ContentType::JSON)
            .body(request.to_string())
            .dispatch()
            .await;
        let summary: ImportSummary = response.into_json().await.unwrap();
        assert!(summary.was_existing_file);
        assert_eq!(summary.already_present, 3);
    }

    #[backend_test]
    async fn unknown_export_is_rejected(client: Client) {
        let response = client
            .post(uri!(import_export))
            .header(ContentType::JSON)
            .body(json!({ "path": "/media/nothing-here" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["type"], "metadata-file-not-found");
    }
}
