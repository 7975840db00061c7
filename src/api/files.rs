use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::api::{CvrFileSummary, FileModeSummary},
    service::CvrService,
};

pub fn routes() -> Vec<Route> {
    routes![list_cvr_files, clear_cvr_files, current_mode]
}

#[get("/cvr-files")]
async fn list_cvr_files(service: &State<CvrService>) -> Result<Json<Vec<CvrFileSummary>>> {
    Ok(Json(service.list_cvr_files().await?))
}

/// Delete all cast vote record data, unlocking the file mode.
#[delete("/cvr-files")]
async fn clear_cvr_files(service: &State<CvrService>) -> Result<()> {
    service.clear_all().await?;
    Ok(())
}

#[get("/cvr-files/mode")]
async fn current_mode(service: &State<CvrService>) -> Result<Json<FileModeSummary>> {
    let file_mode = service.current_mode().await?;
    Ok(Json(FileModeSummary { file_mode }))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
    };

    use super::*;

    use crate::{
        api::exports::tests::import_example,
        model::common::FileMode,
    };

    async fn mode(client: &Client) -> FileMode {
        let response = client.get(uri!(current_mode)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        response
            .into_json::<FileModeSummary>()
            .await
            .unwrap()
            .file_mode
    }

    #[backend_test]
    async fn clear_unlocks_mode(client: Client) {
        assert_eq!(mode(&client).await, FileMode::Unlocked);

        import_example(&client).await;
        assert_eq!(mode(&client).await, FileMode::Test);

        let response = client.get(uri!(list_cvr_files)).dispatch().await;
        let files: Vec<CvrFileSummary> = response.into_json().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].num_cvrs_imported, 3);
        assert!(files[0].is_test_mode);

        let response = client
            .delete(uri!(clear_cvr_files))
            .header(ContentType::JSON)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(mode(&client).await, FileMode::Unlocked);

        let response = client.get(uri!(list_cvr_files)).dispatch().await;
        let files: Vec<CvrFileSummary> = response.into_json().await.unwrap();
        assert!(files.is_empty());
    }
}
