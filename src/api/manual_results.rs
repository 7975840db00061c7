use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::{ManualResults, ManualResultsIdentifier, ManualResultsSummary},
        common::VotingMethod,
    },
    service::CvrService,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_manual_results,
        get_manual_results,
        set_manual_results,
        delete_manual_results,
        delete_all_manual_results,
    ]
}

fn identifier(
    precinct_id: String,
    ballot_style_id: String,
    voting_method: VotingMethod,
) -> ManualResultsIdentifier {
    ManualResultsIdentifier {
        precinct_id,
        ballot_style_id,
        voting_method,
    }
}

#[get("/manual-results")]
async fn list_manual_results(
    service: &State<CvrService>,
) -> Result<Json<Vec<ManualResultsSummary>>> {
    Ok(Json(service.list_manual_results().await?))
}

#[get("/manual-results/<precinct_id>/<ballot_style_id>/<voting_method>")]
async fn get_manual_results(
    service: &State<CvrService>,
    precinct_id: String,
    ballot_style_id: String,
    voting_method: VotingMethod,
) -> Result<Json<ManualResultsSummary>> {
    let identifier = identifier(precinct_id, ballot_style_id, voting_method);
    Ok(Json(service.get_manual_results(identifier).await?))
}

#[put(
    "/manual-results/<precinct_id>/<ballot_style_id>/<voting_method>",
    data = "<results>",
    format = "json"
)]
async fn set_manual_results(
    service: &State<CvrService>,
    precinct_id: String,
    ballot_style_id: String,
    voting_method: VotingMethod,
    results: Json<ManualResults>,
) -> Result<()> {
    let identifier = identifier(precinct_id, ballot_style_id, voting_method);
    service
        .set_manual_results(identifier, results.into_inner())
        .await?;
    Ok(())
}

#[delete("/manual-results/<precinct_id>/<ballot_style_id>/<voting_method>")]
async fn delete_manual_results(
    service: &State<CvrService>,
    precinct_id: String,
    ballot_style_id: String,
    voting_method: VotingMethod,
) -> Result<()> {
    let identifier = identifier(precinct_id, ballot_style_id, voting_method);
    service.delete_manual_results(identifier).await?;
    Ok(())
}

#[delete("/manual-results")]
async fn delete_all_manual_results(service: &State<CvrService>) -> Result<()> {
    service.delete_all_manual_results().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
    };
    use serde_json::json;

    use super::*;

    use crate::{
        api::exports::tests::import_example,
        model::api::{AggregateResult, GROUP_KEY_ROOT},
    };

    const ABSENTEE_P1: &str = "/manual-results/p1/1/absentee";

    async fn root(client: &Client) -> serde_json::Value {
        let results: AggregateResult = client
            .post("/tabulation")
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        serde_json::to_value(&results[GROUP_KEY_ROOT]).unwrap()
    }

    #[backend_test]
    async fn manual_results_lifecycle(client: Client) {
        import_example(&client).await;
        let before = root(&client).await;
        assert_eq!(before["cardCounts"]["manual"], 0);

        let response = client
            .put(ABSENTEE_P1)
            .header(ContentType::JSON)
            .body(
                json!({
                    "ballotCount": 4,
                    "contestResults": {
                        "mayor": {
                            "ballots": 4,
                            "overvotes": 0,
                            "undervotes": 1,
                            "tallies": { "alice": 1, "bob": 2 }
                        }
                    }
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let stored: ManualResultsSummary = client
            .get(ABSENTEE_P1)
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(stored.results.ballot_count, 4);
        assert_eq!(stored.identifier.voting_method, VotingMethod::Absentee);

        let after = root(&client).await;
        assert_eq!(after["cardCounts"]["manual"], 4);
        assert_eq!(
            after["contestResults"]["mayor"]["tallies"]["bob"],
            before["contestResults"]["mayor"]["tallies"]["bob"].as_u64().unwrap() + 2
        );

        let response = client.delete(ABSENTEE_P1).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let response = client.delete(ABSENTEE_P1).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(root(&client).await, before);
    }

    #[backend_test]
    async fn invalid_manual_results_rejected(client: Client) {
        let response = client
            .put("/manual-results/p1/3/precinct")
            .header(ContentType::JSON)
            .body(json!({ "ballotCount": 1 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["type"], "invalid-precinct-ballot-style");

        let response = client
            .put("/manual-results/p1/1/provisional")
            .header(ContentType::JSON)
            .body(json!({ "ballotCount": 1 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);

        let response = client.delete("/manual-results").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let listed: Vec<ManualResultsSummary> = client
            .get(uri!(list_manual_results))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
