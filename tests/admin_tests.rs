mod common;

use axum::http::StatusCode;
use common::{CLOSED_SOLVED, IN_PROGRESS, REGISTERED, TestApp};
use serde_json::json;

fn agency(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "email": "contato@prefeitura.sp.gov.br",
        "phone": "(11) 3333-0000",
    })
}

#[tokio::test]
async fn test_agency_crud() {
    let app = TestApp::spawn().await;
    let moderator = app.moderator("mod@example.com").await;
    let (_, citizen) = app.citizen("Ana", "ana@example.com").await;

    let response = app
        .request("POST", "/api/agencies", Some(&citizen), Some(agency("Sabesp")))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request("POST", "/api/agencies", Some(&moderator), Some(agency("Sabesp")))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let id = response.data()["id"].as_i64().unwrap();

    let response = app
        .request(
            "POST",
            "/api/agencies",
            Some(&moderator),
            Some(json!({ "name": "", "email": "x@y.com", "phone": "1" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "PUT",
            &format!("/api/agencies/{id}"),
            Some(&moderator),
            Some(agency("Sabesp Centro")),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["name"], "Sabesp Centro");

    let listed = app.get("/api/agencies", &citizen).await;
    assert_eq!(listed.data().as_array().unwrap().len(), 1);

    let response = app
        .request("DELETE", &format!("/api/agencies/{id}"), Some(&moderator), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.get(&format!("/api/agencies/{id}"), &moderator).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_agency_unassigns_occurrences() {
    let app = TestApp::spawn().await;
    let moderator = app.moderator("mod@example.com").await;
    let (_, citizen) = app.citizen("Ana", "ana@example.com").await;

    let agency_id = app
        .request("POST", "/api/agencies", Some(&moderator), Some(agency("CET")))
        .await
        .data()["id"]
        .as_i64()
        .unwrap();
    let occurrence_id = app.create_occurrence(&citizen, "Semáforo").await.data()["id"]
        .as_i64()
        .unwrap();

    let response = app
        .request(
            "PUT",
            &format!("/api/occurrences/{occurrence_id}"),
            Some(&moderator),
            Some(json!({ "status_id": IN_PROGRESS, "agency_id": agency_id })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["agency_name"], "CET");

    app.request(
        "DELETE",
        &format!("/api/agencies/{agency_id}"),
        Some(&moderator),
        None,
    )
    .await;

    let occurrence = app
        .get(&format!("/api/occurrences/{occurrence_id}"), &moderator)
        .await;
    assert_eq!(occurrence.status, StatusCode::OK);
    assert!(occurrence.data()["agency_id"].is_null());
    assert_eq!(occurrence.data()["status_id"], IN_PROGRESS);
}

#[tokio::test]
async fn test_admin_user_management() {
    let app = TestApp::spawn().await;
    let admin = app.admin_session().await;
    let (ana_id, ana) = app.citizen("Ana", "ana@example.com").await;

    let response = app.get("/api/users", &ana).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.get("/api/users?search=ana", &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data().as_array().unwrap().len(), 1);

    let response = app
        .request(
            "PUT",
            &format!("/api/users/{ana_id}"),
            Some(&admin),
            Some(json!({
                "name": "Ana Souza",
                "email": "admin@example.com",
                "profile_id": 1,
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app
        .request(
            "PUT",
            &format!("/api/users/{ana_id}"),
            Some(&admin),
            Some(json!({
                "name": "Ana Souza",
                "email": "ana@example.com",
                "profile_id": 42,
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let profiles = app.get("/api/profiles", &admin).await;
    assert_eq!(profiles.data().as_array().unwrap().len(), 3);

    let me = app.get("/api/auth/me", &admin).await;
    let admin_id = me.data()["id"].as_i64().unwrap();
    let response = app
        .request("DELETE", &format!("/api/users/{admin_id}"), Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    app.create_occurrence(&ana, "Vazamento").await;
    let response = app
        .request("DELETE", &format!("/api/users/{ana_id}"), Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let (bruno_id, _) = app.citizen("Bruno", "bruno@example.com").await;
    let response = app
        .request("DELETE", &format!("/api/users/{bruno_id}"), Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        app.login("bruno@example.com", "secret123").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_update_own_profile() {
    let app = TestApp::spawn().await;
    let (_, ana) = app.citizen("Ana", "ana@example.com").await;

    let response = app
        .request(
            "PUT",
            "/api/users/me",
            Some(&ana),
            Some(json!({
                "name": "Ana Lima",
                "phone": "(11) 99999-0000",
                "avatar_url": "/uploads/avatar.png",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["name"], "Ana Lima");
    assert_eq!(response.data()["phone"], "(11) 99999-0000");

    let response = app
        .request(
            "PUT",
            "/api/users/me",
            Some(&ana),
            Some(json!({
                "new_password": "nova-senha",
                "confirm_new_password": "outra-senha",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "PUT",
            "/api/users/me",
            Some(&ana),
            Some(json!({
                "new_password": "nova-senha",
                "confirm_new_password": "nova-senha",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        app.login("ana@example.com", "nova-senha").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_ranking_orders_by_points() {
    let app = TestApp::spawn().await;
    let moderator = app.moderator("mod@example.com").await;
    let (ana_id, ana) = app.citizen("Ana", "ana@example.com").await;
    let (bruno_id, bruno) = app.citizen("Bruno", "bruno@example.com").await;

    let ana_occurrence = app.create_occurrence(&ana, "Buraco").await.data()["id"]
        .as_i64()
        .unwrap();
    let bruno_occurrence = app.create_occurrence(&bruno, "Poste").await.data()["id"]
        .as_i64()
        .unwrap();

    app.set_status(&moderator, ana_occurrence, IN_PROGRESS, None).await;
    app.set_status(&moderator, bruno_occurrence, CLOSED_SOLVED, None).await;
    app.set_status(&moderator, bruno_occurrence, REGISTERED, None).await;
    app.set_status(&moderator, bruno_occurrence, CLOSED_SOLVED, None).await;

    let ranking = app.get("/api/ranking", &ana).await;
    assert_eq!(ranking.status, StatusCode::OK);
    let entries = ranking.data().as_array().unwrap();

    assert_eq!(entries[0]["position"], 1);
    assert_eq!(entries[0]["user_id"].as_i64(), Some(bruno_id));
    assert_eq!(entries[0]["points"], 50);
    assert_eq!(entries[1]["user_id"].as_i64(), Some(ana_id));
    assert_eq!(entries[1]["points"], 25);
}

#[tokio::test]
async fn test_metrics_are_admin_only() {
    let app = TestApp::spawn().await;
    let moderator = app.moderator("mod@example.com").await;
    let admin = app.admin_session().await;

    let response = app.get("/api/metrics", &moderator).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.get("/api/metrics", &admin).await;
    assert_eq!(response.status, StatusCode::OK);
}
