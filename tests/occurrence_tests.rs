mod common;

use axum::http::StatusCode;
use common::{
    CLOSED_SOLVED, CLOSED_UNSOLVED, IN_PROGRESS, MultipartForm, REGISTERED, REJECTED,
    RecordingMailer, TestApp,
};
use serde_json::json;

#[tokio::test]
async fn test_create_occurrence_with_images() {
    let app = TestApp::spawn().await;
    let (user_id, cookie) = app.citizen("Ana", "ana@example.com").await;

    let form = MultipartForm::new()
        .text("title", "Poste apagado")
        .text("description", "Poste sem luz há uma semana")
        .text("address", "Av. Paulista, 1000")
        .text("latitude", "-23.5614")
        .text("longitude", "-46.6559")
        .file("images", "poste.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF])
        .file("images", "", "application/octet-stream", &[]);
    let response = app.send(form.into_request("/api/occurrences", &cookie)).await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    let occurrence = response.data();
    assert_eq!(occurrence["status"], "Registrada");
    assert_eq!(occurrence["user_id"].as_i64(), Some(user_id));
    assert_eq!(occurrence["reporter_name"], "Ana");
    assert_eq!(occurrence["latitude"], -23.5614);
    assert!(occurrence["finalized_on"].is_null());

    let images = occurrence["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert!(images[0].as_str().unwrap().starts_with("/uploads/"));

    let mine = app.get("/api/occurrences/mine", &cookie).await;
    assert_eq!(mine.data().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_occurrence_validation() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.citizen("Ana", "ana@example.com").await;

    let missing_title = MultipartForm::new()
        .text("description", "Sem título")
        .text("address", "Rua A")
        .text("latitude", "-23.5")
        .text("longitude", "-46.6");
    let response = app
        .send(missing_title.into_request("/api/occurrences", &cookie))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let missing_coordinates = MultipartForm::new()
        .text("title", "Buraco")
        .text("description", "Buraco na via")
        .text("address", "Rua A");
    let response = app
        .send(missing_coordinates.into_request("/api/occurrences", &cookie))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let bad_image = MultipartForm::new()
        .text("title", "Buraco")
        .text("description", "Buraco na via")
        .text("address", "Rua A")
        .text("latitude", "-23.5")
        .text("longitude", "-46.6")
        .file("images", "script.sh", "text/plain", b"echo hi");
    let response = app
        .send(bad_image.into_request("/api/occurrences", &cookie))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let mine = app.get("/api/occurrences/mine", &cookie).await;
    assert!(mine.data().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_citizens_cannot_moderate() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.citizen("Ana", "ana@example.com").await;
    let id = app.create_occurrence(&cookie, "Lixo acumulado").await.data()["id"]
        .as_i64()
        .unwrap();

    let response = app.set_status(&cookie, id, IN_PROGRESS, None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.get("/api/occurrences", &cookie).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request("DELETE", &format!("/api/occurrences/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_points_follow_status_changes() {
    let app = TestApp::spawn().await;
    let (_, citizen) = app.citizen("Ana", "ana@example.com").await;
    let moderator = app.moderator("mod@example.com").await;

    let id = app.create_occurrence(&citizen, "Semáforo quebrado").await.data()["id"]
        .as_i64()
        .unwrap();

    let response = app.set_status(&moderator, id, IN_PROGRESS, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.data()["finalized_on"].is_null());
    assert_eq!(app.me(&citizen).await["points"], 25);

    let response = app.set_status(&moderator, id, CLOSED_SOLVED, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.data()["finalized_on"].is_string());
    assert_eq!(response.data()["point_type"], "solved");
    assert_eq!(app.me(&citizen).await["points"], 50);

    // Same status: no side effects.
    let response = app.set_status(&moderator, id, CLOSED_SOLVED, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.me(&citizen).await["points"], 50);

    let response = app.set_status(&moderator, id, IN_PROGRESS, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.data()["finalized_on"].is_null());
    assert!(response.data()["rejection_justification"].is_null());
    assert_eq!(app.me(&citizen).await["points"], 25);

    let response = app.set_status(&moderator, id, CLOSED_UNSOLVED, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.data()["finalized_on"].is_null());
    assert_eq!(app.me(&citizen).await["points"], 0);
}

#[tokio::test]
async fn test_rejection_requires_justification() {
    let app = TestApp::spawn().await;
    let (_, citizen) = app.citizen("Ana", "ana@example.com").await;
    let moderator = app.moderator("mod@example.com").await;
    let id = app.create_occurrence(&citizen, "Calçada quebrada").await.data()["id"]
        .as_i64()
        .unwrap();

    let response = app.set_status(&moderator, id, REJECTED, Some("   ")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.set_status(&moderator, id, REJECTED, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let occurrence = app.get(&format!("/api/occurrences/{id}"), &moderator).await;
    assert_eq!(occurrence.data()["status_id"], REGISTERED);
    assert!(occurrence.data()["finalized_on"].is_null());

    let me = app.get("/api/users/me", &citizen).await;
    assert_eq!(me.data()["rejection_streak_count"], 0);
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_three_rejections_block_the_reporter() {
    let app = TestApp::spawn().await;
    let (user_id, citizen) = app.citizen("Ana", "ana@example.com").await;
    let moderator = app.moderator("mod@example.com").await;

    let mut ids = Vec::new();
    for title in ["Buraco 1", "Buraco 2", "Buraco 3"] {
        ids.push(
            app.create_occurrence(&citizen, title).await.data()["id"]
                .as_i64()
                .unwrap(),
        );
    }

    for id in &ids[..2] {
        let response = app
            .set_status(&moderator, *id, REJECTED, Some("duplicate report"))
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app
        .set_status(&moderator, ids[2], REJECTED, Some("duplicate report"))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let occurrence = response.data();
    assert_eq!(occurrence["status"], "Recusada");
    assert_eq!(occurrence["rejection_justification"], "duplicate report");
    assert!(occurrence["finalized_on"].is_string());

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|(to, _)| to == "ana@example.com"));
    assert!(!sent[1].1.body.contains("Sua conta foi bloqueada"));
    assert!(sent[2].1.body.contains("Sua conta foi bloqueada"));
    assert!(sent[2].1.body.contains("duplicate report"));

    let history = app
        .get(&format!("/api/occurrences/{}/notifications", ids[2]), &moderator)
        .await;
    assert_eq!(history.status, StatusCode::OK);
    let history = history.data().as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["recipient_email"], "ana@example.com");

    // The open session is rejected and new logins are refused.
    let me = app.get("/api/auth/me", &citizen).await;
    assert_eq!(me.status, StatusCode::FORBIDDEN);
    let login = app.login("ana@example.com", "secret123").await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);

    let admin = app.admin_session().await;
    let users = app.get("/api/users?search=ana@", &admin).await;
    let ana = users
        .data()
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["id"].as_i64() == Some(user_id))
        .unwrap()
        .clone();
    assert_eq!(ana["is_blocked"], true);
    assert_eq!(ana["rejection_streak_count"], 3);
    assert_eq!(ana["points"], 0);

    // Reversing a rejection to solved lowers the streak and unblocks.
    let response = app.set_status(&moderator, ids[2], CLOSED_SOLVED, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.data()["rejection_justification"].is_null());

    let login = app.login("ana@example.com", "secret123").await;
    assert_eq!(login.status, StatusCode::OK);
    let me = app.get("/api/users/me", &login.cookie.unwrap()).await;
    assert_eq!(me.data()["is_blocked"], false);
    assert_eq!(me.data()["rejection_streak_count"], 2);
    assert_eq!(me.data()["points"], 50);
}

#[tokio::test]
async fn test_mail_failure_does_not_roll_back_rejection() {
    let app = TestApp::spawn_with(RecordingMailer::failing()).await;
    let (_, citizen) = app.citizen("Ana", "ana@example.com").await;
    let moderator = app.moderator("mod@example.com").await;
    let id = app.create_occurrence(&citizen, "Árvore caída").await.data()["id"]
        .as_i64()
        .unwrap();

    let response = app
        .set_status(&moderator, id, REJECTED, Some("outside coverage area"))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "Recusada");

    let history = app
        .get(&format!("/api/occurrences/{id}/notifications"), &moderator)
        .await;
    assert!(history.data().as_array().unwrap().is_empty());

    let me = app.get("/api/users/me", &citizen).await;
    assert_eq!(me.data()["rejection_streak_count"], 1);
}

#[tokio::test]
async fn test_listing_and_filters() {
    let app = TestApp::spawn().await;
    let (_, citizen) = app.citizen("Ana", "ana@example.com").await;
    let moderator = app.moderator("mod@example.com").await;

    let first = app.create_occurrence(&citizen, "Primeira").await.data()["id"]
        .as_i64()
        .unwrap();
    let second = app.create_occurrence(&citizen, "Segunda").await.data()["id"]
        .as_i64()
        .unwrap();
    app.set_status(&moderator, first, CLOSED_SOLVED, None).await;

    let all = app.get("/api/occurrences", &moderator).await;
    let all = all.data().as_array().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["id"].as_i64(), Some(second));

    let solved = app
        .get(&format!("/api/occurrences?status_id={CLOSED_SOLVED}"), &moderator)
        .await;
    let solved = solved.data().as_array().unwrap();
    assert_eq!(solved.len(), 1);
    assert_eq!(solved[0]["id"].as_i64(), Some(first));

    let active = app.get("/api/occurrences/active", &citizen).await;
    let active = active.data().as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"].as_i64(), Some(second));
}

#[tokio::test]
async fn test_edit_and_delete_occurrence() {
    let app = TestApp::spawn().await;
    let (_, citizen) = app.citizen("Ana", "ana@example.com").await;
    let moderator = app.moderator("mod@example.com").await;
    let id = app.create_occurrence(&citizen, "Título antigo").await.data()["id"]
        .as_i64()
        .unwrap();

    let response = app
        .request(
            "PUT",
            &format!("/api/occurrences/{id}"),
            Some(&moderator),
            Some(json!({
                "title": "Título novo",
                "status_id": REGISTERED,
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["title"], "Título novo");

    let response = app
        .request(
            "PUT",
            &format!("/api/occurrences/{id}"),
            Some(&moderator),
            Some(json!({ "status_id": REGISTERED, "agency_id": 999 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("DELETE", &format!("/api/occurrences/{id}"), Some(&moderator), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.get(&format!("/api/occurrences/{id}"), &moderator).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.set_status(&moderator, id, IN_PROGRESS, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
