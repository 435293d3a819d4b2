mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;

    let (status, body) = app.request("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn register_login_and_logout() {
    let app = TestApp::new().await;
    let token = app.register("فارس").await;

    let (status, me) = app.request("GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "فارس");
    assert!(me.get("password_hash").is_none());

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "فارس", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["token"].as_str().unwrap().to_string();

    let (status, _) = app.request("POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // The logged-out session is gone, the other one is not
    let (status, _) = app.request("GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.request("GET", "/api/users/me", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_failures_look_the_same() {
    let app = TestApp::new().await;
    app.register("فارس").await;

    let (wrong_status, wrong_password) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "فارس", "password": "password999" })),
        )
        .await;
    let (unknown_status, unknown_user) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "مجهول", "password": "password123" })),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn registration_rejects_bad_input() {
    let app = TestApp::new().await;
    app.register("فارس").await;

    let attempts = [
        (json!({ "username": "fares", "password": "password123" }), StatusCode::BAD_REQUEST),
        (json!({ "username": "سالم", "password": "short" }), StatusCode::BAD_REQUEST),
        (json!({ "username": "فارس", "password": "password123" }), StatusCode::CONFLICT),
    ];

    for (payload, expected) in attempts {
        let (status, body) = app.request("POST", "/api/auth/register", None, Some(payload)).await;
        assert_eq!(status, expected, "{body}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn voting_on_posts() {
    let app = TestApp::new().await;
    let token = app.register("فارس").await;
    let community = app.create_community(&token, "عام").await;
    let post = app.create_post(&token, community, "عنوان").await;
    let vote_uri = format!("/api/posts/{post}/vote");

    let (status, _) = app.request("POST", &vote_uri, None, Some(json!({ "value": 1 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request("POST", &vote_uri, Some(&token), Some(json!({ "value": 2 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request("POST", "/api/posts/9999/vote", Some(&token), Some(json!({ "value": 1 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut scores = Vec::new();
    for value in [1, 1, -1, 1] {
        let (status, body) = app
            .request("POST", &vote_uri, Some(&token), Some(json!({ "value": value })))
            .await;
        assert_eq!(status, StatusCode::OK);
        scores.push(body["score"].as_i64().unwrap());
    }

    // up, toggle off, down, flip back up
    assert_eq!(scores, vec![1, 0, -1, 1]);
}

#[tokio::test]
async fn post_page_nests_comments_and_shows_viewer_state() {
    let app = TestApp::new().await;
    let author = app.register("فارس").await;
    let reader = app.register("سالم").await;
    let community = app.create_community(&author, "عام").await;
    let post = app.create_post(&author, community, "عنوان").await;

    let first = app.comment(&reader, post, "أول", None).await;
    let reply = app.comment(&author, post, "رد", Some(first)).await;
    let second = app.comment(&reader, post, "ثاني", None).await;
    let nested = app.comment(&reader, post, "رد على الرد", Some(reply)).await;

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/comments/{reply}/vote"),
            Some(&reader),
            Some(json!({ "value": -1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, page) = app
        .request("GET", &format!("/api/posts/{post}"), Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let roots = page["comments"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["id"], first);
    assert_eq!(roots[1]["id"], second);
    assert_eq!(roots[0]["children"][0]["id"], reply);
    assert_eq!(roots[0]["children"][0]["children"][0]["id"], nested);
    assert_eq!(page["user_votes"]["comments"][reply.to_string()], -1);
    assert_eq!(page["is_bookmarked"], false);

    let (status, anonymous) = app.request("GET", &format!("/api/posts/{post}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(anonymous["user_votes"]["post"].is_null());
}

#[tokio::test]
async fn comments_notify_the_post_author() {
    let app = TestApp::new().await;
    let author = app.register("فارس").await;
    let reader = app.register("سالم").await;
    let community = app.create_community(&author, "عام").await;
    let post = app.create_post(&author, community, "عنوان").await;

    let (_, anonymous) = app.request("GET", "/api/notifications/count", None, None).await;
    assert_eq!(anonymous["count"], 0);

    app.comment(&reader, post, "تعليق", None).await;
    app.comment(&author, post, "تعليقي", None).await;

    let (_, count) = app
        .request("GET", "/api/notifications/count", Some(&author), None)
        .await;
    assert_eq!(count["count"], 1);

    let (status, list) = app.request("GET", "/api/notifications", Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, count) = app
        .request("GET", "/api/notifications/count", Some(&author), None)
        .await;
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn only_owners_and_admins_delete_posts() {
    let app = TestApp::new().await;
    let admin = app.register("مشرف").await;
    let member = app.register("عضو").await;
    let stranger = app.register("غريب").await;
    let community = app.create_community(&admin, "عام").await;
    let post = app.create_post(&member, community, "عنوان").await;
    let post_uri = format!("/api/posts/{post}");

    let (status, _) = app.request("DELETE", &post_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/communities/{community}/posts/{post}"),
            Some(&stranger),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/communities/{community}/posts/{post}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request("GET", &post_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forgot_password_answers_identically() {
    let app = TestApp::new().await;
    app.register_with_email("فارس", Some("fares@example.com")).await;

    let (known_status, known) = app
        .request(
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "fares@example.com" })),
        )
        .await;
    let (unknown_status, unknown) = app
        .request(
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;

    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known, unknown);
}

#[tokio::test]
async fn password_reset_flow_over_http() {
    let app = TestApp::new().await;
    let old_token = app
        .register_with_email("فارس", Some("fares@example.com"))
        .await;

    app.request(
        "POST",
        "/api/auth/forgot-password",
        None,
        Some(json!({ "email": "fares@example.com" })),
    )
    .await;

    let (token, code): (String, String) =
        sqlx::query_as("SELECT token, code FROM password_resets WHERE used = 0")
            .fetch_one(&app.state.db)
            .await
            .unwrap();
    let base = format!("/api/auth/password-resets/{token}");

    let (status, body) = app.request("GET", &base, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], false);

    let (status, _) = app
        .request(
            "POST",
            &format!("{base}/reset"),
            None,
            Some(json!({ "password": "newpass123", "password_confirm": "newpass123" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request("POST", &format!("{base}/verify"), None, Some(json!({ "code": code })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);

    let (status, _) = app
        .request(
            "POST",
            &format!("{base}/reset"),
            None,
            Some(json!({ "password": "newpass123", "password_confirm": "newpass123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Old sessions are revoked and the new password works
    let (status, _) = app.request("GET", "/api/users/me", Some(&old_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "فارس", "password": "newpass123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request("GET", &base, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rss_feed_is_served_as_xml() {
    let app = TestApp::new().await;
    let token = app.register("فارس").await;
    let community = app.create_community(&token, "عام").await;
    app.create_post(&token, community, "عنوان & تفاصيل").await;

    let (status, bytes) = app.raw("GET", "/feed.xml", None, None).await;
    let xml = String::from_utf8(bytes).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("<rss version=\"2.0\">"));
    assert!(xml.contains("عنوان &amp; تفاصيل"));

    let (status, _) = app.raw("GET", "/c/9999/feed.xml", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn community_follow_toggles_and_feeds_follow_it() {
    let app = TestApp::new().await;
    let creator = app.register("فارس").await;
    let reader = app.register("سالم").await;
    let followed = app.create_community(&creator, "متابع").await;
    let other = app.create_community(&creator, "آخر").await;
    app.create_post(&creator, followed, "داخل").await;
    app.create_post(&creator, other, "خارج").await;

    let (_, body) = app.request("GET", "/api/posts", Some(&reader), None).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
    assert_eq!(body["suggested_communities"].as_array().unwrap().len(), 2);

    let follow_uri = format!("/api/communities/{followed}/follow");
    let (status, body) = app.request("POST", &follow_uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["following"], true);

    let (_, body) = app.request("GET", "/api/posts", Some(&reader), None).await;
    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "داخل");

    let (_, body) = app.request("POST", &follow_uri, Some(&reader), None).await;
    assert_eq!(body["following"], false);
}

#[tokio::test]
async fn malformed_requests_answer_with_json_errors() {
    let app = TestApp::new().await;
    let token = app.register("فارس").await;
    let community = app.create_community(&token, "عام").await;
    let post = app.create_post(&token, community, "عنوان").await;
    let vote_uri = format!("/api/posts/{post}/vote");

    for payload in [json!({ "value": "up" }), json!({ "value": 1.5 }), json!({})] {
        let (status, body) = app
            .request("POST", &vote_uri, Some(&token), Some(payload.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(body["error"].is_string(), "payload {payload}: {body}");
    }

    // numeric strings are accepted like numbers
    let (status, body) = app
        .request("POST", &vote_uri, Some(&token), Some(json!({ "value": "1" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 1);

    let (status, body) = app
        .request("POST", "/api/communities", Some(&token), Some(json!({ "name": 5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.request("GET", "/api/posts/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn huge_page_numbers_return_empty_pages() {
    let app = TestApp::new().await;
    let token = app.register("فارس").await;
    let community = app.create_community(&token, "عام").await;
    app.create_post(&token, community, "عنوان").await;

    let page = i64::MAX;
    for uri in [
        format!("/api/posts?page={page}"),
        format!("/api/communities/{community}/posts?page={page}"),
        format!("/api/search?q=%D8%B9%D9%86%D9%88%D8%A7%D9%86&page={page}"),
    ] {
        let (status, body) = app.request("GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert!(body["posts"].as_array().unwrap().is_empty(), "{uri}: {body}");
    }
}
