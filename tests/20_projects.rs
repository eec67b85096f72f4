mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{project_body, TestServer};

#[tokio::test]
async fn creator_is_enrolled_as_project_manager() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.user("marie").await?;

    let (status, body) = server
        .post("/api/projects", Some(&owner.token), project_body("Radioactivity", false))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let project = &body["data"];
    assert_eq!(project["status"], "planning");
    assert_eq!(project["userRole"], "project_manager");
    assert_eq!(project["userPermissions"]["canManageMembers"], true);
    assert_eq!(project["members"].as_array().unwrap().len(), 1);
    assert_eq!(project["members"][0]["user"]["username"], "marie");
    assert_eq!(project["createdBy"]["email"], owner.email);

    let (status, body) = server.get("/api/projects", Some(&owner.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["projects"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["totalItems"], 1);
    Ok(())
}

#[tokio::test]
async fn project_input_is_validated() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.user("pierre").await?;

    let (status, body) = server
        .post(
            "/api/projects",
            Some(&owner.token),
            json!({
                "title": "No",
                "description": "short",
                "goals": [],
                "objectives": ["x"],
                "timeline": { "startDate": "2024-06-01", "endDate": "2024-01-01" },
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors: Vec<&str> = body["errors"].as_array().unwrap().iter().filter_map(|e| e.as_str()).collect();
    assert!(errors.contains(&"Project title must be at least 3 characters long"));
    assert!(errors.contains(&"Project description must be at least 10 characters long"));
    assert!(errors.contains(&"At least one goal is required"));
    assert!(errors.contains(&"End date must be after start date"));
    Ok(())
}

#[tokio::test]
async fn private_projects_are_hidden_from_strangers() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.user("lise").await?;
    let stranger = server.user("otto").await?;
    let project = server.project(&owner, "Fission", false).await?;

    let (status, body) = server.get(&format!("/api/projects/{}", project), Some(&stranger.token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied");

    let (status, body) = server.get("/api/projects", Some(&stranger.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["projects"].as_array().unwrap().is_empty());

    let (status, body) = server.get("/api/projects/not-a-uuid", Some(&owner.token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid project id");
    Ok(())
}

#[tokio::test]
async fn members_get_role_capabilities() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.user("rosalind").await?;
    let researcher = server.user("maurice").await?;
    let viewer = server.user("francis").await?;
    let project = server.project(&owner, "Diffraction", false).await?;

    server.add_member(&owner, project, &researcher, "researcher").await?;
    server.add_member(&owner, project, &viewer, "viewer").await?;

    let (status, body) = server.get(&format!("/api/projects/{}", project), Some(&researcher.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userRole"], "researcher");
    assert_eq!(body["data"]["userPermissions"]["canEdit"], true);
    assert_eq!(body["data"]["userPermissions"]["canManageMembers"], false);
    assert_eq!(body["data"]["members"].as_array().unwrap().len(), 3);

    // canEdit lets a researcher update the project, a viewer cannot
    let (status, body) = server
        .put(&format!("/api/projects/{}", project), Some(&researcher.token), json!({ "status": "active" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "active");

    let (status, body) = server
        .put(&format!("/api/projects/{}", project), Some(&viewer.token), json!({ "title": "Mine now" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Permission denied");

    // only canManageMembers may add people
    let (status, _) = server
        .post(
            &format!("/api/projects/{}/members", project),
            Some(&researcher.token),
            json!({ "email": "someone@example.org" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn adding_members_checks_the_target() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.user("ada").await?;
    let member = server.user("charles").await?;
    let project = server.project(&owner, "Engines", false).await?;
    let members = format!("/api/projects/{}/members", project);

    let (status, body) = server
        .post(&members, Some(&owner.token), json!({ "email": member.email, "role": "wizard" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Member added successfully");
    assert_eq!(body["data"]["member"]["role"], "collaborator");
    assert_eq!(body["data"]["member"]["permissions"]["canUploadDocuments"], true);
    assert_eq!(body["data"]["member"]["permissions"]["canEdit"], false);

    let (status, body) = server
        .post(&members, Some(&owner.token), json!({ "email": member.email }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User is already a member of this project");

    let (pending, _) = server.register("unverified", "researcher").await?;
    let (status, body) = server.post(&members, Some(&owner.token), json!({ "email": pending })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot add unverified user. They must verify their email first.");

    let (status, body) = server
        .post(&members, Some(&owner.token), json!({ "email": "ghost@example.org" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found with this email address");

    let (status, _) = server.post(&members, Some(&owner.token), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // explicit permissions override the role row
    let custom = server.user("custom").await?;
    let (status, body) = server
        .post(
            &members,
            Some(&owner.token),
            json!({
                "email": custom.email,
                "role": "viewer",
                "permissions": { "canViewDocuments": true, "canUploadDocuments": true },
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["member"]["role"], "viewer");
    assert_eq!(body["data"]["member"]["permissions"]["canUploadDocuments"], true);

    // flags left out keep the role's value
    let partial = server.user("partial").await?;
    let (status, body) = server
        .post(
            &members,
            Some(&owner.token),
            json!({
                "email": partial.email,
                "role": "collaborator",
                "permissions": { "canManageMembers": true },
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let permissions = &body["data"]["member"]["permissions"];
    assert_eq!(permissions["canManageMembers"], true);
    assert_eq!(permissions["canUploadDocuments"], true);
    assert_eq!(permissions["canViewDocuments"], true);
    assert_eq!(permissions["canEdit"], false);

    let (status, _) = server
        .get(&format!("/api/documents/project/{}", project), Some(&partial.token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn self_join_only_for_public_projects() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.user("tim").await?;
    let joiner = server.user("vint").await?;
    let open = server.project(&owner, "Open Web", true).await?;
    let closed = server.project(&owner, "Closed Web", false).await?;

    let (status, body) = server.post(&format!("/api/projects/{}/join", open), Some(&joiner.token), json!({})).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["member"]["role"], "collaborator");

    let (status, body) = server.post(&format!("/api/projects/{}/join", open), Some(&joiner.token), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You are already a member of this project");

    let (status, body) = server
        .post(&format!("/api/projects/{}/join", closed), Some(&joiner.token), json!({}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "This project is not public");

    let (_, body) = server.get("/api/user/dashboard", Some(&joiner.token)).await?;
    assert_eq!(body["data"]["stats"]["totalProjects"], 1);
    assert_eq!(body["data"]["stats"]["totalCollaborations"], 1);
    Ok(())
}

#[tokio::test]
async fn public_listing_needs_no_login() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.user("barbara").await?;
    server.project(&owner, "Open Genomics", true).await?;
    server.project(&owner, "Secret Genomics", false).await?;
    server
        .post(
            "/api/projects",
            Some(&owner.token),
            json!({
                "title": "Open Astronomy",
                "description": "Looking at the sky carefully",
                "goals": ["g"],
                "objectives": ["o"],
                "timeline": { "startDate": "2024-01-01", "endDate": "2025-01-01" },
                "isPublic": true,
                "tags": ["stars"],
            }),
        )
        .await?;

    let (status, body) = server.get("/api/projects/public", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["totalItems"], 2);

    let (_, body) = server.get("/api/projects/public?search=GENOMICS", None).await?;
    let titles: Vec<&str> = body["data"]["projects"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Open Genomics"]);

    let (_, body) = server.get("/api/projects/public?limit=1&page=2", None).await?;
    assert_eq!(body["data"]["projects"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["hasPrev"], true);
    assert_eq!(body["data"]["pagination"]["hasNext"], false);
    Ok(())
}

#[tokio::test]
async fn check_status_reports_verification() -> Result<()> {
    let server = TestServer::start().await?;
    let manager = server.user("grace").await?;
    let (pending, _) = server.register("pending", "researcher").await?;

    let (status, body) = server
        .get(&format!("/api/user/check-status?email={}", pending), Some(&manager.token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["canBeAddedToProject"], false);

    let (status, _) = server.get("/api/user/check-status", Some(&manager.token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
