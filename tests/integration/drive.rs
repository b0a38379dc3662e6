use super::*;
use serde_json::json;
use simple_google_drive::errors::ApiError;
use simple_google_drive::{CopyOptions, DriveError, PermissionTarget, ShareRole};
use wiremock::matchers::{body_json, query_param};

#[tokio::test]
async fn test_create_folder_returns_id() {
    let server = MockServer::start().await;
    authed("POST", "/drive/v3/files")
        .and(body_json(json!({
            "name": "Reports",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["root-folder"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "folder-123"})))
        .expect(1)
        .mount(&server)
        .await;

    let drive = drive_for(&server);
    let id = drive.create_folder("Reports", Some("root-folder")).await.unwrap();
    assert_eq!(id, "folder-123");
}

#[tokio::test]
async fn test_list_files_builds_query_and_pages() {
    let server = MockServer::start().await;
    authed("GET", "/drive/v3/files")
        .and(query_param("q", "name contains 'budget' and 'cfo@example.com' in owners"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "b", "name": "budget-2025.xlsx"}]
        })))
        .mount(&server)
        .await;
    authed("GET", "/drive/v3/files")
        .and(query_param("q", "name contains 'budget' and 'cfo@example.com' in owners"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nextPageToken": "page-2",
            "files": [{"id": "a", "name": "budget-2024.xlsx"}]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let drive = drive_for(&server);
    let files = drive
        .list_files(Some("budget"), Some("cfo@example.com"))
        .await
        .unwrap();

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["budget-2024.xlsx", "budget-2025.xlsx"]);
}

#[tokio::test]
async fn test_copy_file_with_suffix() {
    let server = MockServer::start().await;
    authed("GET", "/drive/v3/files/src-1")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "src-1", "name": "Report.pdf", "parents": ["p"]
        })))
        .mount(&server)
        .await;
    authed("POST", "/drive/v3/files/src-1/copy")
        .and(query_param("fields", "id, name, mimeType, parents, owners"))
        .and(body_json(json!({"name": "Report.pdf (old)"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "copy-1", "name": "Report.pdf (old)", "parents": ["p"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let drive = drive_for(&server);
    let copy = drive
        .copy_file("src-1", &CopyOptions::default().suffix("(old)"))
        .await
        .unwrap();
    assert_eq!(copy.id, "copy-1");
}

#[tokio::test]
async fn test_copy_file_into_folder_with_default_copy_response() {
    let server = MockServer::start().await;
    authed("GET", "/drive/v3/files/src-2")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "src-2", "name": "Budget.xlsx", "parents": ["p"]
        })))
        .mount(&server)
        .await;
    authed("POST", "/drive/v3/files/src-2/copy")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "drive#file",
            "id": "copy-2",
            "name": "Copy of Budget.xlsx",
            "mimeType": "application/vnd.ms-excel"
        })))
        .expect(1)
        .mount(&server)
        .await;
    authed("PATCH", "/drive/v3/files/copy-2")
        .and(query_param("addParents", "archive"))
        .and(query_param("removeParents", "p"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "copy-2", "name": "Copy of Budget.xlsx", "parents": ["archive"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let drive = drive_for(&server);
    let copy = drive
        .copy_file("src-2", &CopyOptions::copy_of().to_folder("archive"))
        .await
        .unwrap();
    assert_eq!(copy.first_parent(), Some("archive"));
}

#[tokio::test]
async fn test_rename_and_delete() {
    let server = MockServer::start().await;
    authed("PATCH", "/drive/v3/files/f-1")
        .and(body_json(json!({"name": "Final.docx"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "f-1", "name": "Final.docx"})))
        .mount(&server)
        .await;
    authed("DELETE", "/drive/v3/files/f-1")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let drive = drive_for(&server);
    let renamed = drive.rename_file("f-1", "Final.docx").await.unwrap();
    assert_eq!(renamed.name, "Final.docx");
    drive.delete_file("f-1").await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_file_is_not_found() {
    let server = MockServer::start().await;
    authed("DELETE", "/drive/v3/files/gone")
        .respond_with(google_error(404, "notFound", "File not found: gone."))
        .mount(&server)
        .await;

    let drive = drive_for(&server);
    let err = drive.delete_file("gone").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_permissions_round_trip() {
    let server = MockServer::start().await;
    authed("POST", "/drive/v3/files/f-1/permissions")
        .and(body_json(json!({"type": "user", "role": "commenter", "emailAddress": "ann@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "perm-ann", "type": "user", "role": "commenter"
        })))
        .expect(1)
        .mount(&server)
        .await;
    authed("GET", "/drive/v3/files/f-1/permissions")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"permissions": [
            {"id": "perm-ann", "type": "user", "role": "commenter", "emailAddress": "ann@example.com"}
        ]})))
        .mount(&server)
        .await;
    authed("DELETE", "/drive/v3/files/f-1/permissions/perm-ann")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let drive = drive_for(&server);
    drive
        .add_permission("f-1", "ann@example.com", ShareRole::Commenter)
        .await
        .unwrap();
    let removed = drive
        .remove_permission("f-1", &PermissionTarget::ByEmail("ann@example.com".to_string()))
        .await
        .unwrap();
    assert!(removed);
}

#[tokio::test]
async fn test_check_usage() {
    let server = MockServer::start().await;
    authed("GET", "/drive/v3/about")
        .and(query_param("fields", "storageQuota"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "storageQuota": {"limit": "100", "usage": "40", "usageInDrive": "30"}
        })))
        .mount(&server)
        .await;

    let drive = drive_for(&server);
    let quota = drive.check_usage().await.unwrap();
    assert_eq!(quota.usage_bytes(), Some(40));
    assert_eq!(quota.usage_in_drive.as_deref(), Some("30"));
}

#[tokio::test]
async fn test_quota_exceeded_is_classified() {
    let server = MockServer::start().await;
    authed("POST", "/drive/v3/files")
        .respond_with(google_error(403, "storageQuotaExceeded", "The user's Drive storage quota has been exceeded."))
        .mount(&server)
        .await;

    let drive = drive_for(&server);
    let err = drive.create_folder("x", None).await.unwrap_err();
    assert!(matches!(err, DriveError::Api(ApiError::StorageQuotaExceeded(_))));
}

#[tokio::test]
async fn test_upload_small_file() {
    let server = MockServer::start().await;
    authed("POST", "/upload/drive/v3/files")
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "up-1", "name": "notes.md"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.md");
    std::fs::write(&path, "# notes").unwrap();

    let drive = drive_for(&server);
    let file = drive.upload_file(&path, None, None).await.unwrap();
    assert_eq!(file.id, "up-1");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains(r#""name":"notes.md""#));
    assert!(body.contains("# notes"));
}

#[tokio::test]
async fn test_transfer_owner_by_copy() {
    let source = MockServer::start().await;
    let target = MockServer::start().await;

    authed("GET", "/drive/v3/files/shared-1")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "shared-1", "name": "Plan.docx", "parents": ["x"]
        })))
        .mount(&target)
        .await;
    authed("POST", "/drive/v3/files/shared-1/copy")
        .and(body_json(json!({"name": "Plan.docx"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "mine-1", "name": "Plan.docx", "parents": ["y"]
        })))
        .expect(1)
        .mount(&target)
        .await;
    authed("DELETE", "/drive/v3/files/shared-1")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&source)
        .await;

    let from = drive_for(&source);
    let to = drive_for(&target);
    let record = SimpleDrive::transfer_owner_by_copy(&from, &to, "shared-1", true)
        .await
        .unwrap();

    assert_eq!(record.file.id, "mine-1");
    assert_eq!(record.deleted_file, "shared-1");
}
