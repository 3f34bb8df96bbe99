use std::sync::atomic::Ordering;

use serde_json::json;
use uuid::Uuid;

use crate::common::fakes::Event;
use crate::common::{TestApp, patient_with_image, routes};

fn asha() -> serde_json::Value {
    json!({"name": "Asha", "age": 5, "contact_details": "555-0100"})
}

mod create {
    use super::*;

    #[tokio::test]
    async fn record_without_image_is_created_and_listed_first() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        app.create_patient(&token, json!({"name": "Ravi", "age": 9, "contact_details": "555-0199"}))
            .await;
        let res = app.create_patient(&token, asha()).await;

        assert!(Uuid::parse_str(&res.id()).is_ok());
        assert_eq!(res.body["name"], "Asha");
        assert_eq!(res.body["age"], 5);
        assert!(res.body["image_url"].is_null());
        assert!(res.body["created_at"].is_string());

        let list = app.get_with_token(routes::PATIENTS, &token).await;
        assert_eq!(list.status, 200);
        let names: Vec<&str> = list
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Asha", "Ravi"]);
    }

    #[tokio::test]
    async fn missing_name_is_rejected_and_nothing_is_stored() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .post_with_token(
                routes::PATIENTS,
                &json!({"name": "", "age": 5, "contact_details": "555-0100"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(res.body["message"].as_str().unwrap().contains("name"));
        assert_eq!(app.record_count().await, 0);
    }

    #[tokio::test]
    async fn missing_contact_details_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .post_with_token(routes::PATIENTS, &json!({"name": "Asha", "age": 5}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["message"].as_str().unwrap().contains("contact_details"));
    }

    #[tokio::test]
    async fn age_text_is_normalized_to_a_number() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .create_patient(
                &token,
                json!({"name": "Asha", "age": " 7 ", "contact_details": "555-0100"}),
            )
            .await;

        assert_eq!(res.body["age"], 7);
    }

    #[tokio::test]
    async fn non_numeric_age_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .post_with_token(
                routes::PATIENTS,
                &json!({"name": "Asha", "age": "seven", "contact_details": "555-0100"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn blank_optional_fields_are_stored_as_absent() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .create_patient(
                &token,
                json!({
                    "name": "Asha",
                    "age": 5,
                    "contact_details": "555-0100",
                    "parent_name": "  ",
                    "op_number": "",
                    "treatment": "Sealant",
                }),
            )
            .await;

        assert!(res.body["parent_name"].is_null());
        assert!(res.body["op_number"].is_null());
        assert_eq!(res.body["treatment"], "Sealant");
    }

    #[tokio::test]
    async fn inline_image_is_stored_before_the_record() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app.create_patient(&token, patient_with_image("Asha")).await;

        let url = res.image_url().expect("image_url should be set");
        assert!(app.image_exists(&url).await);

        let events = app.events.snapshot();
        assert_eq!(events, vec![Event::BlobPut(url), Event::RecordInsert]);
    }

    #[tokio::test]
    async fn upload_failure_abandons_the_create() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        app.blobs.fail_put.store(true, Ordering::SeqCst);

        let res = app
            .post_with_token(routes::PATIENTS, &patient_with_image("Asha"), &token)
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "UPLOAD_FAILED");
        assert_eq!(res.body["message"], "Failed to upload image");
        assert_eq!(app.record_count().await, 0);
    }

    #[tokio::test]
    async fn insert_failure_discards_the_uploaded_image() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        app.records.fail_insert.store(true, Ordering::SeqCst);

        let res = app
            .post_with_token(routes::PATIENTS, &patient_with_image("Asha"), &token)
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "INTERNAL_ERROR");
        assert_eq!(res.body["message"], "An unexpected error occurred");

        let events = app.events.snapshot();
        let Some(Event::BlobPut(url)) = events.first().cloned() else {
            panic!("expected an upload first, got {events:?}");
        };
        assert_eq!(events, vec![Event::BlobPut(url.clone()), Event::BlobDelete(url.clone())]);
        assert!(!app.image_exists(&url).await);
    }

    #[tokio::test]
    async fn non_image_payload_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .post_with_token(
                routes::PATIENTS,
                &json!({
                    "name": "Asha",
                    "age": 5,
                    "contact_details": "555-0100",
                    "image": {"data": "aGVsbG8=", "file_name": "notes.txt"},
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(app.events.snapshot().is_empty());
    }

    #[tokio::test]
    async fn image_and_image_url_together_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let url = app.upload_png(&token).await;

        let mut body = patient_with_image("Asha");
        body["image_url"] = json!(url);
        let res = app.post_with_token(routes::PATIENTS, &body, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(app.record_count().await, 0);
    }

    #[tokio::test]
    async fn previously_uploaded_image_can_be_linked() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let url = app.upload_png(&token).await;

        let mut body = asha();
        body["image_url"] = json!(url);
        let res = app.create_patient(&token, body).await;

        assert_eq!(res.image_url(), Some(url));
    }

    #[tokio::test]
    async fn image_owned_by_another_record_cannot_be_linked() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let owner = app.create_patient(&token, patient_with_image("Asha")).await;
        let url = owner.image_url().unwrap();

        let mut body = asha();
        body["name"] = json!("Ravi");
        body["image_url"] = json!(url);
        let res = app.post_with_token(routes::PATIENTS, &body, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.record_count().await, 1);

        let res = app
            .delete_with_token(&routes::patient(&owner.id()), &token)
            .await;
        assert_eq!(res.status, 200);
        assert!(!app.image_exists(&url).await);
    }

    #[tokio::test]
    async fn foreign_image_url_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let mut body = asha();
        body["image_url"] = json!("https://example.org/elsewhere/photo.png");
        let res = app.post_with_token(routes::PATIENTS, &body, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(app.record_count().await, 0);
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn record_can_be_fetched_by_id() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let id = app.create_patient(&token, asha()).await.id();

        let res = app.get_with_token(&routes::patient(&id), &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], id.as_str());
        assert_eq!(res.body["contact_details"], "555-0100");
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_not_found() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .get_with_token(&routes::patient(&Uuid::now_v7().to_string()), &token)
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");

        let res = app.get_with_token(&routes::patient("42"), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn search_matches_names_op_numbers_and_age() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        app.create_patient(
            &token,
            json!({"name": "Asha", "age": 5, "contact_details": "1", "op_number": "OP-101"}),
        )
        .await;
        app.create_patient(
            &token,
            json!({"name": "Ravi", "age": 12, "contact_details": "2", "parent_name": "Meera"}),
        )
        .await;

        let names = |res: &crate::common::TestResponse| -> Vec<String> {
            res.body
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["name"].as_str().unwrap().to_string())
                .collect()
        };

        let res = app.get_with_token(&routes::search("ASH"), &token).await;
        assert_eq!(names(&res), vec!["Asha"]);

        let res = app.get_with_token(&routes::search("meera"), &token).await;
        assert_eq!(names(&res), vec!["Ravi"]);

        let res = app.get_with_token(&routes::search("op-1"), &token).await;
        assert_eq!(names(&res), vec!["Asha"]);

        let res = app.get_with_token(&routes::search("12"), &token).await;
        assert_eq!(names(&res), vec!["Ravi"]);

        let res = app.get_with_token(&routes::search(""), &token).await;
        assert_eq!(names(&res), vec!["Ravi", "Asha"]);
    }

    #[tokio::test]
    async fn export_returns_csv_of_all_records() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        app.create_patient(&token, asha()).await;

        let res = app.get_with_token(routes::EXPORT, &token).await;

        assert_eq!(res.status, 200);
        assert!(
            res.headers["content-type"]
                .to_str()
                .unwrap()
                .starts_with("text/csv")
        );
        let mut lines = res.text.lines();
        assert_eq!(
            lines.next(),
            Some("id,name,age,parent_name,op_number,contact_details,treatment,notes,image_url")
        );
        assert!(lines.next().unwrap().contains(",Asha,5,,,555-0100,,,"));
        assert_eq!(lines.next(), None);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn adding_a_first_image_discards_nothing() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let id = app.create_patient(&token, asha()).await.id();
        app.events.clear();

        let mut body = patient_with_image("Asha");
        body["age"] = json!(6);
        let res = app.put_with_token(&routes::patient(&id), &body, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["age"], 6);
        let url = res.image_url().expect("image_url should be set");
        assert!(app.image_exists(&url).await);
        assert!(
            !app.events
                .snapshot()
                .iter()
                .any(|e| matches!(e, Event::BlobDelete(_)))
        );
    }

    #[tokio::test]
    async fn old_image_is_discarded_only_after_the_write() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let created = app.create_patient(&token, patient_with_image("Asha")).await;
        let id = created.id();
        let old_url = created.image_url().unwrap();
        app.events.clear();

        let res = app
            .put_with_token(&routes::patient(&id), &patient_with_image("Asha"), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let new_url = res.image_url().unwrap();
        assert_ne!(new_url, old_url);
        assert!(app.image_exists(&new_url).await);
        assert!(!app.image_exists(&old_url).await);

        let uuid = Uuid::parse_str(&id).unwrap();
        let written = app.events.position(&Event::RecordUpdate(uuid)).unwrap();
        let discarded = app
            .events
            .position(&Event::BlobDelete(old_url.clone()))
            .unwrap();
        assert!(written < discarded);
    }

    #[tokio::test]
    async fn failed_write_keeps_old_image_and_discards_new_one() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let created = app.create_patient(&token, patient_with_image("Asha")).await;
        let id = created.id();
        let old_url = created.image_url().unwrap();
        app.events.clear();
        app.records.fail_update.store(true, Ordering::SeqCst);

        let res = app
            .put_with_token(&routes::patient(&id), &patient_with_image("Asha"), &token)
            .await;

        assert_eq!(res.status, 500);
        assert!(app.image_exists(&old_url).await);

        let events = app.events.snapshot();
        let Some(Event::BlobPut(new_url)) = events.first().cloned() else {
            panic!("expected an upload first, got {events:?}");
        };
        assert_eq!(
            events,
            vec![
                Event::BlobPut(new_url.clone()),
                Event::BlobDelete(new_url.clone())
            ]
        );
        assert!(!app.image_exists(&new_url).await);

        app.records.fail_update.store(false, Ordering::SeqCst);
        let res = app.get_with_token(&routes::patient(&id), &token).await;
        assert_eq!(res.image_url(), Some(old_url));
    }

    #[tokio::test]
    async fn upload_failure_leaves_record_untouched() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let id = app.create_patient(&token, asha()).await.id();
        app.blobs.fail_put.store(true, Ordering::SeqCst);

        let mut body = patient_with_image("Renamed");
        body["age"] = json!(9);
        let res = app.put_with_token(&routes::patient(&id), &body, &token).await;

        assert_eq!(res.status, 500);
        let res = app.get_with_token(&routes::patient(&id), &token).await;
        assert_eq!(res.body["name"], "Asha");
        assert_eq!(res.body["age"], 5);
    }

    #[tokio::test]
    async fn omitting_image_url_keeps_the_image() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let created = app.create_patient(&token, patient_with_image("Asha")).await;
        let url = created.image_url().unwrap();

        let mut body = asha();
        body["notes"] = json!("Brushing well");
        let res = app
            .put_with_token(&routes::patient(&created.id()), &body, &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.image_url(), Some(url.clone()));
        assert_eq!(res.body["notes"], "Brushing well");
        assert!(app.image_exists(&url).await);
    }

    #[tokio::test]
    async fn image_of_another_record_cannot_be_linked() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let owner = app.create_patient(&token, patient_with_image("Asha")).await;
        let url = owner.image_url().unwrap();
        let other = app
            .create_patient(
                &token,
                json!({"name": "Ravi", "age": 8, "contact_details": "555-0101"}),
            )
            .await;

        let mut body = asha();
        body["name"] = json!("Ravi");
        body["image_url"] = json!(url);
        let res = app
            .put_with_token(&routes::patient(&other.id()), &body, &token)
            .await;
        assert_eq!(res.status, 400);

        let res = app.get_with_token(&routes::patient(&other.id()), &token).await;
        assert!(res.body["image_url"].is_null());

        // Re-saving the owner with its own URL is not a conflict.
        let mut body = asha();
        body["image_url"] = json!(url);
        let res = app
            .put_with_token(&routes::patient(&owner.id()), &body, &token)
            .await;
        assert_eq!(res.status, 200);
        assert!(app.image_exists(&url).await);
    }

    #[tokio::test]
    async fn null_image_url_clears_and_discards_the_image() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let created = app.create_patient(&token, patient_with_image("Asha")).await;
        let url = created.image_url().unwrap();

        let mut body = asha();
        body["image_url"] = json!(null);
        let res = app
            .put_with_token(&routes::patient(&created.id()), &body, &token)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["image_url"].is_null());
        assert!(!app.image_exists(&url).await);
    }

    #[tokio::test]
    async fn missing_record_is_not_found_before_any_upload() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .put_with_token(
                &routes::patient(&Uuid::now_v7().to_string()),
                &patient_with_image("Asha"),
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert!(app.events.snapshot().is_empty());
    }

    #[tokio::test]
    async fn record_vanishing_mid_update_discards_the_new_image() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let id = app.create_patient(&token, asha()).await.id();
        app.events.clear();
        app.records.vanish_on_update.store(true, Ordering::SeqCst);

        let res = app
            .put_with_token(&routes::patient(&id), &patient_with_image("Asha"), &token)
            .await;

        assert_eq!(res.status, 404);
        let events = app.events.snapshot();
        let Some(Event::BlobPut(url)) = events.first().cloned() else {
            panic!("expected an upload first, got {events:?}");
        };
        assert!(events.contains(&Event::BlobDelete(url.clone())));
        assert!(!app.image_exists(&url).await);
    }

    #[tokio::test]
    async fn cleanup_failure_does_not_fail_the_update() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let created = app.create_patient(&token, patient_with_image("Asha")).await;
        let old_url = created.image_url().unwrap();
        app.blobs.fail_delete.store(true, Ordering::SeqCst);

        let res = app
            .put_with_token(
                &routes::patient(&created.id()),
                &patient_with_image("Asha"),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_ne!(res.image_url(), Some(old_url.clone()));
        assert!(app.image_exists(&old_url).await);
    }

    #[tokio::test]
    async fn validation_runs_before_anything_else() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let id = app.create_patient(&token, asha()).await.id();
        app.events.clear();

        let mut body = patient_with_image("Asha");
        body["contact_details"] = json!("");
        let res = app.put_with_token(&routes::patient(&id), &body, &token).await;

        assert_eq!(res.status, 400);
        assert!(app.events.snapshot().is_empty());
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleting_removes_record_then_image() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let created = app.create_patient(&token, patient_with_image("Asha")).await;
        let id = created.id();
        let url = created.image_url().unwrap();
        app.events.clear();

        let res = app.delete_with_token(&routes::patient(&id), &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], id.as_str());
        assert_eq!(res.image_url(), Some(url.clone()));

        let res = app.get_with_token(&routes::patient(&id), &token).await;
        assert_eq!(res.status, 404);
        assert!(!app.image_exists(&url).await);

        let uuid = Uuid::parse_str(&id).unwrap();
        assert_eq!(
            app.events.snapshot(),
            vec![Event::RecordDelete(uuid), Event::BlobDelete(url)]
        );
    }

    #[tokio::test]
    async fn cleanup_failure_does_not_fail_the_delete() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let created = app.create_patient(&token, patient_with_image("Asha")).await;
        app.blobs.fail_delete.store(true, Ordering::SeqCst);

        let res = app
            .delete_with_token(&routes::patient(&created.id()), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(app.record_count().await, 0);
    }

    #[tokio::test]
    async fn deleting_a_missing_record_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .delete_with_token(&routes::patient(&Uuid::now_v7().to_string()), &token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod routing {
    use super::*;

    #[tokio::test]
    async fn unsupported_method_is_rejected_with_allow_header() {
        let app = TestApp::spawn().await;
        let token = app.login().await;
        let id = app.create_patient(&token, asha()).await.id();

        let res = app
            .patch_with_token(&routes::patient(&id), &asha(), &token)
            .await;

        assert_eq!(res.status, 405);
        assert_eq!(res.body["code"], "METHOD_NOT_ALLOWED");
        let allow = res.headers["allow"].to_str().unwrap();
        assert!(allow.contains("PUT"));
        assert!(allow.contains("DELETE"));
    }

    #[tokio::test]
    async fn patient_routes_require_a_session() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::PATIENTS).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");

        let res = app.post_without_token(routes::PATIENTS, &asha()).await;
        assert_eq!(res.status, 401);
        assert_eq!(app.record_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.login().await;

        let res = app
            .client
            .post(app.url(routes::PATIENTS))
            .bearer_auth(&token)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
    }
}
