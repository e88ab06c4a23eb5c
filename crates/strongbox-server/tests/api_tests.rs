// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests driving the router end to end.

use axum::{
	body::Body,
	http::{header, Method, Request, StatusCode},
	Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use strongbox_config::{DirectoryUserConfig, ServerConfig};
use strongbox_crypto::{EncryptionKey, EncryptionService};
use std::sync::Arc;

use strongbox_server::jobs::build_scheduler;
use strongbox_server::{create_app_state, create_router};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_PASSWORD: &str = "correct horse battery staple";
const ALICE_PASSWORD: &str = "alice-s3cret";
const MALLORY_PASSWORD: &str = "mallory-s3cret";

struct TestServer {
	app: Router,
	pool: SqlitePool,
	config: ServerConfig,
	_dir: TempDir,
}

fn user(username: &str, password: &str, admin: bool, credentials_access: bool) -> DirectoryUserConfig {
	DirectoryUserConfig {
		username: username.to_string(),
		display_name: None,
		password_hash: strongbox_auth::hash_password(password).unwrap(),
		admin,
		credentials_access,
	}
}

async fn setup_with_crypto(crypto: EncryptionService) -> TestServer {
	let dir = tempfile::tempdir().unwrap();
	let db_path = dir.path().join("test.db");
	let database_url = format!("sqlite:{}?mode=rwc", db_path.display());

	let pool = strongbox_db::create_pool(&database_url).await.unwrap();
	strongbox_db::run_migrations(&pool).await.unwrap();

	let mut config = ServerConfig::default();
	config.directory.users = vec![
		user("admin", ADMIN_PASSWORD, true, false),
		user("alice", ALICE_PASSWORD, false, true),
		user("mallory", MALLORY_PASSWORD, false, false),
	];

	TestServer {
		app: build_app(pool.clone(), &config, crypto).await,
		pool,
		config,
		_dir: dir,
	}
}

/// Router over `pool` with the maintenance jobs registered but not started.
async fn build_app(pool: SqlitePool, config: &ServerConfig, crypto: EncryptionService) -> Router {
	let mut state = create_app_state(pool, config, crypto).await.unwrap();
	state.scheduler = Some(Arc::new(build_scheduler(&state, &config.jobs)));
	create_router(state)
}

async fn setup() -> TestServer {
	setup_with_crypto(EncryptionService::new(EncryptionKey::generate(1))).await
}

impl TestServer {
	/// Same database, fresh process state.
	async fn restart(self) -> TestServer {
		let app = build_app(
			self.pool.clone(),
			&self.config,
			EncryptionService::new(EncryptionKey::generate(1)),
		)
		.await;
		TestServer { app, ..self }
	}

	async fn request(
		&self,
		method: Method,
		uri: &str,
		token: Option<&str>,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let mut builder = Request::builder().method(method).uri(uri);
		if let Some(token) = token {
			builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
		}
		let body = match body {
			Some(value) => {
				builder = builder.header(header::CONTENT_TYPE, "application/json");
				Body::from(value.to_string())
			}
			None => Body::empty(),
		};

		let response = self
			.app
			.clone()
			.oneshot(builder.body(body).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let json = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, json)
	}

	async fn login(&self, username: &str, password: &str) -> String {
		let (status, body) = self
			.request(
				Method::POST,
				"/api/session",
				None,
				Some(json!({ "username": username, "password": password })),
			)
			.await;
		assert_eq!(status, StatusCode::OK, "login failed: {body}");
		body["token"].as_str().unwrap().to_string()
	}

	async fn create_login(&self, token: &str) -> String {
		let (status, body) = self
			.request(
				Method::POST,
				"/api/credentials",
				Some(token),
				Some(json!({
					"label": "Build server",
					"type": "username_password",
					"url": "https://ci.example.com",
					"payload": { "username": "svc", "password": "p@ss" },
				})),
			)
			.await;
		assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
		body["id"].as_str().unwrap().to_string()
	}

	/// Audit entries in the order they were written.
	async fn audit_chronological(&self, token: &str) -> Vec<Value> {
		let (status, body) = self
			.request(Method::GET, "/api/audit?limit=200", Some(token), None)
			.await;
		assert_eq!(status, StatusCode::OK, "audit query failed: {body}");
		let mut entries = body["entries"].as_array().unwrap().clone();
		entries.reverse();
		entries
	}
}

#[tokio::test]
async fn health_reports_encryption_available() {
	let server = setup().await;
	let (status, body) = server.request(Method::GET, "/health", None, None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "healthy");
	assert_eq!(body["components"]["encryption"]["available"], true);
	assert_eq!(body["components"]["database"]["status"], "healthy");
}

#[tokio::test]
async fn requests_without_a_session_are_unauthorized() {
	let server = setup().await;

	let (status, body) = server
		.request(Method::GET, "/api/credentials", None, None)
		.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["error"], "unauthorized");

	let (status, _) = server
		.request(Method::GET, "/api/credentials", Some("not-a-session"), None)
		.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
	let server = setup().await;
	let (status, body) = server
		.request(
			Method::POST,
			"/api/session",
			None,
			Some(json!({ "username": "alice", "password": "nope" })),
		)
		.await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn reveal_requires_step_up_when_enabled() {
	let server = setup().await;
	let admin = server.login("admin", ADMIN_PASSWORD).await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	let (status, body) = server
		.request(
			Method::PUT,
			"/api/settings",
			Some(&admin),
			Some(json!({
				"require_password_verification": true,
				"audit_log_retention_days": 90,
			})),
		)
		.await;
	assert_eq!(status, StatusCode::OK, "settings update failed: {body}");
	assert_eq!(body["require_password_verification"], true);

	let id = server.create_login(&alice).await;

	let (status, body) = server
		.request(Method::GET, "/api/credentials", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	let listed = &body["credentials"][0];
	assert_eq!(listed["label"], "Build server");
	assert_eq!(listed["type"], "username_password");
	assert!(!body.to_string().contains("p@ss"));

	let reveal_uri = format!("/api/credentials/{id}/reveal");
	let (status, body) = server
		.request(Method::POST, &reveal_uri, Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert!(!body.to_string().contains("p@ss"));

	let (status, _) = server
		.request(
			Method::POST,
			"/api/verify-password",
			Some(&alice),
			Some(json!({ "password": "wrong" })),
		)
		.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);

	let (status, body) = server
		.request(
			Method::POST,
			"/api/verify-password",
			Some(&alice),
			Some(json!({ "password": ALICE_PASSWORD })),
		)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["verified"], true);

	let (status, body) = server
		.request(Method::POST, &reveal_uri, Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["payload"]["type"], "username_password");
	assert_eq!(body["payload"]["username"], "svc");
	assert_eq!(body["payload"]["password"], "p@ss");
	assert_eq!(body["credential"]["id"], id.as_str());

	let trail: Vec<(String, String)> = server
		.audit_chronological(&alice)
		.await
		.into_iter()
		.filter(|e| matches!(e["action"].as_str(), Some("create" | "view" | "verify_success")))
		.map(|e| {
			(
				e["action"].as_str().unwrap().to_string(),
				e["detail"]["outcome"].as_str().unwrap().to_string(),
			)
		})
		.collect();
	assert_eq!(
		trail,
		vec![
			("create".to_string(), "success".to_string()),
			("view".to_string(), "failure".to_string()),
			("verify_success".to_string(), "success".to_string()),
			("view".to_string(), "success".to_string()),
		]
	);
}

#[tokio::test]
async fn logout_ends_session_and_step_up() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	server
		.request(
			Method::POST,
			"/api/verify-password",
			Some(&alice),
			Some(json!({ "password": ALICE_PASSWORD })),
		)
		.await;
	let (_, body) = server
		.request(Method::GET, "/api/session", Some(&alice), None)
		.await;
	assert_eq!(body["step_up"]["state"], "verified");

	let (status, _) = server
		.request(Method::DELETE, "/api/session", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, _) = server
		.request(Method::GET, "/api/session", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_without_capability_are_forbidden_until_granted() {
	let server = setup().await;
	let admin = server.login("admin", ADMIN_PASSWORD).await;
	let mallory = server.login("mallory", MALLORY_PASSWORD).await;

	let (status, body) = server
		.request(Method::GET, "/api/credentials", Some(&mallory), None)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["error"], "forbidden");

	let (status, _) = server
		.request(Method::GET, "/api/access", Some(&mallory), None)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, body) = server
		.request(Method::PUT, "/api/access/mallory", Some(&admin), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["has_access"], true);

	let (status, _) = server
		.request(Method::GET, "/api/credentials", Some(&mallory), None)
		.await;
	assert_eq!(status, StatusCode::OK);

	let (status, body) = server
		.request(Method::DELETE, "/api/access/mallory", Some(&admin), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["has_access"], false);

	let (status, _) = server
		.request(Method::GET, "/api/credentials", Some(&mallory), None)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_admins_cannot_change_settings() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	let (status, _) = server
		.request(
			Method::PUT,
			"/api/settings",
			Some(&alice),
			Some(json!({
				"require_password_verification": false,
				"audit_log_retention_days": 7,
			})),
		)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, body) = server
		.request(Method::GET, "/api/settings", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["audit_log_retention_days"], 90);
	assert_eq!(body["encryption_available"], true);
}

#[tokio::test]
async fn credential_lifecycle() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;
	let id = server.create_login(&alice).await;
	let uri = format!("/api/credentials/{id}");

	let (status, body) = server
		.request(
			Method::PATCH,
			&uri,
			Some(&alice),
			Some(json!({ "label": "Build server (prod)", "expected_version": 1 })),
		)
		.await;
	assert_eq!(status, StatusCode::OK, "update failed: {body}");
	assert_eq!(body["label"], "Build server (prod)");
	assert_eq!(body["version"], 2);

	let (status, body) = server
		.request(
			Method::PATCH,
			&uri,
			Some(&alice),
			Some(json!({ "notes": "stale", "expected_version": 1 })),
		)
		.await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body["error"], "conflict");

	let (status, body) = server.request(Method::GET, &uri, Some(&alice), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["url"], "https://ci.example.com");

	let (status, _) = server
		.request(Method::DELETE, &uri, Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, body) = server.request(Method::GET, &uri, Some(&alice), None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn invalid_input_is_rejected() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	let (status, body) = server
		.request(
			Method::POST,
			"/api/credentials",
			Some(&alice),
			Some(json!({
				"label": "   ",
				"type": "api_key",
				"payload": { "api_key": "k" },
			})),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], "validation_error");

	let (status, body) = server
		.request(
			Method::POST,
			"/api/credentials",
			Some(&alice),
			Some(json!({
				"label": "Deploy key",
				"type": "ssh_key",
				"payload": { "ssh_key": "" },
			})),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], "validation_error");

	let (status, body) = server
		.request(Method::GET, "/api/credentials/not-a-uuid", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn tampered_ciphertext_is_detected() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;
	let id = server.create_login(&alice).await;

	let (blob,): (Vec<u8>,) =
		sqlx::query_as("SELECT encrypted_payload FROM credentials WHERE id = ?")
			.bind(&id)
			.fetch_one(&server.pool)
			.await
			.unwrap();
	let mut tampered = blob.clone();
	let last = tampered.len() - 1;
	tampered[last] ^= 0x01;
	sqlx::query("UPDATE credentials SET encrypted_payload = ? WHERE id = ?")
		.bind(tampered)
		.bind(&id)
		.execute(&server.pool)
		.await
		.unwrap();

	let (status, body) = server
		.request(
			Method::POST,
			&format!("/api/credentials/{id}/reveal"),
			Some(&alice),
			None,
		)
		.await;
	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(body["error"], "tamper_detected");
	assert!(body.get("payload").is_none());
}

#[tokio::test]
async fn export_is_always_refused_and_audited() {
	let server = setup().await;
	let admin = server.login("admin", ADMIN_PASSWORD).await;

	let (status, body) = server
		.request(Method::POST, "/api/credentials/export", Some(&admin), None)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["error"], "forbidden");

	let (status, body) = server
		.request(
			Method::GET,
			"/api/audit?action=export_attempt",
			Some(&admin),
			None,
		)
		.await;
	assert_eq!(status, StatusCode::OK);
	let entries = body["entries"].as_array().unwrap();
	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0]["actor"], "admin");
	assert_eq!(entries[0]["detail"]["outcome"], "failure");
}

#[tokio::test]
async fn audit_log_pages_without_gaps() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;
	for _ in 0..5 {
		server
			.request(Method::GET, "/api/credentials", Some(&alice), None)
			.await;
	}

	let mut seen = Vec::new();
	let mut uri = "/api/audit?action=list&limit=2".to_string();
	loop {
		let (status, body) = server.request(Method::GET, &uri, Some(&alice), None).await;
		assert_eq!(status, StatusCode::OK);
		for entry in body["entries"].as_array().unwrap() {
			seen.push(entry["id"].as_i64().unwrap());
		}
		match body["next_cursor"].as_i64() {
			Some(cursor) => uri = format!("/api/audit?action=list&limit=2&cursor={cursor}"),
			None => break,
		}
	}

	assert_eq!(seen.len(), 5);
	assert!(seen.windows(2).all(|w| w[0] > w[1]));
}

#[tokio::test]
async fn degraded_mode_keeps_metadata_readable() {
	let server = setup_with_crypto(EncryptionService::unavailable("no key configured")).await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	let (status, body) = server.request(Method::GET, "/health", None, None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "degraded");
	assert_eq!(body["components"]["encryption"]["available"], false);

	let (status, body) = server
		.request(
			Method::POST,
			"/api/credentials",
			Some(&alice),
			Some(json!({
				"label": "Token",
				"type": "api_key",
				"payload": { "api_key": "k" },
			})),
		)
		.await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(body["error"], "crypto_unavailable");

	let (status, body) = server
		.request(Method::GET, "/api/settings", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["encryption_available"], false);

	let (status, _) = server
		.request(Method::GET, "/api/credentials", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn credential_types_are_listed() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	let (status, body) = server
		.request(Method::GET, "/api/credentials/types", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	let kinds: Vec<&str> = body
		.as_array()
		.unwrap()
		.iter()
		.map(|t| t["type"].as_str().unwrap())
		.collect();
	assert_eq!(
		kinds,
		vec!["username_password", "api_key", "ssh_key", "secure_note"]
	);
}

#[tokio::test]
async fn access_grants_survive_a_restart() {
	let server = setup().await;
	let admin = server.login("admin", ADMIN_PASSWORD).await;

	let (status, _) = server
		.request(Method::PUT, "/api/access/mallory", Some(&admin), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	let (status, _) = server
		.request(Method::DELETE, "/api/access/alice", Some(&admin), None)
		.await;
	assert_eq!(status, StatusCode::OK);

	let server = server.restart().await;
	let mallory = server.login("mallory", MALLORY_PASSWORD).await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	let (status, _) = server
		.request(Method::GET, "/api/credentials", Some(&mallory), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	let (status, _) = server
		.request(Method::GET, "/api/credentials", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn password_only_update_keeps_the_username() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;
	let id = server.create_login(&alice).await;

	let (status, body) = server
		.request(
			Method::PATCH,
			&format!("/api/credentials/{id}"),
			Some(&alice),
			Some(json!({ "payload": { "password": "rotated" } })),
		)
		.await;
	assert_eq!(status, StatusCode::OK, "update failed: {body}");

	let (status, body) = server
		.request(
			Method::POST,
			&format!("/api/credentials/{id}/reveal"),
			Some(&alice),
			None,
		)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["payload"]["username"], "svc");
	assert_eq!(body["payload"]["password"], "rotated");
}

#[tokio::test]
async fn malformed_ids_on_audited_actions_are_recorded() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	let (status, body) = server
		.request(
			Method::POST,
			"/api/credentials/not-a-uuid/reveal",
			Some(&alice),
			None,
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], "validation_error");

	let (status, _) = server
		.request(Method::DELETE, "/api/credentials/42", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let failures: Vec<(String, String)> = server
		.audit_chronological(&alice)
		.await
		.into_iter()
		.filter(|e| e["detail"]["outcome"] == "failure")
		.map(|e| {
			(
				e["action"].as_str().unwrap().to_string(),
				e["target_id"].as_str().unwrap().to_string(),
			)
		})
		.collect();
	assert_eq!(
		failures,
		vec![
			("view".to_string(), "not-a-uuid".to_string()),
			("delete".to_string(), "42".to_string()),
		]
	);
}

#[tokio::test]
async fn admins_can_run_maintenance_jobs_on_demand() {
	let server = setup().await;
	let admin = server.login("admin", ADMIN_PASSWORD).await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	let (status, _) = server
		.request(Method::POST, "/api/jobs/audit-retention/run", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, body) = server
		.request(Method::POST, "/api/jobs/audit-retention/run", Some(&admin), None)
		.await;
	assert_eq!(status, StatusCode::OK, "job run failed: {body}");
	assert_eq!(body["job"]["job_id"], "audit-retention");
	assert_eq!(body["job"]["state"], "healthy");
	assert_eq!(body["job"]["last_run"]["status"], "succeeded");
	assert_eq!(body["job"]["last_run"]["id"], body["run_id"]);

	let (status, body) = server
		.request(Method::POST, "/api/jobs/session-prune/run", Some(&admin), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["job"]["last_run"]["status"], "succeeded");

	let (status, body) = server
		.request(Method::POST, "/api/jobs/no-such-job/run", Some(&admin), None)
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn audit_action_catalogue_is_listed() {
	let server = setup().await;
	let alice = server.login("alice", ALICE_PASSWORD).await;

	let (status, body) = server
		.request(Method::GET, "/api/audit/actions", Some(&alice), None)
		.await;
	assert_eq!(status, StatusCode::OK);
	let actions = body.as_array().unwrap();
	assert_eq!(actions.len(), 13);
	assert_eq!(actions[0]["action"], "view");
	assert_eq!(actions[0]["label"], "Credential viewed");

	let (status, _) = server
		.request(Method::GET, "/api/audit/actions", None, None)
		.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}
