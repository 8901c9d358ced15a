//! InspectorService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    use inspector_types::{
        AdminLoginRequest, AnalyzerError, AppError, DashboardRepository, ErrorMapping,
        ExtractedInfo, GatewayAccess, LoginRequest, MdrQuery, MessageAnalyzer, NumberListInput,
        ProviderError, ProxySettings, RepoError, SignupRequest, SmsGateway, SmsRecord,
        SmsSearchRequest, UpdateProfileRequest, UpdateSettingsRequest, User, UserId, UserStatus,
    };

    use crate::outbound::PatternAnalyzer;
    use crate::service::{API_KEY_MISSING, INVALID_FILTER};
    use crate::{AdminCredentials, InspectorService};

    /// Simple in-memory repository for testing the service layer.
    #[derive(Default)]
    pub struct MockRepo {
        users: Mutex<HashMap<UserId, User>>,
        settings: Mutex<Vec<(String, Value)>>,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self::default()
        }

        fn update<F>(&self, id: UserId, f: F) -> Option<User>
        where
            F: FnOnce(&mut User),
        {
            let mut users = self.users.lock().unwrap();
            let user = users.get_mut(&id)?;
            f(user);
            Some(user.clone())
        }
    }

    #[async_trait]
    impl DashboardRepository for MockRepo {
        async fn create_user(&self, user: User) -> Result<User, RepoError> {
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.email == user.email) {
                return Err(RepoError::Conflict("User with this email already exists.".into()));
            }
            users.insert(user.id, user.clone());
            Ok(user)
        }

        async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn list_users(&self) -> Result<Vec<User>, RepoError> {
            let mut users: Vec<User> = self.users.lock().unwrap().values().cloned().collect();
            users.sort_by_key(|u| u.created_at);
            Ok(users)
        }

        async fn update_user_status(
            &self,
            id: UserId,
            status: UserStatus,
        ) -> Result<Option<User>, RepoError> {
            Ok(self.update(id, |u| u.status = status))
        }

        async fn update_user_number_permission(
            &self,
            id: UserId,
            can_add_numbers: bool,
        ) -> Result<Option<User>, RepoError> {
            Ok(self.update(id, |u| u.can_add_numbers = can_add_numbers))
        }

        async fn update_user_profile(
            &self,
            id: UserId,
            name: &str,
            email: &str,
        ) -> Result<Option<User>, RepoError> {
            Ok(self.update(id, |u| {
                u.name = name.to_string();
                u.email = email.to_string();
            }))
        }

        async fn get_setting(&self, key: &str) -> Result<Option<Value>, RepoError> {
            Ok(self
                .settings
                .lock()
                .unwrap()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()))
        }

        async fn list_settings(&self) -> Result<Vec<(String, Value)>, RepoError> {
            Ok(self.settings.lock().unwrap().clone())
        }

        async fn put_settings(&self, entries: Vec<(String, Value)>) -> Result<(), RepoError> {
            let mut settings = self.settings.lock().unwrap();
            for (key, value) in entries {
                match settings.iter_mut().find(|(k, _)| *k == key) {
                    Some(slot) => slot.1 = value,
                    None => settings.push((key, value)),
                }
            }
            Ok(())
        }
    }

    /// Gateway returning canned records, or failing with a fixed message.
    #[derive(Default)]
    pub struct StubGateway {
        records: Vec<SmsRecord>,
        fetch_error: Option<String>,
        proxy_error: Option<String>,
        fetch_calls: AtomicUsize,
        probe_calls: AtomicUsize,
        last_access: Mutex<Option<GatewayAccess>>,
    }

    #[async_trait]
    impl SmsGateway for StubGateway {
        async fn fetch_records(
            &self,
            _query: &MdrQuery,
            access: &GatewayAccess,
        ) -> Result<Vec<SmsRecord>, ProviderError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_access.lock().unwrap() = Some(access.clone());
            match &self.fetch_error {
                Some(msg) => Err(ProviderError::Api(msg.clone())),
                None => Ok(self.records.clone()),
            }
        }

        async fn check_proxy(&self, proxy: &ProxySettings) -> Result<String, ProviderError> {
            self.probe_calls.fetch_add(1, Ordering::SeqCst);
            match &self.proxy_error {
                Some(msg) => Err(ProviderError::Proxy(msg.clone())),
                None => Ok(proxy.ip.clone()),
            }
        }
    }

    /// Analyzer whose backend is always down.
    pub struct FailingAnalyzer;

    #[async_trait]
    impl MessageAnalyzer for FailingAnalyzer {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn extract(&self, _message: &str) -> Result<ExtractedInfo, AnalyzerError> {
            Err(AnalyzerError::Request("connection refused".into()))
        }

        async fn summarize(&self, _message: &str) -> Result<String, AnalyzerError> {
            Err(AnalyzerError::InvalidResponse("no candidates".into()))
        }
    }

    fn admin_credentials() -> AdminCredentials {
        AdminCredentials {
            username: "admin".into(),
            password: "panel-pass".into(),
        }
    }

    fn service_with(gateway: Arc<StubGateway>) -> InspectorService<MockRepo> {
        InspectorService::new(
            MockRepo::new(),
            gateway,
            Arc::new(PatternAnalyzer::new()),
            admin_credentials(),
        )
    }

    fn service() -> InspectorService<MockRepo> {
        service_with(Arc::new(StubGateway::default()))
    }

    fn record(phone: &str, at: &str, message: &str) -> SmsRecord {
        SmsRecord {
            date_time: at.into(),
            sender_id: "Telegram".into(),
            phone: phone.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    fn search(start: (i32, u32, u32), end: (i32, u32, u32)) -> SmsSearchRequest {
        SmsSearchRequest {
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            sender_id: None,
            phone: None,
            page: None,
            per_page: None,
        }
    }

    fn signup_req(email: &str) -> SignupRequest {
        SignupRequest {
            name: "Alice".into(),
            email: email.into(),
            password: "correct-horse".into(),
        }
    }

    async fn set_api_key(service: &InspectorService<MockRepo>) {
        service
            .update_settings(UpdateSettingsRequest {
                api_key: Some("key-123".into()),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // SMS
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_fetch_without_api_key_is_unavailable() {
        let gateway = Arc::new(StubGateway::default());
        let service = service_with(gateway.clone());

        let result = service.fetch_sms(search((2024, 5, 1), (2024, 5, 1))).await;

        assert!(matches!(result, Err(AppError::Unavailable(msg)) if msg == API_KEY_MISSING));
        assert_eq!(gateway.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_rejects_reversed_dates() {
        let service = service();
        set_api_key(&service).await;

        let result = service.fetch_sms(search((2024, 5, 2), (2024, 5, 1))).await;

        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == INVALID_FILTER));
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_page() {
        let service = service();
        set_api_key(&service).await;

        let mut req = search((2024, 5, 1), (2024, 5, 1));
        req.per_page = Some(5000);

        assert!(matches!(
            service.fetch_sms(req).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_rejects_zero_page_and_page_size() {
        let gateway = Arc::new(StubGateway::default());
        let service = service_with(gateway.clone());
        set_api_key(&service).await;

        let mut zero_page = search((2024, 5, 1), (2024, 5, 1));
        zero_page.page = Some(0);
        let mut zero_size = search((2024, 5, 1), (2024, 5, 1));
        zero_size.per_page = Some(0);

        for req in [zero_page, zero_size] {
            let result = service.fetch_sms(req).await;
            assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == INVALID_FILTER));
        }
        assert_eq!(gateway.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_groups_records_by_phone() {
        let gateway = Arc::new(StubGateway {
            records: vec![
                record("111", "2024-05-01 10:05:00", "second"),
                record("222", "2024-05-01 09:00:00", "other"),
                record("111", "2024-05-01 10:00:00", "first"),
            ],
            ..Default::default()
        });
        let service = service_with(gateway.clone());
        set_api_key(&service).await;

        let result = service
            .fetch_sms(search((2024, 5, 1), (2024, 5, 1)))
            .await
            .unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.groups[0].phone, "111");
        assert_eq!(result.groups[0].messages[0].message, "first");

        let access = gateway.last_access.lock().unwrap().clone().unwrap();
        assert_eq!(access.api_key, "key-123");
        assert!(access.proxy.is_none());
    }

    #[tokio::test]
    async fn test_fetch_error_is_rewritten_by_mapping() {
        let gateway = Arc::new(StubGateway {
            fetch_error: Some("Invalid API key".into()),
            ..Default::default()
        });
        let service = service_with(gateway);
        service
            .update_settings(UpdateSettingsRequest {
                api_key: Some("bad".into()),
                error_mappings: Some(vec![ErrorMapping {
                    pattern: "invalid api KEY".into(),
                    message: "Ask the admin to renew the key.".into(),
                }]),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = service.fetch_sms(search((2024, 5, 1), (2024, 5, 1))).await;

        assert!(
            matches!(result, Err(AppError::Upstream(msg)) if msg == "Ask the admin to renew the key.")
        );
    }

    #[tokio::test]
    async fn test_fetch_error_without_mapping_keeps_raw_text() {
        let gateway = Arc::new(StubGateway {
            fetch_error: Some("Invalid filter".into()),
            ..Default::default()
        });
        let service = service_with(gateway);
        set_api_key(&service).await;

        let result = service.fetch_sms(search((2024, 5, 1), (2024, 5, 1))).await;

        assert!(
            matches!(result, Err(AppError::Upstream(msg)) if msg == "API returned an error: Invalid filter")
        );
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_message() {
        let service = service();
        assert!(matches!(
            service.analyze_message("   ").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_analyze_uses_pattern_analyzer() {
        let service = service();

        let result = service
            .analyze_message("Your code is 482913. Visit https://t.me/login")
            .await
            .unwrap();

        assert_eq!(result.analyzer, "pattern");
        assert_eq!(result.info.confirmation_code.as_deref(), Some("482913"));
        assert_eq!(result.info.link.as_deref(), Some("https://t.me/login"));
        assert!(result.segments.len() >= 3);
    }

    #[tokio::test]
    async fn test_summarize_rejects_empty_message() {
        let service = service();
        assert!(matches!(
            service.summarize_message("\n  ").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_summarize_returns_first_sentence() {
        let service = service();

        let result = service
            .summarize_message("Your code is 482913. Do not share it with anyone.")
            .await
            .unwrap();

        assert_eq!(result.summary, "Your code is 482913.");
    }

    #[tokio::test]
    async fn test_analyzer_failure_is_upstream() {
        let service = InspectorService::new(
            MockRepo::new(),
            Arc::new(StubGateway::default()),
            Arc::new(FailingAnalyzer),
            admin_credentials(),
        );

        let extracted = service.analyze_message("code 1234").await;
        assert!(
            matches!(extracted, Err(AppError::Upstream(msg)) if msg.contains("connection refused"))
        );

        let summary = service.summarize_message("code 1234").await;
        assert!(matches!(summary, Err(AppError::Upstream(msg)) if msg.contains("no candidates")));
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_failed_proxy_probe_persists_nothing() {
        let gateway = Arc::new(StubGateway {
            proxy_error: Some("connection refused".into()),
            ..Default::default()
        });
        let service = service_with(gateway.clone());

        let result = service
            .update_settings(UpdateSettingsRequest {
                api_key: Some("new-key".into()),
                proxy_settings: Some(ProxySettings {
                    ip: "203.0.113.7".into(),
                    port: 8080,
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await;

        assert!(
            matches!(result, Err(AppError::BadRequest(msg)) if msg.starts_with("Proxy test failed"))
        );
        assert_eq!(gateway.probe_calls.load(Ordering::SeqCst), 1);
        assert!(service.admin_settings().await.unwrap().api_key.is_empty());
    }

    #[tokio::test]
    async fn test_working_proxy_is_saved() {
        let gateway = Arc::new(StubGateway::default());
        let service = service_with(gateway);

        let response = service
            .update_settings(UpdateSettingsRequest {
                proxy_settings: Some(ProxySettings {
                    ip: "203.0.113.7".into(),
                    port: 8080,
                    username: "u".into(),
                    password: "p".into(),
                }),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(response.proxy_check.as_deref(), Some("203.0.113.7"));
        let proxy = response.settings.proxy_settings.unwrap();
        assert_eq!(proxy.port, 8080);
    }

    #[tokio::test]
    async fn test_empty_proxy_host_clears_without_probe() {
        let gateway = Arc::new(StubGateway {
            proxy_error: Some("should not be called".into()),
            ..Default::default()
        });
        let service = service_with(gateway.clone());

        let response = service
            .update_settings(UpdateSettingsRequest {
                proxy_settings: Some(ProxySettings::default()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(response.settings.proxy_settings.is_none());
        assert!(response.proxy_check.is_none());
        assert_eq!(gateway.probe_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_primary_color_rejected() {
        let service = service();

        let result = service
            .update_settings(UpdateSettingsRequest {
                primary_color: Some("#ff0000".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let ok = service
            .update_settings(UpdateSettingsRequest {
                primary_color: Some("217.2 91.2% 59.8%".into()),
                site_name: Some("  Relay Desk ".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ok.settings.primary_color, "217.2 91.2% 59.8%");
        assert_eq!(ok.settings.site_name, "Relay Desk");
    }

    #[tokio::test]
    async fn test_blank_error_mappings_dropped() {
        let service = service();

        let response = service
            .update_settings(UpdateSettingsRequest {
                error_mappings: Some(vec![
                    ErrorMapping {
                        pattern: " ".into(),
                        message: "ignored".into(),
                    },
                    ErrorMapping {
                        pattern: "timeout".into(),
                        message: "Provider is slow.".into(),
                    },
                ]),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(response.settings.error_mappings.len(), 1);
        assert_eq!(response.settings.error_mappings[0].pattern, "timeout");
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_signup_and_login() {
        let service = service();

        let user = service.signup(signup_req("Alice@Example.com")).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "correct-horse");

        let logged_in = service
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "correct-horse".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_email() {
        let service = service();

        let result = service
            .login(LoginRequest {
                email: "not-an-email".into(),
                password: "whatever".into(),
            })
            .await;

        assert!(
            matches!(result, Err(AppError::BadRequest(msg)) if msg == "Please enter a valid email.")
        );
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = service();
        service.signup(signup_req("alice@example.com")).await.unwrap();

        let result = service
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "wrong-password".into(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let service = service();
        service.signup(signup_req("alice@example.com")).await.unwrap();

        let result = service.signup(signup_req("ALICE@example.com")).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_signup_disabled() {
        let service = service();
        service
            .update_settings(UpdateSettingsRequest {
                signup_enabled: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = service.signup(signup_req("alice@example.com")).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_signup_short_password() {
        let service = service();
        let mut req = signup_req("alice@example.com");
        req.password = "short".into();

        let result = service.signup(req).await;

        assert!(
            matches!(result, Err(AppError::BadRequest(msg)) if msg == "Password must be at least 8 characters.")
        );
    }

    #[tokio::test]
    async fn test_email_change_disabled() {
        let service = service();
        let user = service.signup(signup_req("alice@example.com")).await.unwrap();
        service
            .update_settings(UpdateSettingsRequest {
                email_change_enabled: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();

        let rename = service
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    name: "Alice B".into(),
                    email: "alice@example.com".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(rename.name, "Alice B");

        let result = service
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    name: "Alice B".into(),
                    email: "new@example.com".into(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_profile_email_taken() {
        let service = service();
        let alice = service.signup(signup_req("alice@example.com")).await.unwrap();
        service.signup(signup_req("bob@example.com")).await.unwrap();

        let result = service
            .update_profile(
                alice.id,
                UpdateProfileRequest {
                    name: "Alice".into(),
                    email: "bob@example.com".into(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_admin_login() {
        let service = service();

        assert!(
            service
                .admin_login(&AdminLoginRequest {
                    username: "admin".into(),
                    password: "panel-pass".into(),
                })
                .is_ok()
        );
        assert!(matches!(
            service.admin_login(&AdminLoginRequest {
                username: "admin".into(),
                password: "nope".into(),
            }),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_block_unknown_user() {
        let service = service();

        let result = service.set_user_status(UserId::new(), UserStatus::Blocked).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_block_and_permission_updates() {
        let service = service();
        let user = service.signup(signup_req("alice@example.com")).await.unwrap();

        let blocked = service
            .set_user_status(user.id, UserStatus::Blocked)
            .await
            .unwrap();
        assert_eq!(blocked.status, UserStatus::Blocked);

        let granted = service
            .set_add_number_permission(user.id, true)
            .await
            .unwrap();
        assert!(granted.can_add_numbers);

        let users = service.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Number list
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_add_numbers_requires_permission() {
        let service = service();
        let user = service.signup(signup_req("alice@example.com")).await.unwrap();

        let result = service
            .add_numbers(&user, NumberListInput::Text("123".into()))
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_add_numbers_merges() {
        let service = service();
        let user = service.signup(signup_req("alice@example.com")).await.unwrap();
        let user = service
            .repo()
            .update_user_number_permission(user.id, true)
            .await
            .unwrap()
            .unwrap();
        service
            .replace_number_list(NumberListInput::List(vec!["111".into(), "222".into()]))
            .await
            .unwrap();

        let merged = service
            .add_numbers(&user, NumberListInput::Text("222\n333, 111\n".into()))
            .await
            .unwrap();

        assert_eq!(merged, vec!["111", "222", "333"]);
        assert_eq!(service.number_list().await.unwrap(), merged);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let service = service();

        assert!(service.ensure_admin("admin@example.com", "secret-pass").await.unwrap());
        assert!(!service.ensure_admin("ADMIN@example.com", "other").await.unwrap());

        let admin = service
            .repo()
            .find_user_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin);
        assert!(admin.may_add_numbers());
    }

    #[tokio::test]
    async fn test_seed_api_key_keeps_existing() {
        let service = service();

        assert!(!service.seed_api_key("  ").await.unwrap());
        assert!(service.seed_api_key("first").await.unwrap());
        assert!(!service.seed_api_key("second").await.unwrap());

        let stored = service.repo().get_setting("apiKey").await.unwrap();
        assert_eq!(stored, Some(json!("first")));
    }
}
