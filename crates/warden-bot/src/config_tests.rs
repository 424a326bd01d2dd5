#[cfg(test)]
mod tests {
    use crate::actions::GuardedAction;
    use crate::config::{Config, GuardSettings, ReadEnv};
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    struct InMemoryEnv(HashMap<&'static str, &'static str>);

    impl InMemoryEnv {
        fn new(pairs: &[(&'static str, &'static str)]) -> Self {
            Self(pairs.iter().cloned().collect())
        }
    }

    impl ReadEnv for InMemoryEnv {
        fn var(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── from_file ─────────────────────────────────────────────────────────────

    #[test]
    fn test_from_file_minimal() {
        let toml = r#"
[discord]
bot_token = "BOT-TOKEN-123"
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.discord.bot_token, "BOT-TOKEN-123");
        assert_eq!(cfg.discord.ticket_category_id, None);
        assert_eq!(cfg.guard.max_ttl_secs, 600);
        assert_eq!(cfg.guard.sweep_interval_secs, 60);
        assert!(cfg.guard.ttl_overrides.is_empty());
    }

    #[test]
    fn test_from_file_full() {
        let toml = r#"
[discord]
bot_token = "SECRET"
ticket_category_id = 100
staff_role_id = 200
staff_channel_id = 300
suggestion_channel_id = 400

[guard]
max_ttl_secs = 120
sweep_interval_secs = 30

[guard.ttl_overrides]
ticket_create = 45
notify = 90
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.discord.ticket_category_id, Some(100));
        assert_eq!(cfg.discord.staff_role_id, Some(200));
        assert_eq!(cfg.discord.staff_channel_id, Some(300));
        assert_eq!(cfg.discord.suggestion_channel_id, Some(400));
        assert_eq!(cfg.guard.max_ttl_secs, 120);
        assert_eq!(cfg.guard.sweep_interval(), Duration::from_secs(30));
        assert_eq!(
            cfg.guard.ttl_for(GuardedAction::TicketCreate),
            Duration::from_secs(45)
        );
        assert_eq!(
            cfg.guard.ttl_for(GuardedAction::StaffNotify),
            Duration::from_secs(90)
        );
        assert_eq!(
            cfg.guard.ttl_for(GuardedAction::TicketClose),
            GuardedAction::TicketClose.default_ttl()
        );
        assert_eq!(
            cfg.guard.guard_config().max_ttl,
            Duration::from_secs(120)
        );
        assert!(cfg.warnings().is_empty());
    }

    #[test]
    fn test_from_file_missing_returns_error() {
        let result = Config::from_file("/nonexistent/path/config.toml");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to read config file"));
    }

    #[test]
    fn test_from_file_invalid_toml_returns_error() {
        let f = write_toml("this is not valid toml !!!");
        let result = Config::from_file(f.path().to_str().unwrap());
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to parse config file"));
    }

    #[test]
    fn test_sweep_interval_never_zero() {
        let toml = r#"
[discord]
bot_token = "TOK"

[guard]
sweep_interval_secs = 0
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.guard.sweep_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_from_file_zero_max_ttl_returns_error() {
        let toml = r#"
[discord]
bot_token = "TOK"

[guard]
max_ttl_secs = 0
"#;
        let f = write_toml(toml);
        let err = Config::from_file(f.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Invalid guard settings"));
        assert!(format!("{:#}", err).contains("max_ttl_secs must be at least 1"));
    }

    #[test]
    fn test_from_file_zero_ttl_override_returns_error() {
        let toml = r#"
[discord]
bot_token = "TOK"

[guard.ttl_overrides]
ticket_create = 0
notify = 0
suggestion_submit = 5
"#;
        let f = write_toml(toml);
        let err = Config::from_file(f.path().to_str().unwrap()).unwrap_err();
        assert!(format!("{:#}", err).contains("notify, ticket_create"));
    }

    // ── warnings ──────────────────────────────────────────────────────────────

    #[test]
    fn test_warnings_flag_unknown_and_oversized_overrides() {
        let toml = r#"
[discord]
bot_token = "TOK"
staff_role_id = 1
staff_channel_id = 2
suggestion_channel_id = 3

[guard]
max_ttl_secs = 60

[guard.ttl_overrides]
ticket_reopen = 10
ticket_close = 900
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        let warnings = cfg.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("unknown action 'ticket_reopen'")));
        assert!(warnings.iter().any(|w| w.contains("'ticket_close' (900s) exceeds")));
    }

    #[test]
    fn test_warnings_flag_missing_channels() {
        let env = InMemoryEnv::new(&[("DISCORD_BOT_TOKEN", "tok")]);
        let cfg = Config::from_env_impl(&env).unwrap();
        let warnings = cfg.warnings();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.starts_with("staff_role_id not set")));
        assert!(warnings.iter().any(|w| w.starts_with("staff_channel_id not set")));
        assert!(warnings.iter().any(|w| w.starts_with("suggestion_channel_id not set")));
    }

    // ── from_env ──────────────────────────────────────────────────────────────

    #[test]
    fn test_from_env_missing_token_returns_error() {
        let env = InMemoryEnv::new(&[]);
        let result = Config::from_env_impl(&env);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_env_reads_ids() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "env-token-abc"),
            ("WARDEN_TICKET_CATEGORY_ID", "11"),
            ("WARDEN_STAFF_ROLE_ID", " 22 "),
            ("WARDEN_STAFF_CHANNEL_ID", "33"),
            ("WARDEN_SUGGESTION_CHANNEL_ID", "44"),
        ]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.discord.bot_token, "env-token-abc");
        assert_eq!(cfg.discord.ticket_category_id, Some(11));
        assert_eq!(cfg.discord.staff_role_id, Some(22));
        assert_eq!(cfg.discord.staff_channel_id, Some(33));
        assert_eq!(cfg.discord.suggestion_channel_id, Some(44));
    }

    #[test]
    fn test_from_env_empty_id_is_unset() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("WARDEN_STAFF_ROLE_ID", ""),
        ]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.discord.staff_role_id, None);
    }

    #[test]
    fn test_from_env_invalid_id_returns_error() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("WARDEN_STAFF_CHANNEL_ID", "general"),
        ]);
        let err = Config::from_env_impl(&env).unwrap_err();
        assert!(err.to_string().contains("WARDEN_STAFF_CHANNEL_ID"));
    }

    #[test]
    fn test_from_env_guard_defaults() {
        let env = InMemoryEnv::new(&[("DISCORD_BOT_TOKEN", "tok")]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.guard.max_ttl_secs, 600);
        assert_eq!(cfg.guard.sweep_interval_secs, 60);
        assert!(cfg.guard.ttl_overrides.is_empty());
    }

    #[test]
    fn test_from_env_guard_settings() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("WARDEN_GUARD_MAX_TTL_SECS", "300"),
            ("WARDEN_GUARD_SWEEP_INTERVAL_SECS", "120"),
            ("WARDEN_GUARD_TTL_OVERRIDES", "ticket_create=45, notify = 600,"),
        ]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.guard.max_ttl_secs, 300);
        assert_eq!(cfg.guard.sweep_interval_secs, 120);
        assert_eq!(cfg.guard.ttl_overrides.get("ticket_create"), Some(&45));
        assert_eq!(cfg.guard.ttl_overrides.get("notify"), Some(&600));
    }

    #[test]
    fn test_from_env_malformed_override_returns_error() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("WARDEN_GUARD_TTL_OVERRIDES", "ticket_create"),
        ]);
        let err = Config::from_env_impl(&env).unwrap_err();
        assert!(err.to_string().contains("is not action=secs"));

        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("WARDEN_GUARD_TTL_OVERRIDES", "ticket_create=soon"),
        ]);
        let err = Config::from_env_impl(&env).unwrap_err();
        assert!(err.to_string().contains("invalid number"));
    }

    #[test]
    fn test_from_env_zero_max_ttl_returns_error() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("WARDEN_GUARD_MAX_TTL_SECS", "0"),
        ]);
        let err = Config::from_env_impl(&env).unwrap_err();
        assert!(err.to_string().contains("Invalid guard settings in environment"));
        assert!(format!("{:#}", err).contains("max_ttl_secs must be at least 1"));
    }

    #[test]
    fn test_guard_settings_validate() {
        let mut settings = GuardSettings::default();
        assert!(settings.validate().is_ok());

        settings.ttl_overrides.insert("ticket_close".to_string(), 0);
        assert!(settings.validate().is_err());

        settings.ttl_overrides.insert("ticket_close".to_string(), 1);
        settings.max_ttl_secs = 0;
        assert!(settings.validate().is_err());
    }
}
