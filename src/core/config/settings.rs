use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64,
};
use super::types::{
    AiSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, DispatchSettings,
    RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
    VivaSettings, WorkerSettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("IVIVA_HOST", "0.0.0.0");
        let port = env_or_default("IVIVA_PORT", "8000");

        let environment =
            parse_environment(env_optional("IVIVA_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("IVIVA_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "IVIVA API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "iviva");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "iviva_db");
        let database_url = env_optional("DATABASE_URL");

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "");
        let generation_model = env_or_default("GENERATION_MODEL", "gpt-4o");
        let viva_model = env_or_default("VIVA_MODEL", "gpt-4o-mini");
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "4096"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "120"))?;

        let ready_retries =
            parse_u32("QUEUE_READY_RETRIES", env_or_default("QUEUE_READY_RETRIES", "3"))?.max(1);
        let ready_delay_seconds =
            parse_u64("QUEUE_READY_DELAY_SEC", env_or_default("QUEUE_READY_DELAY_SEC", "2"))?;

        let worker_concurrency =
            parse_u32("WORKER_CONCURRENCY", env_or_default("WORKER_CONCURRENCY", "3"))?;
        let worker_poll_interval = parse_u64(
            "WORKER_POLL_INTERVAL_SECONDS",
            env_or_default("WORKER_POLL_INTERVAL_SECONDS", "2"),
        )?;
        let max_job_attempts =
            parse_u32("WORKER_MAX_JOB_ATTEMPTS", env_or_default("WORKER_MAX_JOB_ATTEMPTS", "5"))?;
        let retry_delay_seconds = parse_u64(
            "WORKER_RETRY_DELAY_SECONDS",
            env_or_default("WORKER_RETRY_DELAY_SECONDS", "30"),
        )?;

        let session_ttl_minutes = parse_u64(
            "VIVA_SESSION_TTL_MINUTES",
            env_or_default("VIVA_SESSION_TTL_MINUTES", "120"),
        )?;

        let log_level = env_or_default("IVIVA_LOG_LEVEL", "info");
        let json = env_optional("IVIVA_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                generation_model,
                viva_model,
                ai_max_tokens,
                ai_request_timeout,
            },
            dispatch: DispatchSettings { ready_retries, ready_delay_seconds },
            worker: WorkerSettings {
                concurrency: worker_concurrency,
                poll_interval_seconds: worker_poll_interval,
                max_job_attempts,
                retry_delay_seconds,
            },
            viva: VivaSettings { session_ttl_minutes },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn dispatch(&self) -> &DispatchSettings {
        &self.dispatch
    }

    pub(crate) fn worker(&self) -> &WorkerSettings {
        &self.worker
    }

    pub(crate) fn viva(&self) -> &VivaSettings {
        &self.viva
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.worker.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "WORKER_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        if self.worker.max_job_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "WORKER_MAX_JOB_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.ai.openai_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_API_KEY"));
        }
        if self.ai.openai_base_url.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_BASE_URL"));
        }

        Ok(())
    }
}
