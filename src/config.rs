use std::env;

/// Credential-handling knobs, grouped so the code that needs them receives
/// them explicitly instead of reading the environment at the call site.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Cost used when producing new password hashes.
    pub hash_cost: u32,
    /// Stored hashes below this cost are upgraded on the next successful login.
    pub minimum_hash_cost: u32,
    /// Passwords shorter than this are rejected at registration.
    pub minimum_password_length: usize,
    /// Consecutive failed logins per username before the monitor reports exhaustion.
    pub max_login_attempts: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // Two over the library baseline; each increment roughly doubles
            // the work factor.
            hash_cost: bcrypt::DEFAULT_COST + 2,
            minimum_hash_cost: bcrypt::DEFAULT_COST,
            minimum_password_length: 16,
            max_login_attempts: 10,
        }
    }
}

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    /// Key material for the session cookie codec; must be at least 32 bytes.
    pub cookie_key: String,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = AuthConfig::default();

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            cookie_key: env::var("COOKIE_KEY").expect("COOKIE_KEY must be set"),
            auth: AuthConfig {
                hash_cost: env_or("HASH_COST", defaults.hash_cost),
                minimum_hash_cost: env_or("MIN_HASH_COST", defaults.minimum_hash_cost),
                minimum_password_length: env_or(
                    "MIN_PASSWORD_LENGTH",
                    defaults.minimum_password_length,
                ),
                max_login_attempts: env_or("MAX_LOGIN_ATTEMPTS", defaults.max_login_attempts),
            },
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{} must be a number", key)),
        Err(_) => default,
    }
}
