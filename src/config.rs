use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub expiry_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub jwt: JwtConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "quillbox".into()),
            expiry_hours: std::env::var("JWT_EXPIRY")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };

        let admin = AdminConfig {
            username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            password: std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into()),
            email: std::env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@example.com".into()),
        };

        Ok(Self {
            database_url,
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".into())
                .into(),
            jwt,
            admin,
        })
    }
}
