use std::env;

use crate::DEFAULT_PORT;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/empowerhub";

/// Runtime configuration, read from the environment once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("EMPOWERHUB_PORT")
            .map(|x| x.parse::<u16>().expect("Port must be a number"))
            .unwrap_or(DEFAULT_PORT);

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        Self { port, database_url }
    }
}
