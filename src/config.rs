use clap::Parser;
use sqlx::postgres::PgConnectOptions;

use crate::collectors::FetchQuery;
use crate::collectors::headhunter::{DEFAULT_EMPLOYERS, DEFAULT_PAGES, DEFAULT_PER_PAGE};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "vacancy-etl",
    about = "Load HeadHunter vacancies into PostgreSQL and print salary reports"
)]
pub struct Config {
    #[command(flatten)]
    pub db: DbSettings,

    /// Base URL of the HeadHunter API
    #[arg(long, env = "HH_API_URL", default_value = "https://api.hh.ru")]
    pub api_url: String,

    /// User-Agent sent with every API request
    #[arg(long, env = "HH_USER_AGENT", default_value = "HH-User-Agent")]
    pub user_agent: String,

    /// Keyword used by the vacancy name search in the report
    #[arg(long, env = "REPORT_KEYWORD", default_value = "python")]
    pub report_keyword: String,

    /// Skip items that fail validation instead of aborting the batch
    #[arg(long)]
    pub skip_invalid: bool,

    /// Keep everything in memory instead of writing to PostgreSQL
    #[arg(long)]
    pub dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DbSettings {
    /// PostgreSQL host
    #[arg(long = "db-host", env = "DB_HOST", default_value = "localhost")]
    pub host: String,

    /// PostgreSQL port
    #[arg(long = "db-port", env = "DB_PORT", default_value = "5432")]
    pub port: u16,

    /// Database holding the vacancy tables (created if absent)
    #[arg(long = "db-name", env = "DB_NAME")]
    pub database_name: String,

    /// PostgreSQL user
    #[arg(long = "db-user", env = "DB_USER")]
    pub user: String,

    /// PostgreSQL password
    #[arg(long = "db-password", env = "DB_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Page through the keyword search (default when no subcommand given)
    Search {
        /// Search text
        #[arg(long, env = "SEARCH_KEYWORD", default_value = "python")]
        keyword: String,

        /// Number of result pages to request
        #[arg(long, default_value_t = DEFAULT_PAGES)]
        pages: u32,

        /// Items per page
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,
    },
    /// Fetch open vacancies of a fixed list of employers
    Employers {
        /// Employer id; repeat to pass several. Defaults to the built-in list.
        #[arg(long = "employer-id")]
        employer_ids: Vec<i64>,

        /// Items per employer
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,
    },
}

impl Config {
    /// Resolve the command into a fetch query, defaulting to a keyword search.
    pub fn fetch_query(&self) -> FetchQuery {
        match self.command.clone() {
            None => FetchQuery::Keyword {
                text: std::env::var("SEARCH_KEYWORD").unwrap_or_else(|_| "python".to_string()),
                pages: DEFAULT_PAGES,
                per_page: DEFAULT_PER_PAGE,
            },
            Some(Command::Search {
                keyword,
                pages,
                per_page,
            }) => FetchQuery::Keyword {
                text: keyword,
                pages,
                per_page,
            },
            Some(Command::Employers {
                employer_ids,
                per_page,
            }) => {
                let ids = if employer_ids.is_empty() {
                    DEFAULT_EMPLOYERS.to_vec()
                } else {
                    employer_ids
                };
                FetchQuery::Employers { ids, per_page }
            }
        }
    }
}

impl DbSettings {
    /// Options for the configured vacancy database.
    pub fn connect_options(&self) -> PgConnectOptions {
        self.options_for(&self.database_name)
    }

    /// Options for the `postgres` maintenance database used while provisioning.
    pub fn maintenance_options(&self) -> PgConnectOptions {
        self.options_for("postgres")
    }

    fn options_for(&self, database: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(database)
    }
}
