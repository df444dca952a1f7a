pub use self::parser::{Config, DatabaseConfig, DbType, LoggingConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;
