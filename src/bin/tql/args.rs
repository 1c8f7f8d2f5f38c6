use clap::{Parser, Subcommand, ValueEnum};
use toit_tql::context::Context;
use toit_tql::{Dialect, RenderOptions, TenantColumn, ValueTyping};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Creates a context.
    ///
    /// Contexts hold the tenant and rendering settings, so you don't have to pass them
    /// every time.
    CreateContext(ContextParams),
    /// Selects an existing context.
    UseContext { name: String },
    /// List available contexts.
    ListContexts,
    /// Translates a single query to SQL, using the current context.
    Translate {
        input: String,
        /// Overrides the tenant of the current context.
        #[arg(short, long)]
        tenant: Option<String>,
        /// Writes the values into the SQL instead of using placeholders. Only for reading.
        #[arg(long)]
        preview: bool,
    },
    /// Checks a query, without translating it.
    Validate { input: String },
    /// Lists the keywords that could come next.
    Suggest {
        input: String,
        /// Where the cursor is, in characters. Defaults to the end of the input.
        #[arg(short, long)]
        cursor: Option<usize>,
    },
    /// Runs the HTTP API.
    Server(ServerParams),
}

#[derive(clap::Args, Debug)]
pub struct ContextParams {
    /// You can reuse your context by referencing this name
    name: String,
    /// Tenant used when translating. You'll be asked for one if it's missing.
    #[arg(short, long)]
    pub tenant: Option<String>,
    #[arg(long, value_enum, default_value_t = DialectArg::Postgres)]
    dialect: DialectArg,
    /// How literal values are bound.
    #[arg(long, value_enum, default_value_t = TypingArg::Text)]
    typing: TypingArg,
    /// The column every table uses for the tenant id.
    #[arg(long, default_value = "tenant_id", value_parser = TenantColumn::new)]
    tenant_column: TenantColumn,
    /// Used for queries without LIMITE.
    #[arg(long)]
    default_limit: Option<u64>,
    /// Use the new context
    #[arg(long = "use")]
    pub use_it: bool,
}

#[derive(clap::Args, Debug)]
pub struct ServerParams {
    #[arg(long, default_value = "127.0.0.1:33333")]
    pub bind: String,
    /// Translations allowed per tenant, in each window.
    #[arg(long, default_value_t = 60)]
    pub max_requests: u32,
    #[arg(long, default_value_t = 60)]
    pub window_secs: u64,
    /// Only this origin is allowed by CORS. Any origin is allowed when missing.
    #[arg(long)]
    pub allow_origin: Option<String>,
}

#[derive(Debug, ValueEnum, Clone, Copy)]
pub enum DialectArg {
    Postgres,
    #[value(alias = "mysql")]
    Mariadb,
}

#[derive(Debug, ValueEnum, Clone, Copy)]
pub enum TypingArg {
    Text,
    Inferred,
}

impl ContextParams {
    pub fn into_context(self, tenant: String) -> Context {
        Context {
            name: self.name.into(),
            tenant: Some(tenant),
            options: RenderOptions {
                dialect: self.dialect.into(),
                value_typing: self.typing.into(),
                tenant_column: self.tenant_column,
                default_limit: self.default_limit,
            },
        }
    }
}

impl From<DialectArg> for Dialect {
    fn from(value: DialectArg) -> Self {
        match value {
            DialectArg::Postgres => Self::Postgres,
            DialectArg::Mariadb => Self::MariaDb,
        }
    }
}

impl From<TypingArg> for ValueTyping {
    fn from(value: TypingArg) -> Self {
        match value {
            TypingArg::Text => Self::Text,
            TypingArg::Inferred => Self::Inferred,
        }
    }
}
