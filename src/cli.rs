//! Command-line interface for relayprobe
//!
//! Provides argument parsing and subcommand handling for the relayprobe binary.

use clap::{Parser, Subcommand};

/// On-demand connectivity tester for upstream completion API accounts
#[derive(Parser)]
#[command(name = "relayprobe")]
#[command(version)]
#[command(about = "On-demand connectivity tester for upstream completion API accounts")]
#[command(
    long_about = "relayprobe serves an admin API that checks whether a configured upstream \
    account can open a streaming completion for a chosen model, through the account's own \
    credential, user agent, and proxy."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Run one connectivity test and print the outcome as JSON
    ///
    /// Exits with status 1 when the test fails.
    Test {
        /// Account id as declared in `[[accounts]]`
        account_id: String,

        /// Model identifier to test, e.g. claude-sonnet-4-6
        #[arg(short, long)]
        model: String,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# relayprobe Configuration
# =========================
#
# Configures the admin HTTP server, connectivity test behaviour, and the
# upstream accounts that can be tested.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "127.0.0.1"

# Port to listen on
port = 3000

# ─────────────────────────────────────────────────────────────────────────────
# CONNECTIVITY TESTS
# ─────────────────────────────────────────────────────────────────────────────

[probe]
# Upper bound on connect plus first stream signal (1..=300000)
timeout_ms = 30000

# TCP/TLS connect bound, must not exceed timeout_ms
connect_timeout_ms = 10000

# "first_event": success once the first complete SSE event arrives
# "first_byte":  success as soon as any response body byte arrives
stream_criterion = "first_event"

# Bytes read while waiting for the first complete event
max_first_event_bytes = 65536

# Bytes of a non-2xx body quoted in the error message
max_error_body_bytes = 2048

# Sent when an account has no user_agent of its own
default_user_agent = "claude-cli/1.0.119 (external, cli)"

anthropic_version = "2023-06-01"

# ─────────────────────────────────────────────────────────────────────────────
# ADMIN AUTHENTICATION
# ─────────────────────────────────────────────────────────────────────────────

[admin]
# When set, /admin/* requires "Authorization: Bearer <token>"
# token = "change-me"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# trace, debug, info, warn, error (RUST_LOG overrides)
log_level = "info"

# ─────────────────────────────────────────────────────────────────────────────
# ACCOUNTS
# ─────────────────────────────────────────────────────────────────────────────
#
# Keys starting with "sk-ant-" are sent as x-api-key; any other key is sent
# as "Authorization: Bearer <key>".

[[accounts]]
id = "console-main"
name = "Console main"
api_url = "https://api.anthropic.com"
api_key = "sk-ant-your-key"

[[accounts]]
id = "relay-eu"
name = "EU relay"
api_url = "https://relay.example.com"
api_key = "relay-token"
user_agent = "claude-cli/1.0.119 (external, cli)"

# Optional forward proxy: http, https, socks5, socks5h
[accounts.proxy]
type = "socks5"
host = "127.0.0.1"
port = 1080
# username = "user"
# password = "pass"
"#
}
