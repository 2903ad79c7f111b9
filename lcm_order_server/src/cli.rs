use std::env;

use lcm_common::Secret;

const SETTINGS: [&str; 9] = [
    "RUST_LOG",
    "LCM_HOST",
    "LCM_PORT",
    "LCM_DATABASE_URL",
    "LCM_USE_X_FORWARDED_FOR",
    "LCM_USE_FORWARDED",
    "LCM_WEBHOOK_IP_WHITELIST",
    "LCM_IAMPORT_API_URL",
    "LCM_GATEWAY_TIMEOUT_SECS",
];

/// Only reported as set or not set.
const CREDENTIALS: [&str; 2] = ["LCM_IAMPORT_API_KEY", "LCM_IAMPORT_API_SECRET"];

/// The server is configured through the environment only. Any argument prints the help text and the current
/// configuration, and tells the caller not to start the server.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().len() > 1;
    if has_cli_args {
        println!("\n{}\n", include_str!("./cli-help.txt"));
        println!("Current environment:");
        for line in describe_environment(|name| env::var(name).ok()) {
            println!("{line}");
        }
    }
    has_cli_args
}

fn describe_environment<F>(lookup: F) -> Vec<String>
where F: Fn(&str) -> Option<String> {
    let settings = SETTINGS.iter().map(|&name| {
        let val = lookup(name).unwrap_or_else(|| "Not set".into());
        format!("  {name:<30} {val}")
    });
    let credentials = CREDENTIALS.iter().map(|&name| {
        let val = match lookup(name).map(Secret::new) {
            Some(s) if !s.is_blank() => s.to_string(),
            _ => "Not set".into(),
        };
        format!("  {name:<30} {val}")
    });
    settings.chain(credentials).collect()
}
