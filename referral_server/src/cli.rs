use std::{env, env::VarError};

/// The server takes no arguments. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are deliberately left off this list
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "RPS_HOST",
        "RPS_PORT",
        "RPS_DATABASE_URL",
        "RPS_PLATFORM_EMAIL",
        "RPS_REWARD_AMOUNT",
        "RPS_REWARD_CURRENCY",
        "RPS_MAX_REWARD_PER_PROFESSIONAL",
        "RPS_COOLDOWN_DAYS",
        "RPS_SIGNATURE_TOLERANCE",
        "RPS_WEBHOOK_SIGNATURE_CHECKS",
        "RPS_STRIPE_API_URL",
        "RPS_EVENT_BUFFER_SIZE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
