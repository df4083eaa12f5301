use std::{env, env::VarError};

/// The server takes no arguments. Passing any prints the help text and the current configuration.
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
    // PTT_JWT_SECRET is left out on purpose
    const DISPLAY_ENVS: [&str; 10] = [
        "RUST_LOG",
        "PTT_HOST",
        "PTT_PORT",
        "PTT_DATABASE_URL",
        "PTT_JWT_EXPIRY_SECS",
        "PTT_USE_X_FORWARDED_FOR",
        "PTT_USE_FORWARDED",
        "PTT_REQUEST_TIMEOUT",
        "PTT_GATE_SETTLEMENT",
        "PTT_AUTO_MIGRATE",
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
