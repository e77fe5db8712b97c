use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use app_gate::authz::{normalize_path, AuthorizationMode, AuthorizationRuleBuilder, Principal, RoleResolver, RuleStore};
use app_gate::config::GatewayConfig;
use app_gate::registry::parse_apps;
use app_gate::utils::hash_password;

#[derive(Parser, Debug)]
#[command(author, version, about = "app-gate operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hash a password for the simple users file (reads stdin when omitted)
    HashPassword { password: Option<String> },
    /// Print the ordered access rules built from a registry file
    Rules {
        /// Registry file; defaults to APPS_FILE
        #[arg(long)]
        apps: Option<PathBuf>,
    },
    /// Show the decision for a path and a set of groups
    Check {
        path: String,
        /// Group held by the caller; repeatable
        #[arg(long = "group")]
        groups: Vec<String>,
        /// Evaluate as an unauthenticated caller
        #[arg(long, conflicts_with = "groups")]
        anonymous: bool,
        #[arg(long)]
        apps: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; fall back to the crate-local `.env` using CARGO_MANIFEST_DIR.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::HashPassword { password } => {
            let password = match password {
                Some(password) => password,
                None => read_stdin_line()?,
            };
            println!("{}", hash_password(&password)?);
        }
        Commands::Rules { apps } => {
            let store = load_store(apps.as_deref())?;
            let snapshot = store.load();
            println!("{:<4} {:<30} {:<8} {}", "#", "Pattern", "Public", "Roles");
            for (idx, rule) in snapshot.rules.iter().enumerate() {
                let roles: Vec<&str> = rule.required_roles.iter().map(|r| r.as_str()).collect();
                let roles = if rule.public {
                    "-".to_string()
                } else if roles.is_empty() {
                    "(authenticated)".to_string()
                } else {
                    roles.join(" | ")
                };
                println!("{:<4} {:<30} {:<8} {}", idx, rule.pattern.to_string(), rule.public, roles);
            }
        }
        Commands::Check {
            path,
            groups,
            anonymous,
            apps,
        } => {
            let store = load_store(apps.as_deref())?;
            let principal = (!anonymous).then(|| Principal::new("cli").with_groups(&groups));
            let decision = store.load().evaluate(&normalize_path(&path), principal.as_ref());
            println!("{}", serde_json::to_string(&decision)?);
        }
    }

    Ok(())
}

fn load_store(apps: Option<&Path>) -> anyhow::Result<RuleStore> {
    let config = GatewayConfig::from_env()?;
    let apps_file = apps.unwrap_or(config.apps_file.as_path());
    let raw = std::fs::read(apps_file).with_context(|| format!("failed to read {}", apps_file.display()))?;
    let apps = parse_apps(&raw).with_context(|| format!("invalid registry file {}", apps_file.display()))?;

    let store = RuleStore::initialize(
        AuthorizationRuleBuilder::new(config.login_path.clone(), config.logout_path.clone()),
        RoleResolver::new(&config.admin_roles),
        AuthorizationMode::Enforced,
        Vec::new(),
        apps,
    )?;
    Ok(store)
}

fn read_stdin_line() -> anyhow::Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
