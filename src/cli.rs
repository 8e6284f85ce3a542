use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use url::Url;

pub(crate) enum RunOutcome {
    Serve {
        addr: SocketAddr,
        config: dashpulse::config::AppConfig,
    },
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    let base_url = match cli.base_url.as_deref() {
        Some(raw) => match validate_base_url(raw) {
            Ok(base_url) => base_url,
            Err(err) => {
                eprintln!("error: {err}");
                return RunOutcome::Exit(2);
            }
        },
        None => {
            eprintln!("error: --base-url is required unless using a subcommand");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve {
        addr: cli.listen,
        config: dashpulse::config::AppConfig {
            base_url,
            vapid_private_key: cli.vapid_private_key,
            vapid_public_key: cli.vapid_public_key,
            vapid_subject: cli.vapid_subject,
        },
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "dashpulse",
    version,
    about = "Realtime updates and web push delivery for the sales dashboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    /// Dashboard origin used for deep links in notifications.
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long, env = "DASHPULSE_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "DASHPULSE_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "DASHPULSE_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a fresh VAPID key pair for push configuration.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match dashpulse::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("DASHPULSE_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("DASHPULSE_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("DASHPULSE_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace DASHPULSE_VAPID_SUBJECT with a contact URI you control.");
    }
    println!();
    println!(
        "--vapid-private-key \"{}\" --vapid-public-key \"{}\" --vapid-subject \"{subject}\"",
        credentials.private_key, credentials.public_key
    );
    0
}

fn validate_base_url(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("base url cannot be empty".to_string());
    }
    let parsed =
        Url::parse(value).map_err(|_| format!("invalid base url '{value}'; expected an absolute http(s) URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!(
            "base url must use http or https, got '{}'",
            parsed.scheme()
        ));
    }
    Ok(parsed.to_string())
}
