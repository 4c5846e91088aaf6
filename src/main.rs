use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use wealth_onboarding::backend::HttpBackend;
use wealth_onboarding::config::OnboardingConfig;
use wealth_onboarding::login::{EntryDecision, LoginFlow, LoginForm};
use wealth_onboarding::registration::{DocumentType, Field, LocalFile, RegistrationWizard};
use wealth_onboarding::session::{FileUserIdStore, UserIdStore};

const HELP: &str = "\
Commands:
  login <email> <password>    sign in to an existing account
  register                    start (or show) the registration wizard
  status                      show the current registration step
  set <field> <value>         set a field (e.g. set pincode 560001)
  attach <document> <path>    upload pan | aadhar-front | aadhar-back | bank-proof
  next | back                 move between steps
  submit                      submit the registration (step 5)
  otp <code>                  verify the emailed 6-digit code
  quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = OnboardingConfig::from_env().context("loading configuration")?;

    eprintln!("Wealth onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.backend_url);
    eprintln!("   User id file: {}", config.user_id_path.display());
    eprintln!(
        "   Upload limit: {} MB",
        config.max_upload_bytes / (1024 * 1024)
    );

    let backend = HttpBackend::shared(&config)?;
    let session: Arc<dyn UserIdStore> = Arc::new(FileUserIdStore::new(&config.user_id_path));

    let login = LoginFlow::new(backend.clone(), config.redirect_url.clone());
    if let EntryDecision::RedirectToDashboard(url) = login.entry().await {
        println!("Already signed in. Continue at {url}");
        return Ok(());
    }

    let mut wizard = RegistrationWizard::new(&config, backend.clone(), backend, session);

    eprintln!("{HELP}\n");
    println!("{}", wizard.render());
    eprint!("> ");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "quit" | "exit" => break,
            "help" => eprintln!("{HELP}"),
            "status" | "register" => println!("{}", wizard.render()),
            "login" => {
                let (email, password) = rest.split_once(' ').unwrap_or((rest, ""));
                match login.login(&LoginForm::new(email, password.trim())).await {
                    Ok(url) => {
                        println!("Signed in. Continue at {url}");
                        return Ok(());
                    }
                    Err(e) => println!("{e}"),
                }
            }
            "set" => {
                let (key, value) = rest.split_once(' ').unwrap_or((rest, ""));
                match Field::from_key(key) {
                    Some(field) => match wizard.set_field(field, value.trim()) {
                        Ok(Some(message)) => println!("{}: {message}", field.label()),
                        Ok(None) => {}
                        Err(e) => println!("{e}"),
                    },
                    None => println!("Unknown field: {key}"),
                }
            }
            "attach" => {
                let (kind, path) = rest.split_once(' ').unwrap_or((rest, ""));
                let document = match kind.parse::<DocumentType>() {
                    Ok(document) => document,
                    Err(e) => {
                        println!("{e}");
                        eprint!("> ");
                        continue;
                    }
                };
                match LocalFile::open(path.trim()).await {
                    Ok(file) => match wizard.upload_document(document, file).await {
                        Ok(url) => println!("{} uploaded: {url}", document.label()),
                        Err(e) => println!("{}: {e}", document.label()),
                    },
                    Err(e) => println!("Could not open {}: {e}", path.trim()),
                }
            }
            "next" => match wizard.next() {
                Ok(_) => println!("{}", wizard.render()),
                Err(e) => println!("{e}"),
            },
            "back" => match wizard.back() {
                Ok(_) => println!("{}", wizard.render()),
                Err(e) => println!("{e}"),
            },
            "submit" => match wizard.submit().await {
                Ok(_) => println!("Registration submitted. Enter the OTP sent to your email: otp <code>"),
                Err(e) => println!("{e}"),
            },
            "otp" => match wizard.verify_otp(rest).await {
                Ok(url) => {
                    println!("Email verified. Continue at {url}");
                    return Ok(());
                }
                Err(e) => println!("{e}"),
            },
            other => println!("Unknown command: {other} (type 'help')"),
        }
        eprint!("> ");
    }

    Ok(())
}
