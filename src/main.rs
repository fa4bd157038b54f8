use serde_json::{Value, json};
use userbase::application_impl::user_service_factory;
use userbase::application_port::{RequestContext, UserService, UserServiceError};
use userbase::domain_model::PreferenceOptions;
use userbase::domain_port::DbSession;
use userbase::logger::*;
use userbase::runtime::Runtime;
use userbase::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let runtime = Runtime::try_new(&project_settings).await?;
    let request = runtime.open_request();
    let service = user_service_factory(&request);
    let db = request.db();

    let result = run(&service, db.as_ref(), cli.command).await;
    if let Err(e) = db.close().await {
        error!("closing session failed: {e}");
    }

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

async fn run(
    service: &impl UserService,
    db: &dyn DbSession,
    command: Command,
) -> anyhow::Result<Value> {
    let value = match command {
        Command::Fetch { userid } => to_json(service.fetch(&userid).await?),
        Command::FetchUser {
            username,
            authority,
        } => to_json(service.fetch_by_username(&username, &authority).await?),
        Command::Login { username_or_email } => {
            match service.fetch_for_login(&username_or_email).await {
                Err(UserServiceError::NotActivated) => json!({ "error": "not_activated" }),
                other => to_json(other?),
            }
        }
        Command::Prefs { userid, options } => {
            let options = parse_options(&options)?;
            match service.fetch(&userid).await? {
                None => Value::Null,
                Some(mut user) => {
                    service.update_preferences(&mut user, &options)?;
                    db.save_user(&user).await?;
                    db.commit().await?;
                    info!(userid = %user.userid(), "preferences saved");
                    to_json(Some(user))
                }
            }
        }
    };
    Ok(value)
}

fn to_json<T: serde::Serialize>(value: Option<T>) -> Value {
    value
        .and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or(Value::Null)
}

/// `key=value` pairs; values are read as JSON when they parse, as strings
/// otherwise.
fn parse_options(pairs: &[String]) -> anyhow::Result<PreferenceOptions> {
    let mut options = PreferenceOptions::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got {:?}", pair))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        options.insert(key.to_string(), value);
    }
    Ok(options)
}
